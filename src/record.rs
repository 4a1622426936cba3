//! Normalization of loosely-typed product objects into fixed-shape rows.
//!
//! Extraction is a pure function of the input object: absent or mistyped
//! fields become empty strings, never errors, so one malformed product can
//! never sink a page.

use serde_json::Value;

/// One normalized row destined for a CSV batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub code: String,
    pub product_name: String,
    pub brands: String,
    pub countries: String,
    pub categories: String,
    pub ingredients_text: String,
    pub nutriscore_grade: String,
    pub energy_100g: String,
    pub sugars_100g: String,
}

impl Record {
    pub const HEADER: [&'static str; 10] = [
        "id",
        "code",
        "product_name",
        "brands",
        "countries",
        "categories",
        "ingredients_text",
        "nutriscore_grade",
        "energy_100g",
        "sugars_100g",
    ];

    /// Map one raw product object to a Record, defaulting every absent field.
    pub fn from_product(product: &Value) -> Self {
        let nutriments = product.get("nutriments");
        Self {
            id: text_field(product, "id"),
            code: text_field(product, "code"),
            product_name: text_field(product, "product_name"),
            brands: text_field(product, "brands"),
            countries: text_field(product, "countries"),
            categories: text_field(product, "categories"),
            ingredients_text: text_field(product, "ingredients_text"),
            nutriscore_grade: text_field(product, "nutriscore_grade"),
            energy_100g: nutriments.map(|n| text_field(n, "energy_100g")).unwrap_or_default(),
            sugars_100g: nutriments.map(|n| text_field(n, "sugars_100g")).unwrap_or_default(),
        }
    }

    /// Extract every product in a page body's `products` array.
    pub fn from_page_body(body: &Value) -> Vec<Self> {
        body.get("products")
            .and_then(Value::as_array)
            .map(|products| products.iter().map(Self::from_product).collect())
            .unwrap_or_default()
    }

    pub fn fields(&self) -> [&str; 10] {
        [
            &self.id,
            &self.code,
            &self.product_name,
            &self.brands,
            &self.countries,
            &self.categories,
            &self.ingredients_text,
            &self.nutriscore_grade,
            &self.energy_100g,
            &self.sugars_100g,
        ]
    }
}

/// Render a scalar field as text; non-scalar or absent values become "".
fn text_field(object: &Value, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
