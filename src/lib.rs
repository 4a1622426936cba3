pub mod backoff;
pub mod batch;
pub mod checkpoint;
pub mod cli;
pub mod client;
pub mod config;
pub mod ingestor;
pub mod ledger;
pub mod logging;
pub mod rate_gate;
pub mod record;
pub mod store;

// Re-export main types for library usage
pub use batch::BatchSink;
pub use checkpoint::CheckpointStore;
pub use client::{FetchError, PageClient, PageFetch, PageOutcome};
pub use config::{Defaults, IngestConfig};
pub use ingestor::{IngestError, IngestReport, Ingestor};
pub use ledger::ErrorLedger;
pub use rate_gate::{RateGate, RatePermit};
pub use record::Record;
pub use store::{FsObjectStore, MemoryObjectStore, ObjectStore, StoreError};
