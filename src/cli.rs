use clap::{Parser, Subcommand};

/// CLI entry point so operators can run and inspect ingestion passes.
#[derive(Parser, Debug)]
#[command(name = "foodfacts-ingest")]
#[command(about = "Checkpointed, rate-limited ingester for the OpenFoodFacts search API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one ingestion pass, resuming from the stored checkpoint.
    Ingest {
        #[arg(
            long,
            default_value = crate::config::Defaults::ENDPOINT,
            help = "Paginated search endpoint to ingest from"
        )]
        endpoint: String,

        #[arg(
            short,
            long,
            default_value = "./data",
            help = "Directory backing the object store (batches, checkpoint, reports)"
        )]
        data_dir: String,

        #[arg(
            long,
            default_value_t = crate::config::Defaults::TOTAL_PAGES,
            help = "Last page number of the known page range"
        )]
        total_pages: u64,

        #[arg(
            long,
            default_value_t = crate::config::Defaults::PAGE_SIZE,
            help = "Records requested per page"
        )]
        page_size: u32,

        #[arg(
            short,
            long,
            default_value_t = crate::config::Defaults::CONCURRENCY,
            help = "Concurrent in-flight requests (also the wave size)"
        )]
        concurrency: usize,

        #[arg(
            long,
            default_value_t = crate::config::Defaults::MIN_SPACING_MS,
            help = "Minimum milliseconds between request starts, globally"
        )]
        min_spacing_ms: u64,

        #[arg(
            long,
            default_value_t = crate::config::Defaults::MAX_ATTEMPTS,
            help = "Attempts per page before it is recorded as failed"
        )]
        max_attempts: u32,

        #[arg(
            long,
            default_value_t = crate::config::Defaults::REQUEST_TIMEOUT_SECS,
            help = "Per-request timeout in seconds (large to ride out throttled responses)"
        )]
        timeout: u64,

        #[arg(
            long,
            default_value_t = crate::config::Defaults::MAX_ROWS_PER_BATCH,
            help = "Row threshold that triggers a batch rollover"
        )]
        batch_rows: usize,
    },

    /// Print the stored checkpoint so operators can see resume position.
    Status {
        #[arg(short, long, default_value = "./data", help = "Data directory")]
        data_dir: String,
    },

    /// Delete the checkpoint so the next run starts from page 1.
    ResetCheckpoint {
        #[arg(short, long, default_value = "./data", help = "Data directory")]
        data_dir: String,
    },
}

impl Cli {
    /// Parse CLI arguments; on usage errors clap prints help and exits.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
