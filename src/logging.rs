//! Tracing setup: compact stdout layer plus a daily-rotated, non-blocking
//! file layer under `<data_dir>/logs/`. Level filtering comes from
//! `RUST_LOG` and defaults to "info".

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn init_logging<P: AsRef<Path>>(log_dir: P) -> Result<(), Box<dyn std::error::Error>> {
    let log_path = log_dir.as_ref();
    std::fs::create_dir_all(log_path)?;

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let file_appender = tracing_appender::rolling::daily(log_path, "ingest.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_filter(env_filter);

    let stdout_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(stdout_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();

    // The guard must outlive the program or buffered lines are lost on exit.
    Box::leak(Box::new(file_guard));

    tracing::debug!("Logging to {}/ingest.log", log_path.display());
    Ok(())
}

/// Convenience wrapper placing logs under `<data_dir>/logs/`.
pub fn init_logging_in_data_dir<P: AsRef<Path>>(data_dir: P) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(data_dir.as_ref().join("logs"))
}
