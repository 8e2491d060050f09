//! Shared logging setup for the maskprofiler binary.
//!
//! Log lines go to stderr and, when a log file is given, to that file as
//! well (appended, without ANSI colors). Data output stays on stdout.

use crate::error::MaskProfilerError;
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initializes structured logging based on verbosity level.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
/// * `log_file` - Optional file that receives a copy of every log line
///
/// # Errors
/// `Configuration` if the log file cannot be opened or a global subscriber
/// is already installed.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level = log_level(verbose, quiet);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .with(stderr_layer);

    let init_result = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    MaskProfilerError::configuration(format!(
                        "Failed to open log file {}: {e}",
                        path.display()
                    ))
                })?;
            let file_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            registry.with(file_layer).try_init()
        }
        None => registry.try_init(),
    };

    init_result.map_err(|e| {
        MaskProfilerError::configuration(format!("Failed to initialize logging: {e}"))
    })
}

fn log_level(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}
