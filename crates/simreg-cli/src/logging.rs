//! Console and run-log subscriber setup

use anyhow::{Context, Result};
use simreg_common::LoggingConfig;
use std::fs::File;
use std::io;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: a console layer filtered by `RUST_LOG` or
/// the configured level, and a plain-text file layer at the file level.
///
/// Keep the returned guard alive until exit; dropping it flushes the file.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let path = config.log_file();
    let replaced = path.exists();
    let file =
        File::create(&path).with_context(|| format!("cannot create log file {}", path.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let file_filter =
        EnvFilter::try_new(&config.file_level).unwrap_or_else(|_| EnvFilter::new("debug"));

    let console_layer =
        fmt::layer().with_target(true).with_writer(io::stdout).with_filter(console_filter);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    if replaced {
        warn!("{} already existed and was replaced", path.display());
    }
    Ok(guard)
}
