//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging with optional file output.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging based on configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set.
///
/// # Errors
///
/// Returns error if the level cannot be parsed or the log file cannot be opened
///
/// # Examples
///
/// ```no_run
/// use butterbot::config::LoggingConfig;
/// use butterbot::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(&config.level)?;
    let file = open_log_file(config.file_path.as_deref())?;
    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json_format {
        let file_layer =
            file.map(|file| fmt::layer().json().with_current_span(true).with_writer(file));
        registry
            .with(fmt::layer().json().with_current_span(true))
            .with(file_layer)
            .try_init()?;
    } else {
        let file_layer = file.map(|file| fmt::layer().with_ansi(false).with_writer(file));
        registry.with(fmt::layer()).with(file_layer).try_init()?;
    }

    Ok(())
}

/// Open the log file for appending, creating it when missing
fn open_log_file(path: Option<&Path>) -> Result<Option<Arc<File>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Some(Arc::new(file)))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(level)?),
    }
}
