use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::model::LoggingConfig;

/// Install the global subscriber: human-readable logs on stderr, plus an
/// append-only log file when one is configured. `RUST_LOG` wins over the
/// configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level_directive(&config.level))
            .with_context(|| format!("invalid log level `{}`", config.level))?,
    };

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("could not open log file `{}`", path.display()))?;
            // Each record goes out in one write under the lock, so lines
            // from concurrent workers never interleave.
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("logging already initialised")?;

    Ok(())
}

/// Map configured level names (including `WARNING` and `CRITICAL`) onto
/// tracing levels.
fn level_directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}
