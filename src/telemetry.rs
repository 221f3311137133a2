//! Tracing/logging initialization.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name prefix of the daily-rolling log file.
const LOG_FILE_PREFIX: &str = "bankledger.log";

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Log this crate at debug level instead of info.
    pub verbose: bool,
    /// Emit JSON lines on stderr.
    pub json: bool,
    /// Also write logs to a daily-rolling file in this directory.
    pub log_dir: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_directives(&self) -> String {
        let level = if self.verbose { "debug" } else { "info" };
        format!("bankledger={level},tower_http={level},sqlx=warn,warn")
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Keep the returned guard alive for as long as file logging should flush.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    let console = if config.json {
        fmt::layer()
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
