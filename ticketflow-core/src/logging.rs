//! Logging for ticketflow
//!
//! Everything goes to a daily-rotated file under the XDG state directory
//! (`~/.local/state/ticketflow/ticketflow.log.YYYY-MM-DD`). Stdout is left
//! to the CLI's own report output.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

const LOG_FILE_PREFIX: &str = "ticketflow.log";

impl LoggingConfig {
    /// Copy with the level raised by CLI verbosity (1 = debug, 2+ = trace)
    pub fn with_verbosity(&self, verbose: u8) -> Self {
        let level = match verbose {
            0 => self.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        };
        Self {
            level,
            ..self.clone()
        }
    }
}

/// Install the global subscriber writing to [`Config::state_dir`].
///
/// `RUST_LOG` takes precedence over the configured level. Hold the
/// returned guard until exit or buffered lines are lost.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    let (writer, guard) = tracing_appender::non_blocking(file_appender(&log_dir, config.max_files)?);

    tracing_subscriber::registry()
        .with(filter(&config.level))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))?;

    tracing::info!(log_dir = %log_dir.display(), level = %config.level, "Logging initialized");

    Ok(LoggingGuard { _guard: guard })
}

/// Route logs to the test writer (captured per test)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Flushes pending log lines when dropped
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Base path of the log file (rotated files carry a date suffix)
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

fn file_appender(dir: &Path, max_files: usize) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(max_files.max(1))
        .build(dir)
        .map_err(|e| Error::Config(format!("failed to create log file in {:?}: {}", dir, e)))
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
