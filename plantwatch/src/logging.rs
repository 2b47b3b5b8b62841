//! Logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! Log output always goes to stderr. When a log directory is configured, a
//! second non-blocking layer writes to a daily rolling file in it.
//!
//! # Log Levels
//!
//! - `warn`: absorbed failures (sort order fallback, failed refresh)
//! - `info`: refresh completion, startup
//! - `debug`: feed switches, cache hits
//!
//! `RUST_LOG` overrides the configured level when set.
//!
//! # Usage
//!
//! ```ignore
//! use plantwatch::logging::{init_logging, LoggingConfig};
//!
//! let _guard = init_logging(&LoggingConfig::default())?;
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepted values for the log level setting.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// File name prefix for rolling log files.
pub const LOG_FILE_PREFIX: &str = "plantwatch.log";

/// Errors that can occur while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory could not be created.
    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A global subscriber is already installed.
    #[error("Failed to install log subscriber: {0}")]
    Init(String),
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level for this crate's targets (`trace` through `error`).
    pub level: String,
    /// Directory for rolling log files. Stderr only when `None`.
    pub directory: Option<PathBuf>,
    /// Whether stderr output uses ANSI colors.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Set the level.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the log file directory.
    pub fn with_directory(mut self, directory: Option<PathBuf>) -> Self {
        self.directory = directory;
        self
    }

    /// Enable or disable ANSI colors on stderr.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Keeps the file writer alive. Buffered lines are flushed on drop.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Returns true if `level` is an accepted log level.
pub fn is_valid_level(level: &str) -> bool {
    LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
}

/// Filter directives used when `RUST_LOG` is not set.
///
/// Dependencies stay at `warn`; the workspace crates use `level`.
pub fn default_directives(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    format!("warn,plantwatch={level},plantwatch_cli={level}")
}

/// Install the global subscriber.
///
/// Call once at startup and keep the returned guard until exit.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(offset, Rfc3339);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi)
        .with_timer(timer.clone());

    let (file_layer, file_guard) = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).map_err(|source| LoggingError::Directory {
                path: directory.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(timer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_levels() {
        assert!(is_valid_level("info"));
        assert!(is_valid_level("DEBUG"));
        assert!(!is_valid_level("verbose"));
        assert!(!is_valid_level(""));
    }

    #[test]
    fn test_default_directives_scope_workspace_crates() {
        assert_eq!(
            default_directives("Debug"),
            "warn,plantwatch=debug,plantwatch_cli=debug"
        );
    }

    #[test]
    fn test_config_builders() {
        let config = LoggingConfig::default()
            .with_level("warn")
            .with_directory(Some(PathBuf::from("/tmp/logs")))
            .with_ansi(false);

        assert_eq!(config.level, "warn");
        assert_eq!(config.directory, Some(PathBuf::from("/tmp/logs")));
        assert!(!config.ansi);
        assert_eq!(LoggingConfig::default().level, DEFAULT_LOG_LEVEL);
    }
}
