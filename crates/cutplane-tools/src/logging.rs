//! Structured logging initialisation.

use std::env;
use std::fs::{File, OpenOptions};
use std::io;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the default filter directive.
pub const TRACE_ENV: &str = "CUTPLANE_TRACE";
/// Environment variable selecting `pretty` or `json` output.
pub const FORMAT_ENV: &str = "CUTPLANE_LOG_FORMAT";
/// Environment variable naming an additional log file.
pub const FILE_ENV: &str = "CUTPLANE_LOG_FILE";

/// Errors produced while installing the global subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    InvalidFilter(String),
    InvalidFormat(String),
    FileOpen { path: String, message: String },
    Init(String),
}

impl LoggingError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            LoggingError::InvalidFilter(_) => "LOG_INVALID_FILTER",
            LoggingError::InvalidFormat(_) => "LOG_INVALID_FORMAT",
            LoggingError::FileOpen { .. } => "LOG_FILE_OPEN",
            LoggingError::Init(_) => "LOG_INIT",
        }
    }
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggingError::InvalidFilter(msg) => {
                write!(f, "[{}] Invalid log filter: {}", self.code(), msg)
            }
            LoggingError::InvalidFormat(format) => write!(
                f,
                "[{}] Invalid {FORMAT_ENV} '{}' (expected 'json' or 'pretty')",
                self.code(),
                format
            ),
            LoggingError::FileOpen { path, message } => {
                write!(f, "[{}] Failed to open log file {}: {}", self.code(), path, message)
            }
            LoggingError::Init(msg) => {
                write!(f, "[{}] Failed to initialize logging: {}", self.code(), msg)
            }
        }
    }
}

impl std::error::Error for LoggingError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

fn parse_format(value: &str) -> Result<LogFormat, LoggingError> {
    if value.eq_ignore_ascii_case("pretty") {
        Ok(LogFormat::Pretty)
    } else if value.eq_ignore_ascii_case("json") {
        Ok(LogFormat::Json)
    } else {
        Err(LoggingError::InvalidFormat(value.to_string()))
    }
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if level.eq_ignore_ascii_case("off") {
        return Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()));
    }
    EnvFilter::try_new(level).map_err(|err| LoggingError::InvalidFilter(err.to_string()))
}

fn open_log_file(path: &str) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| LoggingError::FileOpen {
            path: path.to_string(),
            message: err.to_string(),
        })
}

fn map_init_err<E: std::fmt::Display>(err: E) -> LoggingError {
    LoggingError::Init(err.to_string())
}

/// Install the global `tracing` subscriber.
///
/// When `level` is `None`, `CUTPLANE_TRACE` is read; if it is unset too, the
/// level is `off`. Output goes to stderr in the format named by
/// `CUTPLANE_LOG_FORMAT` and, when `CUTPLANE_LOG_FILE` is set, is also
/// appended to that file without ANSI colors.
///
/// Returns `Ok(false)` if a subscriber is already installed.
pub fn init_logging(level: Option<&str>) -> Result<bool, LoggingError> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let level_value = level
        .map(str::to_string)
        .or_else(|| env::var(TRACE_ENV).ok())
        .unwrap_or_else(|| "off".to_string());
    let filter = build_filter(&level_value)?;

    let format = parse_format(&env::var(FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string()))?;
    let log_file = env::var(FILE_ENV).ok().map(|path| open_log_file(&path)).transpose()?;

    match format {
        LogFormat::Json => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .json();
            let base = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer);
            if let Some(file) = log_file {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .json();
                base.with(file_layer).try_init().map_err(map_init_err)?;
            } else {
                base.try_init().map_err(map_init_err)?;
            }
        }
        LogFormat::Pretty => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .pretty();
            let base = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer);
            if let Some(file) = log_file {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .pretty();
                base.with(file_layer).try_init().map_err(map_init_err)?;
            } else {
                base.try_init().map_err(map_init_err)?;
            }
        }
    }

    tracing::debug!(
        component = "logging",
        operation = "init",
        status = "success",
        level = level_value.as_str(),
        "Logging initialized"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("JSON"), Ok(LogFormat::Json));
        assert_eq!(parse_format("pretty"), Ok(LogFormat::Pretty));
        let err = parse_format("xml").unwrap_err();
        assert_eq!(err.code(), "LOG_INVALID_FORMAT");
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        assert!(build_filter("off").is_ok());
        assert!(build_filter("cutplane_decomp=debug,info").is_ok());
        let err = build_filter("cutplane_decomp=loud").unwrap_err();
        assert_eq!(err.code(), "LOG_INVALID_FILTER");
    }

    #[test]
    fn test_open_log_file_reports_path() {
        let err = open_log_file("/nonexistent-dir/cutplane.log").unwrap_err();
        assert_eq!(err.code(), "LOG_FILE_OPEN");
        assert!(err.to_string().contains("/nonexistent-dir/cutplane.log"));
    }
}
