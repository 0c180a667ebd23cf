//! Logging setup.
//!
//! Logs go to stderr, or to an append-only file when one is configured.
//! Output is human-readable by default and JSON lines on request.
//!
//! # Example
//!
//! ```rust,ignore
//! use scoring_server::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default())?;
//! tracing::info!(port = 8080, "starting server");
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{ServerError, ServerResult};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Log level or filter directive (e.g. "info", "scoring_api=debug").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Log file; stderr when `None`.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: false,
            file: None,
        }
    }
}

/// Initializes the global subscriber.
///
/// # Errors
///
/// Returns [`ServerError::Logging`] if the level is not a valid filter, the
/// log file cannot be opened, or a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> ServerResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let layer = match &config.file {
        Some(path) => {
            let file = open_log_file(path)?;
            fmt_layer(config, Mutex::new(file), false, filter)
        }
        None => fmt_layer(config, std::io::stderr, true, filter),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| ServerError::logging(e.to_string()))
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> ServerResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| ServerError::logging(format!("invalid log level: {e}")))
}

fn open_log_file(path: &Path) -> ServerResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ServerError::logging(format!("cannot open {}: {e}", path.display())))
}

fn fmt_layer<W>(
    config: &LogConfig,
    writer: W,
    ansi: bool,
    filter: EnvFilter,
) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);

    if config.json_format {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.with_filter(filter).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "info");
        assert!(!config.json_format);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("scoring_api=debug,warn").is_ok());
        assert!(matches!(
            create_env_filter("scoring=notalevel"),
            Err(ServerError::Logging { .. })
        ));
    }

    #[test]
    fn test_disabled_logging_is_noop() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_log_file(dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("Logging error: cannot open"));
    }
}
