//! Configuration for the scoring server.
//!
//! Configuration is layered: defaults, then an optional TOML or JSON file,
//! then `SCORING_*` environment variables, then command-line flags.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use scoring_api::auth::{Credentials, DEFAULT_ADMIN_LOGIN, DEFAULT_ADMIN_SALT, DEFAULT_SALT};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::logging::LogConfig;

/// Server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener settings.
    pub server: ServerSettings,
    /// Authentication secrets.
    pub auth: AuthSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Store settings.
    pub store: StoreSettings,
}

impl ServerConfig {
    /// Load configuration from a file.
    pub fn from_file(path: impl Into<PathBuf>) -> ServerResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ServerError::config(format!("failed to read config file: {e}")))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match extension {
            "toml" => toml::from_str(&content)
                .map_err(|e| ServerError::config(format!("invalid TOML: {e}"))),
            "json" => serde_json::from_str(&content)
                .map_err(|e| ServerError::config(format!("invalid JSON: {e}"))),
            _ => Err(ServerError::config(format!(
                "unsupported config format: {extension}"
            ))),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Recognised variables: `SCORING_PORT`, `SCORING_LISTEN_ADDR`,
    /// `SCORING_LOG_LEVEL`, `SCORING_LOG_FILE` and `SCORING_STORE_SEED`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(port) = var("SCORING_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Some(addr) = var("SCORING_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }

        if let Some(level) = var("SCORING_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(path) = var("SCORING_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(path));
        }

        if let Some(path) = var("SCORING_STORE_SEED") {
            self.store.seed_file = Some(PathBuf::from(path));
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ServerResult<()> {
        self.socket_addr()?;

        if self.auth.salt.is_empty() {
            return Err(ServerError::config("auth.salt must not be empty"));
        }
        if self.auth.admin_login.is_empty() {
            return Err(ServerError::config("auth.admin_login must not be empty"));
        }
        if self.auth.admin_salt.is_empty() {
            return Err(ServerError::config("auth.admin_salt must not be empty"));
        }
        if self.server.max_body_size == 0 {
            return Err(ServerError::config("server.max_body_size must be positive"));
        }

        Ok(())
    }

    /// Address the server listens on.
    pub fn socket_addr(&self) -> ServerResult<SocketAddr> {
        let ip: IpAddr = match self.server.listen_addr.as_str() {
            "localhost" => IpAddr::from([127, 0, 0, 1]),
            addr => addr.parse().map_err(|e| {
                ServerError::config(format!("invalid listen address '{addr}': {e}"))
            })?,
        };
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Credentials for the authentication check.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.auth.salt.clone(),
            self.auth.admin_login.clone(),
            self.auth.admin_salt.clone(),
        )
    }

    /// Logging configuration.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.logging.level.clone(),
            json_format: self.logging.json,
            file: self.logging.file.clone(),
            ..LogConfig::default()
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind to.
    pub listen_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            port: 8080,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Authentication secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Shared salt of regular callers.
    pub salt: String,
    /// Administrator login.
    pub admin_login: String,
    /// Administrator salt.
    pub admin_salt: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            salt: DEFAULT_SALT.to_string(),
            admin_login: DEFAULT_ADMIN_LOGIN.to_string(),
            admin_salt: DEFAULT_ADMIN_SALT.to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level or filter directive.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Write logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// JSON object file the in-memory store is seeded from.
    pub seed_file: Option<PathBuf>,
}
