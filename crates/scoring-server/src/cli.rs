//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Command-line arguments.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "scoring-server", version, about = "JSON method-call scoring API")]
pub struct Cli {
    /// Port to listen on [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Write logs to this file instead of stderr
    #[arg(short, long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    /// Builds the effective configuration: file, then environment, then flags.
    pub fn load_config(&self) -> ServerResult<ServerConfig> {
        let config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        let mut config = config.with_env_overrides();
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Applies the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(log) = &self.log {
            config.logging.file = Some(log.clone());
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}
