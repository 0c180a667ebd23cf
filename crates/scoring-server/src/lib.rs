//! # Scoring Server
//!
//! HTTP front end of the scoring API.
//!
//! This crate wires the method dispatcher from `scoring-api` to a hyper
//! HTTP/1 listener and adds the process-level concerns:
//!
//! - [`ApiServer`] - Accept loop and `POST /method` transport
//! - [`ServerConfig`] - Layered configuration (file, environment, flags)
//! - [`logging`] - Subscriber setup, to stderr or a log file
//! - [`Cli`] - Command-line flags
//!
//! # Environment Variables
//!
//! - `SCORING_PORT` - Listen port (default: 8080)
//! - `SCORING_LISTEN_ADDR` - Listen address (default: 127.0.0.1)
//! - `SCORING_LOG_LEVEL` - Log filter (default: info)
//! - `SCORING_LOG_FILE` - Log file (default: stderr)
//! - `SCORING_STORE_SEED` - JSON file the store is seeded from

#![doc(html_root_url = "https://docs.rs/scoring-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
mod error;
pub mod logging;
pub mod server;

pub use cli::Cli;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::ApiServer;

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
