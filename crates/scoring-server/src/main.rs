//! Scoring server - Entry point

use anyhow::Context;
use clap::Parser;
use tracing::info;

use scoring_server::logging::init_logging;
use scoring_server::{ApiServer, Cli, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli
        .load_config()
        .context("failed to load configuration")?;

    init_logging(&config.log_config()).context("failed to initialize logging")?;

    info!(
        version = VERSION,
        addr = %config.socket_addr()?,
        "Starting scoring server"
    );

    let server = ApiServer::from_config(config).context("failed to create server")?;
    server.run().await.context("server error")?;

    info!("Server stopped");
    Ok(())
}
