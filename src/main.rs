//! txwatch - Ethereum address transaction tracker
//!
//! Subscribes addresses and follows the chain head, reporting every
//! transaction sent from or to them.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use txwatch::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle Ctrl+C gracefully
    tokio::select! {
        result = cli::run(cli) => {
            result.context("txwatch error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
