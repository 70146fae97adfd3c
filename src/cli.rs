//! CLI implementation for txwatch
//!
//! Command-line front end over [`ChainWalker`]. Command output is JSON on
//! stdout; progress goes to the log.

use crate::config::{load_watchlist, normalize_address, ParserConfig, RetryPolicy, DEFAULT_NODE_URL};
use crate::walker::ChainWalker;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Track transactions for Ethereum addresses
#[derive(Parser)]
#[command(name = "txwatch")]
#[command(about = "Track inbound and outbound transactions for Ethereum addresses")]
pub struct Cli {
    /// RPC endpoint URL
    #[arg(short, long, default_value = DEFAULT_NODE_URL)]
    rpc_url: String,

    /// HTTP request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Attempts per block when walking parent hashes
    #[arg(long, default_value_t = 10)]
    retry_attempts: u32,

    /// Backoff unit between block fetch retries, in milliseconds
    #[arg(long, default_value_t = 1000)]
    backoff_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the current head block number
    CurrentBlock,
    /// Subscribe addresses and report their transactions as new blocks arrive
    Watch {
        /// Path to watchlist file (one address per line)
        #[arg(short, long)]
        watchlist: Option<PathBuf>,

        /// Address to watch (repeatable)
        #[arg(short, long = "address")]
        addresses: Vec<String>,

        /// Seconds between polls
        #[arg(short, long, default_value_t = 12)]
        interval_secs: u64,
    },
}

impl Cli {
    /// Walker configuration from the global flags.
    pub fn config(&self) -> ParserConfig {
        let mut config = ParserConfig::default()
            .with_node_url(self.rpc_url.clone())
            .with_retry(RetryPolicy {
                max_attempts: self.retry_attempts,
                backoff_unit: Duration::from_millis(self.backoff_ms),
            });
        if let Some(secs) = self.timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        config
    }
}

/// Run the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let walker = ChainWalker::from_config(&cli.config()).context("Invalid configuration")?;

    match cli.command {
        Commands::CurrentBlock => {
            let block = walker
                .current_block()
                .await
                .context("Failed to get current block")?;
            println!("{}", serde_json::to_string_pretty(&json!({ "block": block }))?);
        }
        Commands::Watch {
            watchlist,
            addresses,
            interval_secs,
        } => {
            let addresses = collect_addresses(watchlist, addresses)?;
            watch(&walker, &addresses, Duration::from_secs(interval_secs)).await?;
        }
    }

    Ok(())
}

/// Merge watchlist file entries and `--address` flags, normalised and deduplicated.
fn collect_addresses(watchlist: Option<PathBuf>, flags: Vec<String>) -> Result<Vec<String>> {
    let mut addresses = match watchlist {
        Some(path) => load_watchlist(&path).context("Failed to load watchlist")?,
        None => Vec::new(),
    };

    for flag in flags {
        let addr = normalize_address(&flag).with_context(|| format!("Invalid address: {}", flag))?;
        if !addresses.contains(&addr) {
            addresses.push(addr);
        }
    }

    if addresses.is_empty() {
        anyhow::bail!("Nothing to watch: pass --watchlist or --address");
    }

    Ok(addresses)
}

/// Subscribe every address, then poll forever printing newly seen transactions.
async fn watch(walker: &ChainWalker, addresses: &[String], interval: Duration) -> Result<()> {
    for addr in addresses {
        walker
            .subscribe(addr)
            .await
            .with_context(|| format!("Failed to subscribe {}", addr))?;
    }
    info!("Watching {} addresses", addresses.len());

    let mut seen: HashMap<&str, HashSet<String>> = HashMap::new();

    loop {
        for addr in addresses {
            let transactions = match walker.transactions_for(addr).await {
                Ok(txs) => txs,
                Err(e) => {
                    warn!("Failed to sync {}: {}", addr, e);
                    continue;
                }
            };

            let known = seen.entry(addr.as_str()).or_default();
            // Oldest first so output follows chain order
            for tx in transactions.iter().rev() {
                if known.insert(tx.hash.clone()) {
                    info!("New transaction {} for {} in block {}", tx.hash, addr, tx.block_number);
                    println!(
                        "{}",
                        serde_json::to_string(&json!({ "address": addr, "transaction": tx }))?
                    );
                }
            }
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_watch_command() {
        let cli = Cli::try_parse_from([
            "txwatch",
            "--rpc-url",
            "http://127.0.0.1:8545",
            "--backoff-ms",
            "250",
            "watch",
            "-a",
            "0x0742d35Cc6634C0532925a3b844Bc9e7595f0bEb",
        ])
        .unwrap();

        let config = cli.config();
        assert_eq!(config.node_url, "http://127.0.0.1:8545");
        assert_eq!(config.retry.backoff_unit, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, 10);
        assert!(matches!(cli.command, Commands::Watch { ref addresses, .. } if addresses.len() == 1));
    }

    #[test]
    fn test_default_rpc_url() {
        let cli = Cli::try_parse_from(["txwatch", "current-block"]).unwrap();
        assert_eq!(cli.config().node_url, DEFAULT_NODE_URL);
        assert!(cli.config().request_timeout.is_none());
    }

    #[test]
    fn test_collect_addresses_merges_sources() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0x0742d35Cc6634C0532925a3b844Bc9e7595f0bEb").unwrap();
        file.flush().unwrap();

        let addresses = collect_addresses(
            Some(file.path().to_path_buf()),
            vec![
                "0742D35CC6634C0532925A3B844BC9E7595F0BEB".to_string(),
                "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string(),
            ],
        )
        .unwrap();

        assert_eq!(
            addresses,
            vec![
                "0x0742d35cc6634c0532925a3b844bc9e7595f0beb".to_string(),
                "0xdac17f958d2ee523a2206206994597c13d831ec7".to_string(),
            ]
        );
    }

    #[test]
    fn test_collect_addresses_requires_input() {
        assert!(collect_addresses(None, Vec::new()).is_err());
        assert!(collect_addresses(None, vec!["0x12".to_string()]).is_err());
    }
}
