//! Configuration and watchlist loading
//!
//! `ParserConfig` carries everything the walker needs to reach the node.
//! The watchlist file holds one Ethereum address per line.

use crate::error::{Error, Result as ParserResult};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Public endpoint used when no node URL is configured.
pub const DEFAULT_NODE_URL: &str = "https://cloudflare-eth.com";

/// Retry policy for the backward block-by-hash walk.
///
/// The first attempt goes out immediately. Retry `i` (0-based) waits
/// `i * backoff_unit` first, so three failures followed by a success wait
/// `0 + 1 + 2` units in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    /// Wait before the given 0-based attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

/// Walker configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// JSON-RPC endpoint URL
    pub node_url: String,
    /// Per-request timeout applied when no explicit client is given
    pub request_timeout: Option<Duration>,
    /// Retry policy for block-by-hash fetches
    pub retry: RetryPolicy,
    http_client: Option<reqwest::Client>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.to_string(),
            request_timeout: None,
            retry: RetryPolicy::default(),
            http_client: None,
        }
    }
}

impl ParserConfig {
    pub fn with_node_url(mut self, url: impl Into<String>) -> Self {
        self.node_url = url.into();
        self
    }

    /// Use a preconfigured HTTP client. `request_timeout` is then ignored.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check the configuration before any client is built.
    pub fn validate(&self) -> ParserResult<()> {
        let url = self.node_url.trim();
        if url.is_empty() {
            return Err(Error::Config("node url cannot be empty".to_string()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!(
                "node url must use http or https: {}",
                url
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry attempts must be at least 1".to_string()));
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err(Error::Config("request timeout cannot be zero".to_string()));
        }
        Ok(())
    }

    /// The configured HTTP client, or a new one honouring `request_timeout`.
    pub fn http_client(&self) -> ParserResult<reqwest::Client> {
        if let Some(client) = &self.http_client {
            return Ok(client.clone());
        }
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

/// Load a watchlist from a file.
///
/// Each line should contain one Ethereum address in hex format (with or without 0x prefix).
/// Empty lines and lines starting with '#' are ignored. Addresses are returned
/// lowercase with a `0x` prefix, which is how nodes report `from`/`to`.
pub fn load_watchlist(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read watchlist file: {:?}", path))?;

    let mut addresses = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let addr = normalize_address(line).with_context(|| {
            format!("Invalid address on line {}: {}", line_num + 1, line)
        })?;

        if !addresses.contains(&addr) {
            addresses.push(addr);
        }
    }

    if addresses.is_empty() {
        anyhow::bail!("Watchlist is empty (no valid addresses found)");
    }

    Ok(addresses)
}

/// Parse an address and render it in the node's lowercase form.
///
/// Accepts addresses with or without 0x prefix, in any case.
pub fn normalize_address(s: &str) -> Result<String> {
    let hex_part = s.trim().strip_prefix("0x").unwrap_or(s.trim());
    let bytes = hex::decode(hex_part).with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!(
            "Address must be 20 bytes (40 hex chars), got {} bytes",
            bytes.len()
        );
    }

    Ok(format!("0x{:x}", Address::from_slice(&bytes)))
}
