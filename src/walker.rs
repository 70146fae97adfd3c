//! Chain walker
//!
//! Brings the per-address transaction cache up to the chain head by
//! walking parent hashes backward from the head block to the block the
//! address was last synced through (or subscribed at).
//!
//! Network calls are made without holding the subscription lock; the cache
//! merge is the only write and it is idempotent, so overlapping walks for the
//! same address converge on the same entry.

use crate::cache::{MemoryCache, TransactionStore};
use crate::config::{ParserConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::rpc::{ChainSource, RpcClient};
use crate::subscriptions::Subscriptions;
use crate::types::{Block, Transaction};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Soft-failure service surface.
///
/// Every error is logged and collapsed into an empty value, so callers
/// cannot tell "nothing there" from "lookup failed". Use [`ChainWalker`]'s
/// inherent methods to get typed results.
#[async_trait]
pub trait Parser: Send + Sync {
    /// Current head block number, or 0 if the lookup failed.
    async fn get_current_block(&self) -> u64;

    /// `true` on first subscription; `false` if already subscribed or the head lookup failed.
    async fn subscribe(&self, address: &str) -> bool;

    /// All known transactions for `address`; empty if unsubscribed or on failure.
    async fn get_transactions(&self, address: &str) -> Vec<Transaction>;
}

/// Incremental traversal-and-merge engine.
pub struct ChainWalker {
    chain: Arc<dyn ChainSource>,
    cache: Arc<dyn TransactionStore>,
    subscriptions: Subscriptions,
    retry: RetryPolicy,
}

impl ChainWalker {
    /// Create a walker over the given chain source and cache.
    pub fn new(
        chain: Arc<dyn ChainSource>,
        cache: Arc<dyn TransactionStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            chain,
            cache,
            subscriptions: Subscriptions::new(),
            retry,
        }
    }

    /// Create a walker talking JSON-RPC to `config.node_url` with an in-memory cache.
    pub fn from_config(config: &ParserConfig) -> Result<Self> {
        let rpc = RpcClient::from_config(config)?;
        info!("Using node {}", rpc.url());
        Ok(Self::new(
            Arc::new(rpc),
            Arc::new(MemoryCache::new()),
            config.retry,
        ))
    }

    /// Current head block number reported by the node.
    pub async fn current_block(&self) -> Result<u64> {
        self.chain.block_number().await
    }

    /// Subscribe `address`, recording the current head as its initial block.
    ///
    /// Returns the initial block.
    pub async fn subscribe(&self, address: &str) -> Result<u64> {
        if self.subscriptions.contains(address).await {
            return Err(Error::AlreadySubscribed(address.to_string()));
        }

        let head = self.current_block().await?;

        // Another subscribe may have won the race while the head lookup was in flight
        if !self.subscriptions.insert_if_absent(address, head).await {
            return Err(Error::AlreadySubscribed(address.to_string()));
        }

        info!("Subscribed {} at block {}", address, head);
        Ok(head)
    }

    /// Subscribed addresses with their initial block, sorted by address.
    pub async fn subscribed(&self) -> Vec<(String, u64)> {
        self.subscriptions.list().await
    }

    /// All transactions sent from or to `address` since it was subscribed.
    ///
    /// Fetches only the blocks between the cached synced-through block and the
    /// current head. The cache is left untouched unless the whole walk succeeds.
    /// Results are ordered newest block first.
    pub async fn transactions_for(&self, address: &str) -> Result<Vec<Transaction>> {
        let initial_block = self
            .subscriptions
            .initial_block(address)
            .await
            .ok_or_else(|| Error::NotSubscribed(address.to_string()))?;

        let cached = self.cache.snapshot(address);
        let head = self.current_block().await?;

        if cached.synced_through == head {
            return Ok(ordered(cached.transactions));
        }

        let from = if cached.synced_through == 0 {
            initial_block
        } else {
            cached.synced_through
        };

        if head < from {
            debug!(
                "Head {} is behind sync boundary {} for {}, serving cache",
                head, from, address
            );
            return Ok(ordered(cached.transactions));
        }

        info!("Syncing {} from block {} to {}", address, from, head);
        let fetched = self.walk(address, from, head).await?;
        info!(
            "Found {} transactions for {} in blocks {}..={}",
            fetched.len(),
            address,
            from,
            head
        );

        self.cache.merge(address, fetched.clone(), head);

        Ok(ordered(cached.transactions.into_iter().chain(fetched)))
    }

    /// Collect `address`'s transactions from block `head` back to block `from` inclusive.
    async fn walk(&self, address: &str, from: u64, head: u64) -> Result<Vec<Transaction>> {
        let mut block = self
            .chain
            .block_by_number(head)
            .await?
            .ok_or_else(|| Error::Protocol(format!("head block {} not found", head)))?;

        let mut found = Vec::new();
        loop {
            debug!(
                "Fetched block {} ({} transactions)",
                block.number,
                block.transactions.len()
            );
            found.extend(block.transactions_for(address).cloned());

            if block.number == from {
                return Ok(found);
            }
            if block.number < from {
                return Err(Error::BoundaryNotFound {
                    from,
                    reached: block.number,
                });
            }

            block = self.block_by_hash_with_retry(&block.parent_hash).await?;
        }
    }

    /// Fetch a block by hash, retrying errors and `null` results with linear backoff.
    async fn block_by_hash_with_retry(&self, hash: &str) -> Result<Block> {
        let mut last_error = None;

        for attempt in 0..self.retry.max_attempts {
            let delay = self.retry.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.chain.block_by_hash(hash).await {
                Ok(Some(block)) => return Ok(block),
                Ok(None) => {
                    warn!("Block {} not found (attempt {})", hash, attempt + 1);
                    last_error = Some(Error::Protocol(format!("block {} not found", hash)));
                }
                Err(e) => {
                    warn!("Failed to fetch block {} (attempt {}): {}", hash, attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Protocol(format!("block {} not fetched", hash))))
    }
}

#[async_trait]
impl Parser for ChainWalker {
    async fn get_current_block(&self) -> u64 {
        match self.current_block().await {
            Ok(number) => number,
            Err(e) => {
                warn!("Failed to get current block: {}", e);
                0
            }
        }
    }

    async fn subscribe(&self, address: &str) -> bool {
        match ChainWalker::subscribe(self, address).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to subscribe {}: {}", address, e);
                false
            }
        }
    }

    async fn get_transactions(&self, address: &str) -> Vec<Transaction> {
        match self.transactions_for(address).await {
            Ok(transactions) => transactions,
            Err(e) => {
                warn!("Failed to get transactions for {}: {}", address, e);
                Vec::new()
            }
        }
    }
}

/// Dedup by hash (later entries win) and sort newest block first, then by hash.
fn ordered(transactions: impl IntoIterator<Item = Transaction>) -> Vec<Transaction> {
    let by_hash: HashMap<String, Transaction> = transactions
        .into_iter()
        .map(|tx| (tx.hash.clone(), tx))
        .collect();

    let mut out: Vec<Transaction> = by_hash.into_values().collect();
    out.sort_by(|a, b| {
        b.block_number_u64()
            .cmp(&a.block_number_u64())
            .then_with(|| a.hash.cmp(&b.hash))
    });
    out
}
