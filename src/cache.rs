//! Per-address transaction cache
//!
//! In-memory store of the transactions seen for each subscribed address,
//! keyed by transaction hash, together with the block number the address
//! is synced through.
//!
//! Strategy:
//! - Hash is the dedup key, so re-fetching a block never duplicates entries
//! - The synced-through marker only moves forward

use crate::types::Transaction;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Cached view of one address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// All cached transactions (order not guaranteed)
    pub transactions: Vec<Transaction>,
    /// Highest block whose transactions are reflected here (0 if never cached)
    pub synced_through: u64,
}

/// Storage for per-address transaction sets.
pub trait TransactionStore: Send + Sync {
    /// Merge `transactions` into the entry for `address` and record `block_number`.
    ///
    /// A merge for the block the entry is already synced through is a no-op.
    fn merge(&self, address: &str, transactions: Vec<Transaction>, block_number: u64);

    /// Current entry for `address`; empty with `synced_through == 0` if none.
    fn snapshot(&self, address: &str) -> CacheSnapshot;

    /// Addresses that have an entry.
    fn addresses(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
struct Entry {
    synced_through: u64,
    transactions: HashMap<String, Transaction>,
}

/// `TransactionStore` held in process memory behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for MemoryCache {
    fn merge(&self, address: &str, transactions: Vec<Transaction>, block_number: u64) {
        let mut entries = self.entries.write();

        let Some(entry) = entries.get_mut(address) else {
            let transactions = transactions
                .into_iter()
                .map(|tx| (tx.hash.clone(), tx))
                .collect();
            entries.insert(
                address.to_string(),
                Entry {
                    synced_through: block_number,
                    transactions,
                },
            );
            return;
        };

        if entry.synced_through == block_number {
            return;
        }

        for tx in transactions {
            entry.transactions.insert(tx.hash.clone(), tx);
        }

        if block_number > entry.synced_through {
            entry.synced_through = block_number;
        } else {
            tracing::warn!(
                address,
                stored = entry.synced_through,
                incoming = block_number,
                "ignoring older synced-through block"
            );
        }
    }

    fn snapshot(&self, address: &str) -> CacheSnapshot {
        let entries = self.entries.read();
        match entries.get(address) {
            Some(entry) => CacheSnapshot {
                transactions: entry.transactions.values().cloned().collect(),
                synced_through: entry.synced_through,
            },
            None => CacheSnapshot::default(),
        }
    }

    fn addresses(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}
