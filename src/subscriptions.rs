//! Subscription bookkeeping
//!
//! Maps each subscribed address to the head block number recorded when it
//! was subscribed. Entries are created once and never changed or removed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Address -> initial block map shared across requests.
#[derive(Debug, Default)]
pub struct Subscriptions {
    addresses: RwLock<HashMap<String, u64>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `address` at `initial_block` unless it is already present.
    ///
    /// Returns `false` if the address was already subscribed; the existing
    /// entry is left untouched.
    pub async fn insert_if_absent(&self, address: &str, initial_block: u64) -> bool {
        let mut addresses = self.addresses.write().await;
        match addresses.entry(address.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(initial_block);
                true
            }
        }
    }

    /// Block number recorded at subscribe time.
    pub async fn initial_block(&self, address: &str) -> Option<u64> {
        self.addresses.read().await.get(address).copied()
    }

    pub async fn contains(&self, address: &str) -> bool {
        self.addresses.read().await.contains_key(address)
    }

    pub async fn len(&self) -> usize {
        self.addresses.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.addresses.read().await.is_empty()
    }

    /// All subscriptions, sorted by address.
    pub async fn list(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .addresses
            .read()
            .await
            .iter()
            .map(|(addr, block)| (addr.clone(), *block))
            .collect();
        entries.sort();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_once() {
        let subs = Subscriptions::new();
        assert!(subs.is_empty().await);

        assert!(subs.insert_if_absent("0xa", 100).await);
        assert!(!subs.insert_if_absent("0xa", 200).await);

        assert_eq!(subs.initial_block("0xa").await, Some(100));
        assert_eq!(subs.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_address() {
        let subs = Subscriptions::new();
        assert!(!subs.contains("0xa").await);
        assert_eq!(subs.initial_block("0xa").await, None);
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let subs = Subscriptions::new();
        subs.insert_if_absent("0xb", 2).await;
        subs.insert_if_absent("0xa", 1).await;

        assert_eq!(
            subs.list().await,
            vec![("0xa".to_string(), 1), ("0xb".to_string(), 2)]
        );
    }
}
