//! txwatch - Ethereum address transaction tracker
//!
//! Tracks every transaction in which a subscribed address appears as sender
//! or receiver by incrementally walking the chain's block history over
//! JSON-RPC and merging the results into a per-address cache.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod rpc;
pub mod subscriptions;
pub mod types;
pub mod walker;

// Re-export the main types for convenience
pub use cache::{CacheSnapshot, MemoryCache, TransactionStore};
pub use config::{ParserConfig, RetryPolicy};
pub use error::{Error, Result};
pub use rpc::{ChainSource, RpcClient};
pub use types::{Block, Transaction};
pub use walker::{ChainWalker, Parser};
