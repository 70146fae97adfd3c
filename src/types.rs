//! Ethereum JSON-RPC types
//!
//! Type definitions for blocks and transactions returned from
//! `eth_getBlockByNumber` / `eth_getBlockByHash` with full transaction objects.
//! Chain-native fields are kept as the strings the node sent; only block
//! numbers are ever interpreted.

use serde::{Deserialize, Deserializer, Serialize};

/// Ethereum transaction as embedded in a full block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash
    #[serde(rename = "hash")]
    pub hash: String,

    /// Sender address
    #[serde(rename = "from")]
    pub from: String,

    /// Recipient address (empty for contract creation)
    #[serde(rename = "to", default, deserialize_with = "deserialize_string_or_null")]
    pub to: String,

    /// Value transferred in wei (hex string, displayed as received)
    #[serde(rename = "value")]
    pub value: String,

    /// Hash of the containing block
    #[serde(rename = "blockHash", default, deserialize_with = "deserialize_string_or_null")]
    pub block_hash: String,

    /// Number of the containing block (hex string)
    #[serde(rename = "blockNumber", default, deserialize_with = "deserialize_string_or_null")]
    pub block_number: String,
}

impl Transaction {
    /// Check if `address` is the sender or the recipient.
    pub fn involves(&self, address: &str) -> bool {
        self.to == address || self.from == address
    }

    /// Containing block number, if the node reported a parseable one.
    pub fn block_number_u64(&self) -> Option<u64> {
        parse_hex_u64(&self.block_number).ok()
    }
}

/// Ethereum block with full transaction details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Block {
    /// Block hash
    #[serde(rename = "hash", default, deserialize_with = "deserialize_string_or_null")]
    pub hash: String,

    /// Hash of the parent block
    #[serde(rename = "parentHash")]
    pub parent_hash: String,

    /// Block number (hex string in JSON, parsed to u64)
    #[serde(rename = "number", deserialize_with = "deserialize_hex_u64")]
    pub number: u64,

    /// Transactions in block order
    #[serde(rename = "transactions", default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Transactions in this block sent from or to `address`, in block order.
    pub fn transactions_for<'a>(&'a self, address: &'a str) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions.iter().filter(move |tx| tx.involves(address))
    }
}

/// Parse a `0x`-prefixed (or bare) hex quantity into a u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, std::num::ParseIntError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16)
}

/// Encode a block number as a JSON-RPC quantity: `0x` + lowercase hex, no leading zeros.
pub fn to_hex(n: u64) -> String {
    format!("0x{:x}", n)
}

// Hex deserialization helpers

/// Deserialize a hex string to u64.
fn deserialize_hex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        return Err(serde::de::Error::custom("empty block number"));
    }
    parse_hex_u64(&s).map_err(serde::de::Error::custom)
}

/// Deserialize a string that the node may send as `null` (pending blocks, contract creation).
fn deserialize_string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
