//! JSON-RPC client for Ethereum nodes
//!
//! Provides a typed interface to the three node methods the walker needs.
//! One call is one HTTP POST; retry policy belongs to the caller.

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::types::{parse_hex_u64, to_hex, Block};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Read access to the chain, as seen by the walker.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current head block number (`eth_blockNumber`).
    async fn block_number(&self) -> Result<u64>;

    /// Block with full transactions by number. `None` if the node does not know it.
    async fn block_by_number(&self, number: u64) -> Result<Option<Block>>;

    /// Block with full transactions by hash. `None` if the node does not know it.
    async fn block_by_hash(&self, hash: &str) -> Result<Option<Block>>;
}

/// JSON-RPC client for Ethereum nodes.
#[derive(Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a new RPC client with a default HTTP client.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Create a client from a validated configuration.
    pub fn from_config(config: &ParserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: config.http_client()?,
            url: config.node_url.trim().to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a JSON-RPC call and decode its `result` member into `T`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::protocol(format!(
                "{}: unexpected status code {}",
                method, status
            )));
        }

        let body = response.bytes().await?;
        let json: Value = serde_json::from_slice(&body)
            .map_err(|e| Error::protocol(format!("{}: invalid JSON body: {}", method, e)))?;

        if let Some(error) = json.get("error") {
            return Err(Error::protocol(format!("{}: RPC error: {}", method, error)));
        }

        let result = json
            .get("result")
            .cloned()
            .ok_or_else(|| Error::protocol(format!("{}: response missing 'result' field", method)))?;

        serde_json::from_value(result)
            .map_err(|e| Error::protocol(format!("{}: unexpected result shape: {}", method, e)))
    }
}

#[async_trait]
impl ChainSource for RpcClient {
    async fn block_number(&self) -> Result<u64> {
        let number: String = self.call("eth_blockNumber", json!([])).await?;
        parse_hex_u64(&number)
            .map_err(|e| Error::protocol(format!("invalid block number {:?}: {}", number, e)))
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<Block>> {
        self.call("eth_getBlockByNumber", json!([to_hex(number), true]))
            .await
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<Block>> {
        self.call("eth_getBlockByHash", json!([hash, true])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn block_json(number: &str, hash: &str, parent: &str) -> Value {
        json!({
            "hash": hash,
            "parentHash": parent,
            "number": number,
            "transactions": [{
                "hash": "0x01",
                "from": "0xa",
                "to": "0xb",
                "value": "0x1",
                "blockHash": hash,
                "blockNumber": number
            }]
        })
    }

    #[tokio::test]
    async fn test_block_number() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .json_body(json!({"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber", "params": []}));
                then.status(200)
                    .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0x13ecaeb"}));
            })
            .await;

        let rpc = RpcClient::new(server.url("/"));
        assert_eq!(rpc.block_number().await.unwrap(), 20_892_395);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_block_by_number_encodes_hex_param() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/").json_body(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "eth_getBlockByNumber",
                    "params": ["0x64", true]
                }));
                then.status(200).json_body(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": block_json("0x64", "0xb100", "0xb099")
                }));
            })
            .await;

        let rpc = RpcClient::new(server.url("/"));
        let block = rpc.block_by_number(100).await.unwrap().unwrap();
        assert_eq!(block.number, 100);
        assert_eq!(block.parent_hash, "0xb099");
        assert_eq!(block.transactions.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_block_by_hash_null_result() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(200)
                    .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": null}));
            })
            .await;

        let rpc = RpcClient::new(server.url("/"));
        assert!(rpc.block_by_hash("0xdead").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_ok_status_is_protocol_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(429).body("too many requests");
            })
            .await;

        let rpc = RpcClient::new(server.url("/"));
        assert!(matches!(rpc.block_number().await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_rpc_error_object_is_protocol_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(200).json_body(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {"code": -32601, "message": "method not found"}
                }));
            })
            .await;

        let rpc = RpcClient::new(server.url("/"));
        assert!(matches!(rpc.block_number().await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_invalid_json_is_protocol_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(200).body("<html>gateway</html>");
            })
            .await;

        let rpc = RpcClient::new(server.url("/"));
        assert!(matches!(rpc.block_by_number(1).await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let rpc = RpcClient::new("http://127.0.0.1:1");
        assert!(matches!(rpc.block_number().await, Err(Error::Transport(_))));
    }

    #[test]
    fn test_from_config_rejects_empty_url() {
        let config = ParserConfig::default().with_node_url("");
        assert!(matches!(RpcClient::from_config(&config), Err(Error::Config(_))));
    }
}
