//! Error types for the chain walker and its collaborators.

use thiserror::Error;

/// Errors surfaced by the RPC gateway, the walker and configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection or HTTP-level failure talking to the node.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Bad status code, JSON-RPC error object, or a body that does not decode.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The address has no subscription entry.
    #[error("address not subscribed: {0}")]
    NotSubscribed(String),

    /// The address was subscribed before.
    #[error("address already subscribed: {0}")]
    AlreadySubscribed(String),

    /// The parent walk reached a block below the traversal boundary without hitting it.
    #[error("walked past traversal boundary {from} (reached block {reached})")]
    BoundaryNotFound { from: u64, reached: u64 },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
