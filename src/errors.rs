use thiserror::Error;

/// Failure of a single JSON-RPC call.
///
/// Only `Transport` is retried by the client; everything else is a
/// deterministic failure of that call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RpcError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RpcError::Transport(_))
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Protocol(format!("malformed payload: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("bson serialization error: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),

    #[error("bson decoding error: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("node unreachable while calling {method}")]
    Unreachable { method: &'static str },

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("reconciliation gap for collection {collection_id}: {reason}")]
    ReconciliationGap {
        collection_id: String,
        reason: String,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
