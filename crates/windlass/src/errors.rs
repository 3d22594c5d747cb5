use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A structured error suitable for returning to an agent client as tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub data: Value,
}

impl ToolError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Value::Null,
        }
    }
}

/// Failure of a chain-level submit/confirm pipeline, split by whether the
/// cluster declined the transaction or we simply couldn't reach it.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The transaction was rejected by simulation or by the cluster
    /// (program error, insufficient funds, slippage bound, ...).
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// Transport-level failure: no configured endpoint produced an answer.
    #[error("rpc unavailable: {0}")]
    Unavailable(String),
}

/// The failure taxonomy every operation adapter returns.
///
/// The four kinds are deliberately distinguishable by the caller:
/// validation and credential failures never touch the network, protocol
/// rejections mean the external service declined, and connectivity failures
/// mean it never answered.
#[derive(Debug, Error)]
pub enum OpError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("credential rejected: {0}")]
    Credential(String),

    #[error("service unreachable: {0}")]
    Connectivity(String),

    #[error("protocol rejected: {0}")]
    Protocol(String),
}

impl OpError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Classify an HTTP round-trip error: a transport failure is
    /// connectivity, anything the service answered with is a protocol
    /// rejection.
    pub fn from_http(e: &reqwest::Error) -> Self {
        if e.is_status() {
            Self::Protocol(e.to_string())
        } else {
            Self::Connectivity(e.to_string())
        }
    }

    /// Wrap a read-path RPC failure. Reads that fail after endpoint
    /// rotation are connectivity failures by definition: nothing was
    /// submitted, so there is nothing the protocol could have declined.
    pub fn from_rpc_read(e: eyre::Report) -> Self {
        Self::Connectivity(format!("{e:#}"))
    }
}

impl From<ChainError> for OpError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Rejected(msg) => Self::Protocol(msg),
            ChainError::Unavailable(msg) => Self::Connectivity(msg),
        }
    }
}

impl From<OpError> for ToolError {
    fn from(e: OpError) -> Self {
        match e {
            OpError::InvalidRequest(msg) => Self::new("invalid_request", msg),
            OpError::Credential(msg) => Self::new("invalid_credential", msg),
            OpError::Connectivity(msg) => Self::new("rpc_unavailable", msg),
            OpError::Protocol(msg) => Self::new("protocol_rejected", msg),
        }
    }
}
