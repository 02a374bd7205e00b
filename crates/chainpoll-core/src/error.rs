//! Error types shared across the ChainPoll crates.

use serde_json::Value;
use thiserror::Error;

/// Failure to parse a hex primitive or block identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected {expected} hex digits, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid block number or tag: {0:?}")]
    InvalidBlock(String),
}

/// Errors raised while building a log filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The address string could not be normalized to 20 bytes.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// `fromBlock` / `toBlock` were not supplied before the filter was used.
    #[error("filter block range is incomplete (fromBlock and toBlock must both be set)")]
    MissingBlockRange,
}

/// Errors raised while assembling the job registry at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("job {job:?}: {source}")]
    Filter {
        job: String,
        #[source]
        source: FilterError,
    },

    #[error("job {0:?} is registered more than once")]
    DuplicateJob(String),

    #[error("job id must not be empty")]
    EmptyJobId,
}

/// Coarse failure class, used for logging and per-session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connection error, timeout or an HTTP status outside 200–399.
    Transport,
    /// The body was not a recognizable JSON-RPC response.
    MalformedResponse,
    /// The node answered with a JSON-RPC `error` member.
    Rpc,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::MalformedResponse => write!(f, "malformed-response"),
            Self::Rpc => write!(f, "rpc-error"),
        }
    }
}

/// Errors that can occur during a single poll round-trip.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, DNS, body read, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with a status outside 200–399.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    /// Request did not complete within the configured deadline.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response body is not valid JSON or has no JSON-RPC shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// JSON-RPC `error` member returned by the node.
    #[error("RPC error: {0}")]
    Rpc(Value),

    /// The request could not be serialized.
    #[error("request encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TransportError {
    /// Classify this error for reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http(_) | Self::Status { .. } | Self::Timeout { .. } | Self::Encode(_) => {
                FailureKind::Transport
            }
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
            Self::Rpc(_) => FailureKind::Rpc,
        }
    }

    /// The JSON-RPC error code, if this is an RPC error carrying one.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc(err) => err.get("code").and_then(Value::as_i64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(TransportError::Http("refused".into()).kind(), FailureKind::Transport);
        assert_eq!(TransportError::Status { status: 502 }.kind(), FailureKind::Transport);
        assert_eq!(TransportError::Timeout { ms: 10 }.kind(), FailureKind::Transport);
        assert_eq!(
            TransportError::MalformedResponse("eof".into()).kind(),
            FailureKind::MalformedResponse
        );
        assert_eq!(
            TransportError::Rpc(serde_json::json!({"code": -32000})).kind(),
            FailureKind::Rpc
        );
    }

    #[test]
    fn rpc_code_extracted() {
        let err = TransportError::Rpc(serde_json::json!({
            "code": -32005,
            "message": "query returned more than 10000 results"
        }));
        assert_eq!(err.rpc_code(), Some(-32005));
        assert_eq!(TransportError::Status { status: 500 }.rpc_code(), None);
    }

    #[test]
    fn registry_error_names_job() {
        let err = RegistryError::Filter {
            job: "job-a".into(),
            source: FilterError::MissingBlockRange,
        };
        assert!(err.to_string().contains("\"job-a\""));
    }
}
