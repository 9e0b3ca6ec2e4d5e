//! Client errors
//!
//! Exactly one terminal outcome is reported per logical request. Local
//! errors are raised before any network call and never penalise a node.

use crate::config::ConfigError;
use crate::execution::status::PrecheckCode;
use crate::transaction::TransactionError;
use crate::types::NodeId;

/// Errors surfaced to callers of the client and the execution engine
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Local lifecycle or validation failure
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// The node rejected the request itself; retrying elsewhere would not help
    #[error("Precheck failed on {node_id}: {code:?}")]
    Precheck { node_id: NodeId, code: PrecheckCode },

    /// Deadline or attempt budget ran out without a terminal answer
    #[error(
        "Deadline exceeded after {attempts} attempts across {nodes_tried:?}{}",
        last_error_suffix(.last_error)
    )]
    DeadlineExceeded {
        attempts: u32,
        nodes_tried: Vec<NodeId>,
        last_error: Option<String>,
    },

    /// A chunk of a chunked transaction failed; earlier chunks were committed
    #[error("Chunk {index} failed after {committed} committed chunks: {source}")]
    ChunkFailed {
        index: usize,
        committed: usize,
        #[source]
        source: Box<ClientError>,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

impl ClientError {
    /// Raised before any network call
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::Transaction(_) | ClientError::UnknownNode(_) | ClientError::Config(_)
        )
    }

    /// Number of node attempts made before this error, when known
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ClientError::DeadlineExceeded { attempts, .. } => Some(*attempts),
            ClientError::ChunkFailed { source, .. } => source.attempts(),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_classification() {
        assert!(ClientError::UnknownNode(NodeId(9)).is_local());
        assert!(ClientError::Transaction(TransactionError::AlreadyFrozen).is_local());
        assert!(!ClientError::Cancelled.is_local());
        assert!(!ClientError::Precheck {
            node_id: NodeId(3),
            code: PrecheckCode::InvalidSignature
        }
        .is_local());
    }

    #[test]
    fn test_deadline_message() {
        let err = ClientError::DeadlineExceeded {
            attempts: 2,
            nodes_tried: vec![NodeId(3), NodeId(4)],
            last_error: Some("connection reset".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("2 attempts"));
        assert!(msg.contains("connection reset"));
        assert_eq!(err.attempts(), Some(2));
    }

    #[test]
    fn test_chunk_failed_attempts() {
        let err = ClientError::ChunkFailed {
            index: 1,
            committed: 1,
            source: Box::new(ClientError::DeadlineExceeded {
                attempts: 3,
                nodes_tried: vec![],
                last_error: None,
            }),
        };
        assert_eq!(err.attempts(), Some(3));
        assert!(err.to_string().starts_with("Chunk 1 failed"));
    }
}
