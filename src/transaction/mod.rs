//! Transaction Lifecycle
//!
//! Turns a caller-populated operation into signed, node-addressed payloads:
//!
//! ```text
//! Draft ──freeze──▶ Frozen ──sign──▶ Signed ──execute──▶ Executing ──▶ Completed
//!                     │                 │                          └──▶ Failed
//!                     ├──chunk──▶ TransactionList (one Frozen per chunk)
//!                     └──schedule──▶ ScheduledEnvelope / ScheduleCreate draft
//! ```
//!
//! Frozen transactions hold one payload per candidate node. All payloads carry
//! the same body except for the embedded target node id.

pub mod id;
pub mod lifecycle;
pub mod list;
pub mod operation;
pub mod schedule;
pub mod signature;

pub use id::TransactionId;
pub use lifecycle::{NodePayload, Transaction, TransactionBody, TransactionState};
pub use list::TransactionList;
pub use operation::{ChunkInfo, Operation};
pub use schedule::ScheduledEnvelope;
pub use signature::{SignatureMap, SignaturePair};

use crate::types::NodeId;

/// Maximum memo length in bytes
pub const MAX_MEMO_LEN: usize = 100;

/// Local lifecycle and validation errors. None of these reach the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction is already frozen")]
    AlreadyFrozen,

    #[error("Transaction is not frozen")]
    NotFrozen,

    #[error("Transaction is not signed")]
    NotSigned,

    #[error("Cannot {operation} a transaction in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: TransactionState,
    },

    #[error("At least one node id is required")]
    EmptyNodeList,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Memo too long: {len} bytes (max: {max})")]
    MemoTooLong { len: usize, max: usize },

    #[error("Duplicate signer prefix {prefix} for distinct keys")]
    DuplicateSignerPrefix { prefix: String },

    #[error("{0} cannot be scheduled")]
    UnsupportedForScheduling(&'static str),

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("Content needs {required} chunks (max: {max})")]
    TooManyChunks { required: usize, max: usize },

    #[error("Node {0} is not a target of this transaction")]
    NodeNotInTransaction(NodeId),

    #[error("Payload count {payloads} does not match node count {nodes}")]
    PayloadMismatch { payloads: usize, nodes: usize },

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for TransactionError {
    fn from(e: bincode::Error) -> Self {
        TransactionError::Serialization(e.to_string())
    }
}
