// Precheck status codes and their classification
// Principle: the engine only cares whether an answer is final, retryable elsewhere, or fatal

use serde::{Deserialize, Serialize};

/// Node-local validation outcome returned with every response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrecheckCode {
    Ok,
    /// Node is congested
    Busy,
    /// Node accepted the connection but could not create the transaction
    PlatformTransactionNotCreated,
    /// Node is still starting up or syncing
    PlatformNotActive,
    InvalidSignature,
    InsufficientTxFee,
    InvalidTransactionBody,
    DuplicateTransaction,
    TransactionExpired,
    /// Ledger code without a dedicated variant
    Other(u32),
}

/// How the engine treats a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Ok,
    /// Try the next candidate, penalise this node
    Retryable,
    /// Stop, surface the error, leave the node's health alone
    Fatal,
}

impl PrecheckCode {
    pub fn classify(&self) -> Classification {
        match self {
            PrecheckCode::Ok => Classification::Ok,
            PrecheckCode::Busy
            | PrecheckCode::PlatformTransactionNotCreated
            | PrecheckCode::PlatformNotActive => Classification::Retryable,
            _ => Classification::Fatal,
        }
    }
}

/// Response frame sent back by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub status: PrecheckCode,
    pub payload: Vec<u8>,
}

impl NodeResponse {
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            status: PrecheckCode::Ok,
            payload,
        }
    }

    pub fn status(status: PrecheckCode) -> Self {
        Self {
            status,
            payload: Vec::new(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
