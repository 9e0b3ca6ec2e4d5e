// Execution envelopes
// Principle: the engine sees one method, an ordered node list and a payload per node

use serde::Serialize;

use super::MethodId;
use crate::transaction::{Transaction, TransactionError, TransactionId};
use crate::types::{Hash, NodeId};

/// What the envelope was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Transaction(TransactionId),
    Query,
}

/// Read-only request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub method: MethodId,
    pub payload: Vec<u8>,

    /// Candidate nodes. Empty means every registered node.
    pub node_ids: Vec<NodeId>,
}

impl Query {
    pub fn new(method: MethodId, payload: Vec<u8>) -> Self {
        Self {
            method,
            payload,
            node_ids: Vec::new(),
        }
    }

    pub fn with_node_ids(mut self, node_ids: Vec<NodeId>) -> Self {
        self.node_ids = node_ids;
        self
    }
}

/// A request ready for delivery
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    kind: RequestKind,
    method: MethodId,
    node_ids: Vec<NodeId>,
    payloads: Vec<Vec<u8>>,
}

impl ExecutionRequest {
    /// Envelope for a signed transaction, one wire payload per target node
    pub fn from_transaction(tx: &Transaction) -> Result<Self, TransactionError> {
        tx.validate_for_execution()?;
        let transaction_id = tx
            .transaction_id()
            .ok_or(TransactionError::MissingField("transaction_id"))?;

        let payloads = tx
            .payloads()
            .iter()
            .map(|p| p.wire_bytes())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind: RequestKind::Transaction(transaction_id),
            method: tx.operation().method(),
            node_ids: tx.node_ids().to_vec(),
            payloads,
        })
    }

    /// Envelope for a query. Every node receives the same bytes.
    pub fn from_query(query: &Query, node_ids: Vec<NodeId>) -> Result<Self, TransactionError> {
        if node_ids.is_empty() {
            return Err(TransactionError::EmptyNodeList);
        }
        Ok(Self {
            kind: RequestKind::Query,
            method: query.method,
            payloads: vec![query.payload.clone(); node_ids.len()],
            node_ids,
        })
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    pub fn payload_for(&self, node_id: NodeId) -> Option<&[u8]> {
        self.node_ids
            .iter()
            .position(|id| *id == node_id)
            .map(|i| self.payloads[i].as_slice())
    }
}

/// Successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResponse {
    /// Node that answered
    pub node_id: NodeId,
    pub payload: Vec<u8>,

    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// Accepted transaction, correlated to its signed payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionResponse {
    pub node_id: NodeId,
    pub transaction_id: TransactionId,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
    pub attempts: u32,
}

mod hex_hash {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(hash: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }
}
