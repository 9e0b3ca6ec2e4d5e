//! KratOs Client
//!
//! Submits signed transactions and read-only queries to a KratOs network
//! through a fixed set of redundant nodes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      KRATOS CLIENT                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Transaction    Draft → Frozen → Signed (chunk / schedule)  │
//! │  Engine         rank nodes, attempt, classify, fail over    │
//! │  Selector       healthy first, least used, least recent     │
//! │  Registry       static node set, lookup by id or address    │
//! │  Health         per-node exponential backoff                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any single node may be slow or unreachable. Each request goes to the
//! node most likely to succeed and moves on to the next one without caller
//! intervention until it succeeds, is rejected, or runs out of time.

pub mod client;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod execution;
pub mod node;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::{Client, Operator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, ConfigError, NodeEntry};
pub use crypto::{Ed25519Signer, FnSigner, TransactionSigner};
pub use error::{ClientError, ClientResult};
pub use execution::{
    CancelHandle, CancelToken, ExecutionEngine, ExecutionRequest, ExecutionResponse, PrecheckCode,
    Query, TransactionResponse,
};
pub use node::{Node, NodeRegistry, NodeSelector, TransportMode};
pub use transaction::{
    Operation, Transaction, TransactionError, TransactionId, TransactionList, TransactionState,
};
pub use types::{AccountId, NodeId};
