//! Node Management
//!
//! A node is one independently operated endpoint of the network. Each node
//! owns its health record behind its own lock, so concurrent requests that
//! touch different nodes never contend.

pub mod health;
pub mod registry;
pub mod selector;

pub use health::{HealthSnapshot, NodeHealth};
pub use registry::NodeRegistry;
pub use selector::NodeSelector;

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::types::{Hash, NodeId, Timestamp};

/// Transport flavour used to reach nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Unencrypted channel
    #[default]
    Plaintext,
    /// TLS channel pinned to the node certificate hash
    Secure,
}

/// One addressable network endpoint
#[derive(Debug)]
pub struct Node {
    id: NodeId,

    /// host:port
    address: String,

    /// Blake3 hash of the node's TLS certificate, used by secure transports
    cert_hash: Option<Hash>,

    health: Mutex<NodeHealth>,
}

impl Node {
    pub fn new(
        id: NodeId,
        address: impl Into<String>,
        min_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            id,
            address: address.into(),
            cert_hash: None,
            health: Mutex::new(NodeHealth::new(min_backoff, max_backoff)),
        }
    }

    pub fn with_cert_hash(mut self, cert_hash: Option<Hash>) -> Self {
        self.cert_hash = cert_hash;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn cert_hash(&self) -> Option<&Hash> {
        self.cert_hash.as_ref()
    }

    /// Lock the health record. A poisoned lock still holds consistent
    /// state because every mutation is a handful of field writes.
    fn health(&self) -> MutexGuard<'_, NodeHealth> {
        self.health.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_healthy(&self, now: Timestamp) -> bool {
        self.health().is_healthy(now)
    }

    pub fn record_failure(&self, now: Timestamp) {
        self.health().record_failure(now);
    }

    pub fn record_success(&self, now: Timestamp) {
        self.health().record_success(now);
    }

    pub fn mark_used(&self, now: Timestamp) {
        self.health().mark_used(now);
    }

    pub fn remaining_backoff(&self, now: Timestamp) -> Duration {
        self.health().remaining_backoff(now)
    }

    pub fn reset_health(&self) {
        self.health().reset();
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.health().snapshot()
    }
}
