//! Node Registry
//!
//! Fixed set of nodes, addressable by logical id and by network address.
//! Registration happens once at construction; afterwards the registry is
//! read-only apart from the per-node health records.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{HealthSnapshot, Node};
use crate::config::{ClientConfig, ConfigError};
use crate::error::ClientError;
use crate::types::{NodeId, Timestamp};

/// Health report line for diagnostics
#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeStatus {
    pub id: NodeId,
    pub address: String,
    pub healthy: bool,
    pub remaining_backoff_ms: u64,
    pub health: HealthSnapshot,
}

/// Addressable set of nodes
#[derive(Debug)]
pub struct NodeRegistry {
    /// Nodes in registration order
    nodes: Vec<Arc<Node>>,

    by_id: HashMap<NodeId, Arc<Node>>,

    by_address: HashMap<String, Arc<Node>>,
}

impl NodeRegistry {
    /// Build a registry. Ids and addresses must be unique.
    pub fn new(nodes: Vec<Node>) -> Result<Self, ConfigError> {
        if nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }

        let mut by_id = HashMap::with_capacity(nodes.len());
        let mut by_address = HashMap::with_capacity(nodes.len());
        let mut ordered = Vec::with_capacity(nodes.len());

        for node in nodes {
            let node = Arc::new(node);
            if by_id.insert(node.id(), node.clone()).is_some() {
                return Err(ConfigError::DuplicateNodeId(node.id()));
            }
            if by_address.insert(node.address().to_string(), node.clone()).is_some() {
                return Err(ConfigError::DuplicateAddress(node.address().to_string()));
            }
            ordered.push(node);
        }

        info!("📦 Node registry ready with {} nodes", ordered.len());

        Ok(Self {
            nodes: ordered,
            by_id,
            by_address,
        })
    }

    /// Build the registry described by a client configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let min_backoff = Duration::from_millis(config.min_backoff_ms);
        let max_backoff = Duration::from_millis(config.max_backoff_ms);

        let nodes = config
            .nodes
            .iter()
            .map(|entry| {
                Node::new(entry.id, entry.address.clone(), min_backoff, max_backoff)
                    .with_cert_hash(entry.cert_hash)
            })
            .collect();

        Self::new(nodes)
    }

    /// Resolve requested ids to nodes, preserving request order
    pub fn candidates_for(&self, node_ids: &[NodeId]) -> Result<Vec<Arc<Node>>, ClientError> {
        let candidates = node_ids
            .iter()
            .map(|id| self.by_id.get(id).cloned().ok_or(ClientError::UnknownNode(*id)))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Resolved {} candidate nodes", candidates.len());
        Ok(candidates)
    }

    pub fn get(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.by_id.get(&id)
    }

    pub fn get_by_address(&self, address: &str) -> Option<&Arc<Node>> {
        self.by_address.get(address)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// All nodes in registration order
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.iter()
    }

    /// Ids of all nodes in registration order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Health of every node, for diagnostics
    pub fn health_report(&self, now: Timestamp) -> Vec<NodeStatus> {
        self.nodes
            .iter()
            .map(|node| {
                let health = node.snapshot();
                NodeStatus {
                    id: node.id(),
                    address: node.address().to_string(),
                    healthy: health.is_healthy(now),
                    remaining_backoff_ms: health.backoff_until.saturating_sub(now),
                    health,
                }
            })
            .collect()
    }

    /// Operator reset of one node's health
    pub fn reset_health(&self, id: NodeId) -> Result<(), ClientError> {
        let node = self.by_id.get(&id).ok_or(ClientError::UnknownNode(id))?;
        node.reset_health();
        info!("🧹 Health reset for {}", id);
        Ok(())
    }

    /// Operator reset of every node's health
    pub fn reset_all(&self) {
        for node in &self.nodes {
            node.reset_health();
        }
        info!("🧹 Health reset for all {} nodes", self.nodes.len());
    }
}
