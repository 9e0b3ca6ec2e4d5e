//! Node Selection
//!
//! Ranks candidate nodes for one request. Healthy nodes come first; within
//! the same health status the least used node wins, then the least recently
//! used, then the lower node id. The ranking is computed fresh per request
//! from health snapshots, which may be slightly stale under concurrency.

use std::cmp::Ordering;
use std::sync::Arc;

use super::{HealthSnapshot, Node};
use crate::types::{NodeId, Timestamp};

/// Stateless ranking of candidate nodes
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeSelector;

impl NodeSelector {
    pub fn new() -> Self {
        Self
    }

    /// Total order over (id, health) pairs at time `now`
    pub fn compare(
        a: (NodeId, &HealthSnapshot),
        b: (NodeId, &HealthSnapshot),
        now: Timestamp,
    ) -> Ordering {
        let (a_id, a) = a;
        let (b_id, b) = b;

        // Healthy sorts first, so compare with the operands flipped
        b.is_healthy(now)
            .cmp(&a.is_healthy(now))
            .then(a.use_count.cmp(&b.use_count))
            .then(a.last_used_at.cmp(&b.last_used_at))
            .then(a_id.cmp(&b_id))
    }

    /// Order candidates into an attempt sequence
    pub fn rank(&self, candidates: Vec<Arc<Node>>, now: Timestamp) -> Vec<Arc<Node>> {
        let mut keyed: Vec<(HealthSnapshot, Arc<Node>)> = candidates
            .into_iter()
            .map(|node| (node.snapshot(), node))
            .collect();

        keyed.sort_by(|(a_health, a), (b_health, b)| {
            Self::compare((a.id(), a_health), (b.id(), b_health), now)
        });

        keyed.into_iter().map(|(_, node)| node).collect()
    }
}
