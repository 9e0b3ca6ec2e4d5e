//! Node Health Tracking
//!
//! Per-node backoff state. A node that returns a transport failure or a
//! busy status is put into a backoff window; the window length doubles on
//! each consecutive failure up to `max_backoff` and halves on each success
//! down to `min_backoff`.
//!
//! A success never shortens a window that is already running: the node stays
//! unhealthy until `backoff_until` passes.

use serde::Serialize;
use std::time::Duration;

use crate::types::Timestamp;

/// Default lower bound of the backoff window
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_millis(250);

/// Default upper bound of the backoff window
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Mutable health record of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHealth {
    /// When the node was last chosen for an attempt
    last_used_at: Timestamp,

    /// Number of attempts routed to this node
    use_count: u64,

    /// Node is unhealthy before this time
    backoff_until: Timestamp,

    /// Window applied on the next failure
    current_backoff: Duration,

    min_backoff: Duration,

    max_backoff: Duration,

    /// Number of recorded failures
    failure_count: u64,
}

/// Copy of a node's health taken for ranking and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub last_used_at: Timestamp,
    pub use_count: u64,
    pub backoff_until: Timestamp,
    pub current_backoff_ms: u64,
    pub failure_count: u64,
}

impl HealthSnapshot {
    pub fn is_healthy(&self, now: Timestamp) -> bool {
        now >= self.backoff_until
    }
}

impl NodeHealth {
    /// Create a fresh record. Bounds are swapped if given in the wrong order.
    pub fn new(min_backoff: Duration, max_backoff: Duration) -> Self {
        let (min_backoff, max_backoff) = if min_backoff <= max_backoff {
            (min_backoff, max_backoff)
        } else {
            (max_backoff, min_backoff)
        };

        Self {
            last_used_at: 0,
            use_count: 0,
            backoff_until: 0,
            current_backoff: min_backoff,
            min_backoff,
            max_backoff,
            failure_count: 0,
        }
    }

    /// Node may be attempted
    pub fn is_healthy(&self, now: Timestamp) -> bool {
        now >= self.backoff_until
    }

    /// Record a retryable failure and open a backoff window
    pub fn record_failure(&mut self, now: Timestamp) {
        self.failure_count += 1;
        self.backoff_until = now.saturating_add(duration_millis(self.current_backoff));
        self.current_backoff = self
            .current_backoff
            .saturating_mul(2)
            .min(self.max_backoff);
    }

    /// Record a successful attempt. `backoff_until` is left as is.
    pub fn record_success(&mut self, _now: Timestamp) {
        self.current_backoff = (self.current_backoff / 2).max(self.min_backoff);
    }

    /// Record that the node was chosen for an attempt
    pub fn mark_used(&mut self, now: Timestamp) {
        self.use_count += 1;
        self.last_used_at = now;
    }

    /// Time left in the current backoff window, zero when healthy
    pub fn remaining_backoff(&self, now: Timestamp) -> Duration {
        Duration::from_millis(self.backoff_until.saturating_sub(now))
    }

    /// Operator reset to the initial state, keeping the configured bounds
    pub fn reset(&mut self) {
        *self = Self::new(self.min_backoff, self.max_backoff);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            last_used_at: self.last_used_at,
            use_count: self.use_count,
            backoff_until: self.backoff_until,
            current_backoff_ms: duration_millis(self.current_backoff),
            failure_count: self.failure_count,
        }
    }

    pub fn last_used_at(&self) -> Timestamp {
        self.last_used_at
    }

    pub fn use_count(&self) -> u64 {
        self.use_count
    }

    pub fn backoff_until(&self) -> Timestamp {
        self.backoff_until
    }

    pub fn current_backoff(&self) -> Duration {
        self.current_backoff
    }

    pub fn min_backoff(&self) -> Duration {
        self.min_backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }
}

impl Default for NodeHealth {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BACKOFF, DEFAULT_MAX_BACKOFF)
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
