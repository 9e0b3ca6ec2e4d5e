//! Client Configuration
//!
//! Static node list plus the tuning knobs of backoff, execution and chunking.
//! Default values match the public KratOs test network layout.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::execution::ExecutionConfig;
use crate::node::TransportMode;
use crate::types::{option_hash_serde, Balance, Hash, NodeId};

/// Configuration errors, raised while building a client or registry
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one node must be configured")]
    NoNodes,

    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    #[error("Duplicate node address: {0}")]
    DuplicateAddress(String),

    #[error("min_backoff_ms ({min}) must not exceed max_backoff_ms ({max})")]
    InvalidBackoff { min: u64, max: u64 },

    #[error("min_backoff_ms must be greater than zero")]
    ZeroMinBackoff,

    #[error("attempt_timeout_fraction ({0}) must be in (0, 1]")]
    InvalidAttemptFraction(f64),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(String),
}

/// One statically configured node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: NodeId,

    /// host:port
    pub address: String,

    /// Certificate hash (hex) pinned by secure transports
    #[serde(default, with = "option_hash_serde")]
    pub cert_hash: Option<Hash>,
}

impl NodeEntry {
    pub fn new(id: u64, address: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            address: address.into(),
            cert_hash: None,
        }
    }
}

/// Main configuration for the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    // === Network ===

    /// Human readable network name, informational only
    pub network_name: String,

    /// Transport flavour for every node channel
    pub transport: TransportMode,

    // === Backoff ===

    /// Backoff applied after a node's first failure (milliseconds)
    pub min_backoff_ms: u64,

    /// Ceiling for the doubling backoff (milliseconds)
    pub max_backoff_ms: u64,

    // === Execution ===

    /// Overall deadline for one request (seconds)
    pub request_timeout_secs: u64,

    /// Cap on node attempts per request, unset means one pass over candidates
    pub max_attempts: Option<u32>,

    /// Share of the remaining deadline one attempt may use
    pub attempt_timeout_fraction: f64,

    /// Sleep out a node's backoff window instead of hitting it immediately
    pub wait_for_unhealthy_nodes: bool,

    // === Transactions ===

    /// Maximum content bytes per chunk
    pub max_chunk_size: usize,

    /// Maximum chunks per chunked transaction
    pub max_chunks: usize,

    /// Fee ceiling applied when a transaction sets none (base units)
    pub default_max_fee: u64,

    /// Validity window applied when a transaction sets none (seconds)
    pub transaction_valid_duration_secs: u64,

    // === Nodes ===

    pub nodes: Vec<NodeEntry>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network_name: "kratos-local".to_string(),
            transport: TransportMode::Plaintext,

            min_backoff_ms: 250,
            max_backoff_ms: 8_000,

            request_timeout_secs: 120,
            max_attempts: None,
            attempt_timeout_fraction: 0.5,
            wait_for_unhealthy_nodes: true,

            max_chunk_size: 1024,
            max_chunks: 20,
            default_max_fee: 200_000_000, // 2 KRAT
            transaction_valid_duration_secs: 120,

            // Local four node network
            nodes: vec![
                NodeEntry::new(3, "127.0.0.1:50211"),
                NodeEntry::new(4, "127.0.0.1:50212"),
                NodeEntry::new(5, "127.0.0.1:50213"),
                NodeEntry::new(6, "127.0.0.1:50214"),
            ],
        }
    }
}

impl ClientConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // Builder-style methods

    pub fn with_nodes(mut self, nodes: Vec<NodeEntry>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_backoff(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_backoff_ms = min_ms;
        self.max_backoff_ms = max_ms;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_wait_for_unhealthy_nodes(mut self, wait: bool) -> Self {
        self.wait_for_unhealthy_nodes = wait;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        for (i, entry) in self.nodes.iter().enumerate() {
            let earlier = &self.nodes[..i];
            if earlier.iter().any(|e| e.id == entry.id) {
                return Err(ConfigError::DuplicateNodeId(entry.id));
            }
            if earlier.iter().any(|e| e.address == entry.address) {
                return Err(ConfigError::DuplicateAddress(entry.address.clone()));
            }
        }

        if self.min_backoff_ms == 0 {
            return Err(ConfigError::ZeroMinBackoff);
        }
        if self.min_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff {
                min: self.min_backoff_ms,
                max: self.max_backoff_ms,
            });
        }

        let fraction = self.attempt_timeout_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::InvalidAttemptFraction(fraction));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("request_timeout_secs"));
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::ZeroValue("max_attempts"));
        }
        if self.max_chunk_size == 0 {
            return Err(ConfigError::ZeroValue("max_chunk_size"));
        }
        if self.max_chunks == 0 {
            return Err(ConfigError::ZeroValue("max_chunks"));
        }
        if self.transaction_valid_duration_secs == 0 {
            return Err(ConfigError::ZeroValue("transaction_valid_duration_secs"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn default_max_fee(&self) -> Balance {
        Balance::from(self.default_max_fee)
    }

    /// Engine settings derived from this configuration
    pub fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            transport: self.transport,
            max_attempts: self.max_attempts,
            attempt_timeout_fraction: self.attempt_timeout_fraction,
            wait_for_unhealthy_nodes: self.wait_for_unhealthy_nodes,
        }
    }
}
