// Scripted in-memory network for engine tests
// Each node answers from its own queue of steps, then falls back to a default

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::{Clock, ManualClock, TokioClock};
use crate::crypto::Ed25519Signer;
use crate::execution::{
    Channel, ChannelFactory, ExecutionConfig, ExecutionEngine, MethodId, NodeResponse, PrecheckCode,
    TransportError,
};
use crate::node::{Node, NodeRegistry, TransportMode};
use crate::transaction::{Operation, Transaction, TransactionId};
use crate::types::{AccountId, FileId, NodeId};

/// Start time of every test clock
pub const T0: u64 = 1_700_000_000_000;

pub const MIN_BACKOFF: Duration = Duration::from_millis(250);
pub const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// What a node does with the next request it receives
#[derive(Debug, Clone)]
pub enum Step {
    Respond(NodeResponse),
    Fail(TransportError),
    /// Bytes that do not decode as a node response
    Garbage,
    /// Respond after a delay
    Delay(Duration, NodeResponse),
    /// Never answer
    Hang,
}

impl Step {
    pub fn ok() -> Self {
        Step::Respond(NodeResponse::ok(b"ok".to_vec()))
    }

    pub fn precheck(code: PrecheckCode) -> Self {
        Step::Respond(NodeResponse::status(code))
    }

    pub fn reset() -> Self {
        Step::Fail(TransportError::ConnectionReset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub node_id: NodeId,
    pub method: MethodId,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    scripts: Mutex<HashMap<NodeId, VecDeque<Step>>>,
    calls: Mutex<Vec<Call>>,
}

/// Channel factory whose nodes follow per-node scripts
#[derive(Clone, Default)]
pub struct ScriptedNetwork {
    inner: Arc<Inner>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `steps` for `node`. Once drained the node answers `Ok`.
    pub fn script(&self, node: u64, steps: Vec<Step>) -> &Self {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .entry(NodeId(node))
            .or_default()
            .extend(steps);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn called_nodes(&self) -> Vec<NodeId> {
        self.calls().iter().map(|c| c.node_id).collect()
    }
}

struct ScriptedChannel {
    node_id: NodeId,
    inner: Arc<Inner>,
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn send(&self, method: MethodId, request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        self.inner.calls.lock().unwrap().push(Call {
            node_id: self.node_id,
            method,
            payload: request,
        });

        let step = self
            .inner
            .scripts
            .lock()
            .unwrap()
            .get_mut(&self.node_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(Step::ok);

        match step {
            Step::Respond(response) => Ok(response.encode().unwrap()),
            Step::Fail(e) => Err(e),
            Step::Garbage => Ok(vec![0xff; 3]),
            Step::Delay(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response.encode().unwrap())
            }
            Step::Hang => std::future::pending().await,
        }
    }
}

impl ChannelFactory for ScriptedNetwork {
    fn channel(
        &self,
        node: &Node,
        _mode: TransportMode,
    ) -> Result<Arc<dyn Channel>, TransportError> {
        Ok(Arc::new(ScriptedChannel {
            node_id: node.id(),
            inner: self.inner.clone(),
        }))
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn registry(ids: &[u64]) -> Arc<NodeRegistry> {
    let nodes = ids
        .iter()
        .map(|&id| {
            let address = format!("10.0.0.{}:50211", id);
            Node::new(NodeId(id), address, MIN_BACKOFF, MAX_BACKOFF)
        })
        .collect();
    Arc::new(NodeRegistry::new(nodes).unwrap())
}

pub struct Harness {
    pub network: ScriptedNetwork,
    pub clock: Arc<dyn Clock>,
    pub engine: ExecutionEngine,
}

impl Harness {
    /// Health time frozen at `T0`
    pub fn new(ids: &[u64]) -> Self {
        Self::with_config(ids, ExecutionConfig::default())
    }

    pub fn with_config(ids: &[u64], config: ExecutionConfig) -> Self {
        Self::build(ids, config, Arc::new(ManualClock::new(T0)))
    }

    /// Health time follows tokio time from `T0`, for `start_paused` tests
    pub fn paused(ids: &[u64]) -> Self {
        Self::build(ids, ExecutionConfig::default(), Arc::new(TokioClock::new(T0)))
    }

    fn build(ids: &[u64], config: ExecutionConfig, clock: Arc<dyn Clock>) -> Self {
        let network = ScriptedNetwork::new();
        let channels = Arc::new(network.clone());
        let engine = ExecutionEngine::new(registry(ids), channels, clock.clone(), config).unwrap();
        Self {
            network,
            clock,
            engine,
        }
    }

    pub fn node(&self, id: u64) -> &Arc<Node> {
        self.engine.registry().get(NodeId(id)).unwrap()
    }
}

pub fn node_ids(ids: &[u64]) -> Vec<NodeId> {
    ids.iter().copied().map(NodeId).collect()
}

pub fn payer() -> AccountId {
    AccountId([1; 32])
}

/// Frozen and signed file delete addressed to `ids`
pub fn signed_transaction(ids: &[u64]) -> Transaction {
    let mut tx = Transaction::new(Operation::FileDelete { file_id: Some(FileId(42)) });
    tx.set_transaction_id(TransactionId::new(payer(), T0)).unwrap();
    tx.freeze_with(&node_ids(ids)).unwrap();
    tx.sign(&Ed25519Signer::from_secret([7; 32])).unwrap();
    tx
}
