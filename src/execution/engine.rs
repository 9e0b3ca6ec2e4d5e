// Execution engine - retry and failover across ranked nodes
// Principle: one pass over fresh rankings, per-attempt timeouts carved from the deadline,
// health updated on every outcome except fatal prechecks

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::channel::ChannelFactory;
use super::request::{ExecutionRequest, ExecutionResponse, Query, TransactionResponse};
use super::status::{Classification, NodeResponse, PrecheckCode};
use super::{MethodId, TransportError};
use crate::clock::Clock;
use crate::config::ConfigError;
use crate::error::{ClientError, ClientResult};
use crate::node::{Node, NodeRegistry, NodeSelector, TransportMode};
use crate::transaction::{Transaction, TransactionError, TransactionList};
use crate::types::NodeId;

// =============================================================================
// CANCELLATION
// =============================================================================

/// Caller side of a cancellation pair
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx: Some(rx) })
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: Some(self.tx.subscribe()),
        }
    }
}

/// Engine side of a cancellation pair
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    /// Token that is never cancelled
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolves once cancelled. Pends forever if the handle is dropped first.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Engine tuning, usually derived from the client configuration
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Transport used to open node channels
    pub transport: TransportMode,

    /// Cap on node attempts per request. `None` means one pass over all candidates.
    pub max_attempts: Option<u32>,

    /// Share of the remaining deadline granted to one attempt, in (0, 1]
    pub attempt_timeout_fraction: f64,

    /// Sleep out a candidate's backoff window instead of trying it immediately
    pub wait_for_unhealthy_nodes: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::Plaintext,
            max_attempts: None,
            attempt_timeout_fraction: 0.5,
            wait_for_unhealthy_nodes: true,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.attempt_timeout_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::InvalidAttemptFraction(fraction));
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::ZeroValue("max_attempts"));
        }
        Ok(())
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Outcome of a single node attempt
enum Attempt {
    Success(Vec<u8>),
    Retryable(String),
    Fatal(PrecheckCode),
}

/// Drives requests to completion across the node registry
pub struct ExecutionEngine {
    registry: Arc<NodeRegistry>,
    channels: Arc<dyn ChannelFactory>,
    clock: Arc<dyn Clock>,
    selector: NodeSelector,
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(
        registry: Arc<NodeRegistry>,
        channels: Arc<dyn ChannelFactory>,
        clock: Arc<dyn Clock>,
        config: ExecutionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry,
            channels,
            clock,
            selector: NodeSelector::new(),
            config,
        })
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Deliver `request` before `deadline`
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        deadline: Instant,
    ) -> ClientResult<ExecutionResponse> {
        self.execute_with_cancel(request, deadline, &CancelToken::never())
            .await
    }

    /// Deliver `request`, stopping early when `cancel` fires
    pub async fn execute_with_cancel(
        &self,
        request: &ExecutionRequest,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> ClientResult<ExecutionResponse> {
        let candidates = self.registry.candidates_for(request.node_ids())?;
        let ranked = self.selector.rank(candidates, self.clock.now());

        let max_attempts = self
            .config
            .max_attempts
            .map_or(ranked.len(), |max| max as usize);

        let mut attempts: u32 = 0;
        let mut nodes_tried: Vec<NodeId> = Vec::new();
        let mut last_error: Option<String> = None;

        for (index, node) in ranked.iter().enumerate() {
            if attempts as usize >= max_attempts {
                break;
            }
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            let mut remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            if self.config.wait_for_unhealthy_nodes {
                let mut backoff = node.remaining_backoff(self.clock.now());
                let mut skip = false;
                // Re-read after every sleep, the health clock and the timer may drift
                while !backoff.is_zero() {
                    if backoff >= remaining {
                        debug!(
                            "Skipping {}: backoff {:?} exceeds remaining deadline {:?}",
                            node.id(),
                            backoff,
                            remaining
                        );
                        last_error.get_or_insert_with(|| format!("{} in backoff", node.id()));
                        skip = true;
                        break;
                    }
                    debug!("Waiting {:?} for {} to leave backoff", backoff, node.id());
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                    }
                    remaining = deadline.saturating_duration_since(Instant::now());
                    backoff = node.remaining_backoff(self.clock.now());
                }
                if skip {
                    continue;
                }
                if remaining.is_zero() {
                    break;
                }
            }

            let payload = request
                .payload_for(node.id())
                .ok_or(TransactionError::NodeNotInTransaction(node.id()))?;

            let last = index + 1 == ranked.len() || attempts as usize + 1 == max_attempts;
            let attempt_timeout = if last {
                remaining
            } else {
                remaining.mul_f64(self.config.attempt_timeout_fraction)
            };

            node.mark_used(self.clock.now());
            attempts += 1;
            nodes_tried.push(node.id());
            debug!(
                "Attempt {} of {} on {} (timeout {:?})",
                attempts,
                request.method(),
                node.id(),
                attempt_timeout
            );

            let outcome = self
                .attempt(node, request.method(), payload.to_vec(), attempt_timeout)
                .await;

            match outcome {
                Attempt::Success(response) => {
                    node.record_success(self.clock.now());
                    if cancel.is_cancelled() {
                        return Err(ClientError::Cancelled);
                    }
                    if attempts > 1 {
                        info!("✅ {} answered after {} attempts", node.id(), attempts);
                    }
                    return Ok(ExecutionResponse {
                        node_id: node.id(),
                        payload: response,
                        attempts,
                    });
                }
                Attempt::Retryable(error) => {
                    node.record_failure(self.clock.now());
                    warn!(
                        "⚠️ {} failed ({}), backing off for {:?}",
                        node.id(),
                        error,
                        node.remaining_backoff(self.clock.now())
                    );
                    last_error = Some(error);
                    if cancel.is_cancelled() {
                        return Err(ClientError::Cancelled);
                    }
                }
                Attempt::Fatal(code) => {
                    if cancel.is_cancelled() {
                        return Err(ClientError::Cancelled);
                    }
                    warn!("{} rejected {}: {:?}", node.id(), request.method(), code);
                    return Err(ClientError::Precheck {
                        node_id: node.id(),
                        code,
                    });
                }
            }
        }

        warn!(
            "Giving up on {} after {} attempts across {} nodes",
            request.method(),
            attempts,
            nodes_tried.len()
        );
        Err(ClientError::DeadlineExceeded {
            attempts,
            nodes_tried,
            last_error,
        })
    }

    async fn attempt(
        &self,
        node: &Node,
        method: MethodId,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Attempt {
        let channel = match self.channels.channel(node, self.config.transport) {
            Ok(channel) => channel,
            Err(e) => return Attempt::Retryable(e.to_string()),
        };

        let bytes = match tokio::time::timeout(timeout, channel.send(method, payload)).await {
            Err(_) => return Attempt::Retryable(TransportError::Timeout.to_string()),
            Ok(Err(e)) => return Attempt::Retryable(e.to_string()),
            Ok(Ok(bytes)) => bytes,
        };

        let response = match NodeResponse::decode(&bytes) {
            Ok(response) => response,
            Err(e) => return Attempt::Retryable(format!("Malformed response: {}", e)),
        };

        match response.status.classify() {
            Classification::Ok => Attempt::Success(response.payload),
            Classification::Retryable => Attempt::Retryable(format!("{:?}", response.status)),
            Classification::Fatal => Attempt::Fatal(response.status),
        }
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    pub async fn execute_transaction(
        &self,
        tx: &mut Transaction,
        deadline: Instant,
    ) -> ClientResult<TransactionResponse> {
        self.execute_transaction_with_cancel(tx, deadline, &CancelToken::never())
            .await
    }

    /// Submit a signed transaction
    ///
    /// A precheck rejection leaves the transaction `Failed`. Running out of
    /// time, being cancelled or a local error returns it to `Signed` so the
    /// same id can be submitted again.
    pub async fn execute_transaction_with_cancel(
        &self,
        tx: &mut Transaction,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> ClientResult<TransactionResponse> {
        let request = ExecutionRequest::from_transaction(tx)?;
        let hashes = tx.hashes()?;
        let transaction_id = tx
            .transaction_id()
            .ok_or(TransactionError::MissingField("transaction_id"))?;
        self.registry.candidates_for(request.node_ids())?;

        tx.begin_execution();
        match self.execute_with_cancel(&request, deadline, cancel).await {
            Ok(response) => {
                let hash = hashes
                    .iter()
                    .find(|(id, _)| *id == response.node_id)
                    .map(|(_, hash)| *hash)
                    .ok_or(TransactionError::NodeNotInTransaction(response.node_id))?;
                tx.complete();
                Ok(TransactionResponse {
                    node_id: response.node_id,
                    transaction_id,
                    hash,
                    attempts: response.attempts,
                })
            }
            Err(e @ (ClientError::DeadlineExceeded { .. } | ClientError::Cancelled)) => {
                tx.abort_execution();
                Err(e)
            }
            Err(e) if e.is_local() => {
                tx.abort_execution();
                Err(e)
            }
            Err(e) => {
                tx.fail();
                Err(e)
            }
        }
    }

    pub async fn execute_all(
        &self,
        list: &mut TransactionList,
        timeout_per_chunk: Duration,
    ) -> ClientResult<Vec<TransactionResponse>> {
        self.execute_all_with_cancel(list, timeout_per_chunk, &CancelToken::never())
            .await
    }

    /// Submit chunks strictly in order. Each chunk gets its own deadline.
    pub async fn execute_all_with_cancel(
        &self,
        list: &mut TransactionList,
        timeout_per_chunk: Duration,
        cancel: &CancelToken,
    ) -> ClientResult<Vec<TransactionResponse>> {
        for (index, tx) in list.iter().enumerate() {
            if let Err(e) = tx.validate_for_execution() {
                return Err(ClientError::ChunkFailed {
                    index,
                    committed: 0,
                    source: Box::new(e.into()),
                });
            }
        }

        let total = list.len();
        let mut responses = Vec::with_capacity(total);
        for (index, tx) in list.iter_mut().enumerate() {
            let deadline = Instant::now() + timeout_per_chunk;
            match self.execute_transaction_with_cancel(tx, deadline, cancel).await {
                Ok(response) => {
                    info!("📦 Chunk {}/{} accepted by {}", index + 1, total, response.node_id);
                    responses.push(response);
                }
                Err(e) => {
                    warn!("Chunk {}/{} failed: {}", index + 1, total, e);
                    return Err(ClientError::ChunkFailed {
                        index,
                        committed: responses.len(),
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(responses)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub async fn execute_query(
        &self,
        query: &Query,
        deadline: Instant,
    ) -> ClientResult<ExecutionResponse> {
        self.execute_query_with_cancel(query, deadline, &CancelToken::never())
            .await
    }

    pub async fn execute_query_with_cancel(
        &self,
        query: &Query,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> ClientResult<ExecutionResponse> {
        let node_ids = if query.node_ids.is_empty() {
            self.registry.node_ids()
        } else {
            query.node_ids.clone()
        };
        let request = ExecutionRequest::from_query(query, node_ids)?;
        self.execute_with_cancel(&request, deadline, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_token() {
        let (handle, token) = CancelHandle::new();
        assert!(!token.is_cancelled());
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        handle.cancel();
        waiter.await.unwrap();
        assert!(token.is_cancelled());
        assert!(handle.token().is_cancelled());
    }

    #[test]
    fn test_never_token() {
        assert!(!CancelToken::never().is_cancelled());
        assert!(!CancelToken::default().is_cancelled());
    }

    #[test]
    fn test_default_config() {
        let config = ExecutionConfig::default();
        assert_eq!(config.max_attempts, None);
        assert!(config.wait_for_unhealthy_nodes);
        assert_eq!(config.transport, TransportMode::Plaintext);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_fraction() {
        for fraction in [0.0, -0.5, 1.5, f64::NAN] {
            let config = ExecutionConfig {
                attempt_timeout_fraction: fraction,
                ..ExecutionConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidAttemptFraction(_))
            ));
        }

        let config = ExecutionConfig {
            max_attempts: Some(0),
            ..ExecutionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroValue("max_attempts")));
    }
}
