//! KratOs Client
//!
//! Facade tying the registry, the execution engine and an optional operator
//! together. The operator pays for and signs the transactions it creates.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::{ClientConfig, ConfigError};
use crate::crypto::TransactionSigner;
use crate::error::ClientResult;
use crate::execution::{
    CancelToken, ChannelFactory, ExecutionEngine, ExecutionResponse, Query, TcpChannelFactory,
    TransactionResponse,
};
use crate::node::registry::NodeStatus;
use crate::node::{NodeRegistry, TransportMode};
use crate::transaction::{
    Transaction, TransactionError, TransactionId, TransactionList, TransactionState,
};
use crate::types::{AccountId, NodeId};

/// Account that pays for and signs outgoing transactions
#[derive(Clone)]
pub struct Operator {
    pub account_id: AccountId,
    pub signer: Arc<dyn TransactionSigner>,
}

/// Client for one KratOs network
pub struct Client {
    config: ClientConfig,
    engine: ExecutionEngine,
    clock: Arc<dyn Clock>,
    operator: Option<Operator>,
}

impl Client {
    /// Client using plaintext TCP channels and the system clock
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        if config.transport == TransportMode::Secure {
            return Err(ConfigError::UnsupportedTransport(
                "secure transport needs a TLS channel factory, see Client::with_channels"
                    .to_string(),
            )
            .into());
        }
        Self::with_channels(config, Arc::new(TcpChannelFactory), Arc::new(SystemClock))
    }

    /// Client with caller-provided channels and clock
    pub fn with_channels(
        config: ClientConfig,
        channels: Arc<dyn ChannelFactory>,
        clock: Arc<dyn Clock>,
    ) -> ClientResult<Self> {
        config.validate()?;
        let registry = Arc::new(NodeRegistry::from_config(&config)?);

        info!(
            "🌐 Client for {} with {} nodes",
            config.network_name,
            registry.len()
        );

        let engine =
            ExecutionEngine::new(registry, channels, clock.clone(), config.execution())?;
        Ok(Self {
            config,
            engine,
            clock,
            operator: None,
        })
    }

    pub fn set_operator(
        &mut self,
        account_id: AccountId,
        signer: Arc<dyn TransactionSigner>,
    ) -> &mut Self {
        self.operator = Some(Operator { account_id, signer });
        self
    }

    pub fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn registry(&self) -> &NodeRegistry {
        self.engine.registry()
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Fill unset fields from the client and freeze
    ///
    /// A missing transaction id is generated for the operator, missing node
    /// ids default to every registered node, fee and validity default to the
    /// configured values.
    pub fn freeze_with(&self, tx: &mut Transaction) -> ClientResult<()> {
        if tx.transaction_id().is_none() {
            let operator = self
                .operator
                .as_ref()
                .ok_or(TransactionError::MissingField("transaction_id"))?;
            tx.set_transaction_id(TransactionId::generate(operator.account_id, self.clock.now()))?;
        }
        if tx.node_ids().is_empty() {
            tx.set_node_ids(self.registry().node_ids())?;
        }
        if tx.max_fee().is_none() {
            tx.set_max_fee(self.config.default_max_fee())?;
        }
        if tx.valid_duration_secs().is_none() {
            tx.set_valid_duration_secs(self.config.transaction_valid_duration_secs)?;
        }
        tx.freeze()?;
        Ok(())
    }

    /// Apply the operator's signature when the operator pays for `tx`
    fn sign_with_operator(&self, tx: &mut Transaction) -> ClientResult<()> {
        let Some(operator) = &self.operator else {
            return Ok(());
        };
        let pays = tx
            .transaction_id()
            .is_some_and(|id| id.account_id == operator.account_id);
        if pays && !tx.is_signed_by(&operator.signer.public_key()) {
            debug!("Signing {:?} with operator key", tx.transaction_id());
            tx.sign(operator.signer.as_ref())?;
        }
        Ok(())
    }

    /// Split a frozen transaction using the configured chunk limits
    pub fn chunk(&self, tx: &Transaction) -> ClientResult<TransactionList> {
        Ok(tx.chunk(self.config.max_chunk_size, self.config.max_chunks)?)
    }

    pub async fn execute_transaction(
        &self,
        tx: &mut Transaction,
    ) -> ClientResult<TransactionResponse> {
        self.execute_transaction_with_cancel(tx, &CancelToken::never())
            .await
    }

    /// Freeze if needed, sign as operator, then submit within the request timeout
    pub async fn execute_transaction_with_cancel(
        &self,
        tx: &mut Transaction,
        cancel: &CancelToken,
    ) -> ClientResult<TransactionResponse> {
        if tx.state() == TransactionState::Draft {
            self.freeze_with(tx)?;
        }
        self.sign_with_operator(tx)?;

        let deadline = Instant::now() + self.config.request_timeout();
        self.engine
            .execute_transaction_with_cancel(tx, deadline, cancel)
            .await
    }

    pub async fn execute_all(
        &self,
        list: &mut TransactionList,
    ) -> ClientResult<Vec<TransactionResponse>> {
        self.execute_all_with_cancel(list, &CancelToken::never())
            .await
    }

    /// Submit chunks in order, each within its own request timeout
    pub async fn execute_all_with_cancel(
        &self,
        list: &mut TransactionList,
        cancel: &CancelToken,
    ) -> ClientResult<Vec<TransactionResponse>> {
        if let Some(operator) = &self.operator {
            let pays = list.iter().all(|tx| {
                tx.transaction_id()
                    .is_some_and(|id| id.account_id == operator.account_id)
            });
            if pays {
                list.sign(operator.signer.as_ref())?;
            }
        }
        self.engine
            .execute_all_with_cancel(list, self.config.request_timeout(), cancel)
            .await
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub async fn execute_query(&self, query: &Query) -> ClientResult<ExecutionResponse> {
        let deadline = Instant::now() + self.config.request_timeout();
        self.engine.execute_query(query, deadline).await
    }

    // =========================================================================
    // DIAGNOSTICS
    // =========================================================================

    /// Health of every node
    pub fn node_health(&self) -> Vec<NodeStatus> {
        self.registry().health_report(self.clock.now())
    }

    /// Clear health state of one node, or all of them
    pub fn reset_node_health(&self, node_id: Option<NodeId>) -> ClientResult<()> {
        match node_id {
            Some(id) => self.registry().reset_health(id),
            None => {
                self.registry().reset_all();
                Ok(())
            }
        }
    }
}
