// Transaction state machine
// Principle: body fields only change in Draft, signatures only grow,
// every candidate node gets its own payload over the same body

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ChunkInfo, Operation, ScheduledEnvelope, SignatureMap, TransactionError, TransactionId,
    TransactionList, MAX_MEMO_LEN,
};
use crate::crypto::{self, TransactionSigner};
use crate::types::{key_prefix, Balance, Hash, NodeId, PublicKey, Signature};

/// Default maximum fee (2 KRAT in base units)
pub const DEFAULT_MAX_FEE: Balance = 200_000_000;

/// Default validity window
pub const DEFAULT_VALID_DURATION_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// Mutable, no payloads built
    Draft,
    /// Body fixed, unsigned payloads built
    Frozen,
    /// At least one signing pass applied
    Signed,
    /// Handed to the execution engine
    Executing,
    Completed,
    Failed,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Completed | TransactionState::Failed)
    }
}

/// Body signed by every signer, one per target node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub transaction_id: TransactionId,

    /// Node this copy of the body is addressed to
    pub node_id: NodeId,

    pub max_fee: Balance,
    pub valid_duration_secs: u64,
    pub memo: String,
    pub operation: Operation,
}

impl TransactionBody {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        Ok(bincode::serialize(self)?)
    }
}

/// Frame sent to a node: body bytes plus the signatures over them
#[derive(Serialize)]
struct SignedPayload<'a> {
    body_bytes: &'a [u8],
    signatures: &'a SignatureMap,
}

/// Node-addressed payload of a frozen transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePayload {
    node_id: NodeId,
    body_bytes: Vec<u8>,
    signatures: SignatureMap,
}

impl NodePayload {
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn signatures(&self) -> &SignatureMap {
        &self.signatures
    }

    /// Serialized signed payload as transmitted
    pub fn wire_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let payload = SignedPayload {
            body_bytes: &self.body_bytes,
            signatures: &self.signatures,
        };
        Ok(bincode::serialize(&payload)?)
    }

    /// Blake3 hash of the wire bytes
    pub fn hash(&self) -> Result<Hash, TransactionError> {
        Ok(crypto::hash(&self.wire_bytes()?))
    }
}

/// A ledger transaction moving through Draft, Frozen and Signed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    state: TransactionState,
    transaction_id: Option<TransactionId>,
    node_ids: Vec<NodeId>,
    max_fee: Option<Balance>,
    valid_duration_secs: Option<u64>,
    memo: String,
    operation: Operation,
    payloads: Vec<NodePayload>,
}

impl Transaction {
    /// New draft for `operation`
    pub fn new(operation: Operation) -> Self {
        Self {
            state: TransactionState::Draft,
            transaction_id: None,
            node_ids: Vec::new(),
            max_fee: None,
            valid_duration_secs: None,
            memo: String::new(),
            operation,
            payloads: Vec::new(),
        }
    }

    // =========================================================================
    // DRAFT SETTERS
    // =========================================================================

    fn require_draft(&self) -> Result<(), TransactionError> {
        match self.state {
            TransactionState::Draft => Ok(()),
            _ => Err(TransactionError::AlreadyFrozen),
        }
    }

    pub fn set_transaction_id(&mut self, id: TransactionId) -> Result<&mut Self, TransactionError> {
        self.require_draft()?;
        self.transaction_id = Some(id);
        Ok(self)
    }

    pub fn set_node_ids(&mut self, node_ids: Vec<NodeId>) -> Result<&mut Self, TransactionError> {
        self.require_draft()?;
        self.node_ids = node_ids;
        Ok(self)
    }

    pub fn set_max_fee(&mut self, max_fee: Balance) -> Result<&mut Self, TransactionError> {
        self.require_draft()?;
        self.max_fee = Some(max_fee);
        Ok(self)
    }

    pub fn set_valid_duration_secs(&mut self, secs: u64) -> Result<&mut Self, TransactionError> {
        self.require_draft()?;
        if secs == 0 {
            return Err(TransactionError::InvalidField {
                field: "valid_duration_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.valid_duration_secs = Some(secs);
        Ok(self)
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self, TransactionError> {
        self.require_draft()?;
        let memo = memo.into();
        if memo.len() > MAX_MEMO_LEN {
            return Err(TransactionError::MemoTooLong {
                len: memo.len(),
                max: MAX_MEMO_LEN,
            });
        }
        self.memo = memo;
        Ok(self)
    }

    pub fn set_operation(&mut self, operation: Operation) -> Result<&mut Self, TransactionError> {
        self.require_draft()?;
        self.operation = operation;
        Ok(self)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    pub fn max_fee(&self) -> Option<Balance> {
        self.max_fee
    }

    pub fn valid_duration_secs(&self) -> Option<u64> {
        self.valid_duration_secs
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn payloads(&self) -> &[NodePayload] {
        &self.payloads
    }

    pub fn payload_for(&self, node_id: NodeId) -> Option<&NodePayload> {
        self.payloads.iter().find(|p| p.node_id == node_id)
    }

    pub fn is_frozen(&self) -> bool {
        self.state != TransactionState::Draft
    }

    // =========================================================================
    // FREEZE
    // =========================================================================

    /// Freeze for the given candidate nodes
    pub fn freeze_with(&mut self, node_ids: &[NodeId]) -> Result<&mut Self, TransactionError> {
        self.set_node_ids(node_ids.to_vec())?;
        self.freeze()
    }

    /// Fix the body and build one unsigned payload per candidate node
    pub fn freeze(&mut self) -> Result<&mut Self, TransactionError> {
        self.require_draft()?;

        if self.node_ids.is_empty() {
            return Err(TransactionError::EmptyNodeList);
        }
        for (i, id) in self.node_ids.iter().enumerate() {
            if self.node_ids[..i].contains(id) {
                return Err(TransactionError::InvalidField {
                    field: "node_ids",
                    reason: format!("{} listed twice", id),
                });
            }
        }
        let transaction_id = self
            .transaction_id
            .ok_or(TransactionError::MissingField("transaction_id"))?;
        self.operation.validate()?;

        let max_fee = *self.max_fee.get_or_insert(DEFAULT_MAX_FEE);
        let valid_duration_secs = *self
            .valid_duration_secs
            .get_or_insert(DEFAULT_VALID_DURATION_SECS);

        let mut payloads = Vec::with_capacity(self.node_ids.len());
        for &node_id in &self.node_ids {
            let body = TransactionBody {
                transaction_id,
                node_id,
                max_fee,
                valid_duration_secs,
                memo: self.memo.clone(),
                operation: self.operation.clone(),
            };
            payloads.push(NodePayload {
                node_id,
                body_bytes: body.to_bytes()?,
                signatures: SignatureMap::new(),
            });
        }

        debug!(
            "Froze {} {} for {} nodes",
            self.operation.name(),
            transaction_id,
            payloads.len()
        );
        self.payloads = payloads;
        self.state = TransactionState::Frozen;
        Ok(self)
    }

    // =========================================================================
    // SIGN
    // =========================================================================

    fn require_signable(&self, operation: &'static str) -> Result<(), TransactionError> {
        match self.state {
            TransactionState::Draft => Err(TransactionError::NotFrozen),
            TransactionState::Frozen | TransactionState::Signed => Ok(()),
            state => Err(TransactionError::InvalidState { operation, state }),
        }
    }

    /// Sign every payload with `signer`
    pub fn sign(&mut self, signer: &dyn TransactionSigner) -> Result<&mut Self, TransactionError> {
        self.sign_with(signer.public_key(), |bytes| signer.sign(bytes))
    }

    /// Sign every payload with a caller-supplied signing function
    ///
    /// Payloads already carrying `public_key` are left untouched. A key whose
    /// prefix collides with a different signer is rejected before any payload
    /// is modified.
    pub fn sign_with<F>(
        &mut self,
        public_key: PublicKey,
        mut sign_fn: F,
    ) -> Result<&mut Self, TransactionError>
    where
        F: FnMut(&[u8]) -> Signature,
    {
        self.require_signable("sign")?;

        for payload in &self.payloads {
            payload.signatures.check_signer(&public_key)?;
        }

        let mut added = 0;
        for payload in &mut self.payloads {
            if payload.signatures.contains_signer(&public_key) {
                continue;
            }
            let signature = sign_fn(&payload.body_bytes);
            if payload.signatures.insert(public_key, signature)? {
                added += 1;
            }
        }

        debug!(
            "Signer {} added {} signatures",
            hex::encode(key_prefix(&public_key)),
            added
        );
        self.state = TransactionState::Signed;
        Ok(self)
    }

    /// Whether every payload carries a signature from `public_key`
    pub fn is_signed_by(&self, public_key: &PublicKey) -> bool {
        !self.payloads.is_empty()
            && self
                .payloads
                .iter()
                .all(|p| p.signatures.contains_signer(public_key))
    }

    // =========================================================================
    // HASH
    // =========================================================================

    fn require_signed(&self) -> Result<(), TransactionError> {
        match self.state {
            TransactionState::Draft | TransactionState::Frozen => Err(TransactionError::NotSigned),
            _ if self.payloads.iter().any(|p| p.signatures.is_empty()) => {
                Err(TransactionError::NotSigned)
            }
            _ => Ok(()),
        }
    }

    /// Hash of the signed payload addressed to `node_id`
    pub fn hash(&self, node_id: NodeId) -> Result<Hash, TransactionError> {
        self.require_signed()?;
        self.payload_for(node_id)
            .ok_or(TransactionError::NodeNotInTransaction(node_id))?
            .hash()
    }

    /// Hashes of every signed payload, in node order
    pub fn hashes(&self) -> Result<Vec<(NodeId, Hash)>, TransactionError> {
        self.require_signed()?;
        self.payloads
            .iter()
            .map(|p| Ok((p.node_id, p.hash()?)))
            .collect()
    }

    // =========================================================================
    // CHUNK
    // =========================================================================

    /// Split chunkable content into an ordered list of frozen transactions
    ///
    /// Chunk `i` (0-based) is identified by the base id offset by `i`
    /// milliseconds and carries [`ChunkInfo`] pointing back at the base id.
    /// Non-chunkable operations yield a single-element list.
    pub fn chunk(
        &self,
        max_chunk_size: usize,
        max_chunks: usize,
    ) -> Result<TransactionList, TransactionError> {
        match self.state {
            TransactionState::Draft => return Err(TransactionError::NotFrozen),
            TransactionState::Frozen => {}
            state => {
                return Err(TransactionError::InvalidState {
                    operation: "chunk",
                    state,
                })
            }
        }
        if max_chunk_size == 0 {
            return Err(TransactionError::InvalidChunkSize);
        }

        let Some(content) = self.operation.chunk_content() else {
            return Ok(TransactionList::new(vec![self.clone()]));
        };

        let required = content.len().div_ceil(max_chunk_size).max(1);
        if required > max_chunks {
            return Err(TransactionError::TooManyChunks {
                required,
                max: max_chunks,
            });
        }

        let base_id = self
            .transaction_id
            .ok_or(TransactionError::MissingField("transaction_id"))?;
        let total = required as u32;

        let mut chunks = Vec::with_capacity(required);
        for index in 0..required {
            let start = index * max_chunk_size;
            let end = (start + max_chunk_size).min(content.len());
            let info = ChunkInfo {
                initial_transaction_id: base_id,
                number: index as u32 + 1,
                total,
            };

            let mut chunk = Transaction {
                state: TransactionState::Draft,
                transaction_id: Some(base_id.with_offset(index as u64)),
                node_ids: self.node_ids.clone(),
                max_fee: self.max_fee,
                valid_duration_secs: self.valid_duration_secs,
                memo: self.memo.clone(),
                operation: self.operation.with_chunk(content[start..end].to_vec(), info),
                payloads: Vec::new(),
            };
            chunk.freeze()?;
            chunks.push(chunk);
        }

        debug!("Split {} into {} chunks", base_id, required);
        Ok(TransactionList::new(chunks))
    }

    // =========================================================================
    // SCHEDULE
    // =========================================================================

    /// Wrap the signed body and signatures for deferred execution
    pub fn wrap_as_scheduled(&self) -> Result<ScheduledEnvelope, TransactionError> {
        if !self.operation.is_schedulable() {
            return Err(TransactionError::UnsupportedForScheduling(self.operation.name()));
        }
        self.require_signed()?;

        let source = self.payloads.first().ok_or(TransactionError::NotSigned)?;
        Ok(ScheduledEnvelope::new(
            source.body_bytes.clone(),
            source.signatures.clone(),
        ))
    }

    /// Draft `ScheduleCreate` carrying this transaction, addressed to the same nodes
    pub fn schedule(&self) -> Result<Transaction, TransactionError> {
        let scheduled = self.wrap_as_scheduled()?;
        let mut draft = Transaction::new(Operation::ScheduleCreate {
            scheduled,
            payer_account_id: None,
            admin_key: None,
            memo: String::new(),
        });
        draft.node_ids = self.node_ids.clone();
        Ok(draft)
    }

    // =========================================================================
    // BYTES
    // =========================================================================

    /// Serialize a frozen or signed transaction
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        if self.state == TransactionState::Draft {
            return Err(TransactionError::NotFrozen);
        }
        Ok(bincode::serialize(self)?)
    }

    /// Decode bytes produced by [`Transaction::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let tx: Transaction = bincode::deserialize(bytes)?;
        if tx.state == TransactionState::Draft {
            return Err(TransactionError::NotFrozen);
        }
        tx.check_payloads()?;
        Ok(tx)
    }

    fn check_payloads(&self) -> Result<(), TransactionError> {
        if self.payloads.len() != self.node_ids.len() {
            return Err(TransactionError::PayloadMismatch {
                payloads: self.payloads.len(),
                nodes: self.node_ids.len(),
            });
        }
        for (payload, node_id) in self.payloads.iter().zip(&self.node_ids) {
            if payload.node_id != *node_id {
                return Err(TransactionError::NodeNotInTransaction(payload.node_id));
            }
            payload.signatures.validate()?;
        }
        Ok(())
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Local checks run before anything is sent
    pub fn validate_for_execution(&self) -> Result<(), TransactionError> {
        match self.state {
            TransactionState::Draft => return Err(TransactionError::NotFrozen),
            TransactionState::Frozen => return Err(TransactionError::NotSigned),
            TransactionState::Signed => {}
            state => {
                return Err(TransactionError::InvalidState {
                    operation: "execute",
                    state,
                })
            }
        }
        self.check_payloads()?;
        self.require_signed()
    }

    pub(crate) fn begin_execution(&mut self) {
        self.state = TransactionState::Executing;
    }

    pub(crate) fn complete(&mut self) {
        self.state = TransactionState::Completed;
    }

    pub(crate) fn fail(&mut self) {
        self.state = TransactionState::Failed;
    }

    /// Back to `Signed` after an attempt sequence without a terminal answer
    pub(crate) fn abort_execution(&mut self) {
        if self.state == TransactionState::Executing {
            self.state = TransactionState::Signed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{verify_signature, Ed25519Signer};
    use crate::types::{AccountId, FileId, TopicId};

    fn node_ids() -> Vec<NodeId> {
        vec![NodeId(3), NodeId(4), NodeId(5)]
    }

    fn transfer() -> Transaction {
        let mut tx = Transaction::new(Operation::Transfer {
            to: Some(AccountId([2; 32])),
            amount: 1_000,
        });
        tx.set_transaction_id(TransactionId::new(AccountId([1; 32]), 1_000_000))
            .unwrap();
        tx
    }

    #[test]
    fn test_freeze_builds_payload_per_node() {
        let mut tx = transfer();
        tx.freeze_with(&node_ids()).unwrap();

        assert_eq!(tx.state(), TransactionState::Frozen);
        assert_eq!(tx.payloads().len(), 3);

        let bodies: Vec<TransactionBody> = tx
            .payloads()
            .iter()
            .map(|p| bincode::deserialize(p.body_bytes()).unwrap())
            .collect();
        for (body, id) in bodies.iter().zip(node_ids()) {
            assert_eq!(body.node_id, id);
            assert_eq!(body.transaction_id, bodies[0].transaction_id);
            assert_eq!(body.operation, bodies[0].operation);
            assert_eq!(body.max_fee, DEFAULT_MAX_FEE);
        }
    }

    #[test]
    fn test_freeze_twice_fails() {
        let mut tx = transfer();
        tx.freeze_with(&node_ids()).unwrap();
        assert_eq!(tx.freeze().unwrap_err(), TransactionError::AlreadyFrozen);
        assert_eq!(tx.set_memo("late").unwrap_err(), TransactionError::AlreadyFrozen);
    }

    #[test]
    fn test_freeze_preconditions() {
        let mut tx = transfer();
        assert_eq!(tx.freeze_with(&[]).unwrap_err(), TransactionError::EmptyNodeList);

        let mut tx = Transaction::new(Operation::FileDelete { file_id: Some(FileId(1)) });
        assert_eq!(
            tx.freeze_with(&node_ids()).unwrap_err(),
            TransactionError::MissingField("transaction_id")
        );

        let mut tx = Transaction::new(Operation::FileDelete { file_id: None });
        tx.set_transaction_id(TransactionId::new(AccountId([1; 32]), 1)).unwrap();
        assert_eq!(
            tx.freeze_with(&node_ids()).unwrap_err(),
            TransactionError::MissingField("file_id")
        );
        assert_eq!(tx.state(), TransactionState::Draft);
    }

    #[test]
    fn test_memo_limit() {
        let mut tx = transfer();
        assert!(tx.set_memo("a".repeat(MAX_MEMO_LEN)).is_ok());
        assert!(matches!(
            tx.set_memo("a".repeat(MAX_MEMO_LEN + 1)),
            Err(TransactionError::MemoTooLong { .. })
        ));
    }

    #[test]
    fn test_sign_requires_frozen() {
        let mut tx = transfer();
        let signer = Ed25519Signer::generate();
        assert_eq!(tx.sign(&signer).unwrap_err(), TransactionError::NotFrozen);
    }

    #[test]
    fn test_sign_same_signer_twice_is_noop() {
        let mut tx = transfer();
        tx.freeze_with(&node_ids()).unwrap();
        let signer = Ed25519Signer::generate();

        tx.sign(&signer).unwrap();
        tx.sign(&signer).unwrap();

        assert_eq!(tx.state(), TransactionState::Signed);
        for payload in tx.payloads() {
            assert_eq!(payload.signatures().len(), 1);
            let sig = payload.signatures().get(&signer.public_key()).unwrap();
            assert!(verify_signature(&signer.public_key(), payload.body_bytes(), sig));
        }
        assert!(tx.is_signed_by(&signer.public_key()));
    }

    #[test]
    fn test_sign_collision_leaves_payloads_untouched() {
        let mut tx = transfer();
        tx.freeze_with(&node_ids()).unwrap();

        let key = [7u8; 32];
        let mut colliding = key;
        colliding[31] = 0;
        tx.sign_with(key, |_| [1; 64]).unwrap();

        let mut calls = 0;
        let err = tx
            .sign_with(colliding, |_| {
                calls += 1;
                [2; 64]
            })
            .unwrap_err();
        assert!(matches!(err, TransactionError::DuplicateSignerPrefix { .. }));
        assert_eq!(calls, 0);
        assert!(tx.payloads().iter().all(|p| p.signatures().len() == 1));
    }

    #[test]
    fn test_multiple_signers_in_insertion_order() {
        let mut tx = transfer();
        tx.freeze_with(&node_ids()).unwrap();
        let a = Ed25519Signer::from_secret([1; 32]);
        let b = Ed25519Signer::from_secret([2; 32]);
        tx.sign(&a).unwrap().sign(&b).unwrap().sign(&a).unwrap();

        let signers: Vec<_> = tx.payloads()[0].signatures().signers().copied().collect();
        assert_eq!(signers, vec![a.public_key(), b.public_key()]);
    }

    #[test]
    fn test_signing_order_does_not_change_signature_set() {
        let a = Ed25519Signer::from_secret([1; 32]);
        let b = Ed25519Signer::from_secret([2; 32]);

        let mut ab = transfer();
        ab.freeze_with(&node_ids()).unwrap();
        let mut ba = ab.clone();
        ab.sign(&a).unwrap().sign(&b).unwrap();
        ba.sign(&b).unwrap().sign(&a).unwrap();

        for (x, y) in ab.payloads().iter().zip(ba.payloads()) {
            assert_eq!(x.body_bytes(), y.body_bytes());

            let mut x_signers: Vec<_> = x.signatures().signers().copied().collect();
            let mut y_signers: Vec<_> = y.signatures().signers().copied().collect();
            x_signers.sort();
            y_signers.sort();
            assert_eq!(x_signers, y_signers);

            for key in &x_signers {
                assert_eq!(x.signatures().get(key), y.signatures().get(key));
            }
        }
    }

    #[test]
    fn test_hash_requires_signed() {
        let mut tx = transfer();
        tx.freeze_with(&node_ids()).unwrap();
        assert_eq!(tx.hash(NodeId(3)).unwrap_err(), TransactionError::NotSigned);

        tx.sign(&Ed25519Signer::generate()).unwrap();
        let h3 = tx.hash(NodeId(3)).unwrap();
        let h4 = tx.hash(NodeId(4)).unwrap();
        assert_ne!(h3, h4);
        assert_eq!(tx.hashes().unwrap().len(), 3);
        assert_eq!(
            tx.hash(NodeId(9)).unwrap_err(),
            TransactionError::NodeNotInTransaction(NodeId(9))
        );
    }

    #[test]
    fn test_chunk_splits_content_in_order() {
        let mut tx = Transaction::new(Operation::TopicMessageSubmit {
            topic_id: Some(TopicId(1)),
            message: (0..25u8).collect(),
            chunk_info: None,
        });
        let base = TransactionId::new(AccountId([1; 32]), 10_000);
        tx.set_transaction_id(base).unwrap();
        tx.freeze_with(&node_ids()).unwrap();

        let list = tx.chunk(10, 20).unwrap();
        assert_eq!(list.len(), 3);

        let mut rebuilt = Vec::new();
        for (i, chunk) in list.iter().enumerate() {
            assert_eq!(chunk.state(), TransactionState::Frozen);
            assert_eq!(chunk.transaction_id(), Some(base.with_offset(i as u64)));
            assert_eq!(chunk.payloads().len(), 3);
            match chunk.operation() {
                Operation::TopicMessageSubmit { message, chunk_info, .. } => {
                    let info = chunk_info.unwrap();
                    assert_eq!(info.number, i as u32 + 1);
                    assert_eq!(info.total, 3);
                    assert_eq!(info.initial_transaction_id, base);
                    rebuilt.extend_from_slice(message);
                }
                other => panic!("unexpected operation {:?}", other),
            }
        }
        assert_eq!(rebuilt, (0..25u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_chunk_limits() {
        let mut tx = Transaction::new(Operation::FileAppend {
            file_id: Some(FileId(5)),
            contents: vec![0; 100],
        });
        tx.set_transaction_id(TransactionId::new(AccountId([1; 32]), 1)).unwrap();
        tx.freeze_with(&node_ids()).unwrap();

        assert_eq!(tx.chunk(0, 20).unwrap_err(), TransactionError::InvalidChunkSize);
        assert_eq!(
            tx.chunk(10, 5).unwrap_err(),
            TransactionError::TooManyChunks { required: 10, max: 5 }
        );
        assert_eq!(tx.chunk(1024, 20).unwrap().len(), 1);
    }

    #[test]
    fn test_chunk_non_chunkable_is_single() {
        let mut tx = transfer();
        tx.freeze_with(&node_ids()).unwrap();
        let list = tx.chunk(1, 1).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap(), &tx);
    }

    #[test]
    fn test_wrap_as_scheduled_carries_body_and_signatures() {
        let mut tx = transfer();
        tx.freeze_with(&node_ids()).unwrap();
        assert_eq!(tx.wrap_as_scheduled().unwrap_err(), TransactionError::NotSigned);

        let signer = Ed25519Signer::generate();
        tx.sign(&signer).unwrap();
        let env = tx.wrap_as_scheduled().unwrap();
        assert_eq!(env.body_bytes(), tx.payloads()[0].body_bytes());
        assert_eq!(env.signatures(), tx.payloads()[0].signatures());
        assert_eq!(env.body().unwrap().operation, *tx.operation());

        let schedule = tx.schedule().unwrap();
        assert_eq!(schedule.state(), TransactionState::Draft);
        assert_eq!(schedule.node_ids(), tx.node_ids());
        assert!(matches!(schedule.operation(), Operation::ScheduleCreate { .. }));
    }

    #[test]
    fn test_non_schedulable_rejected() {
        let mut tx = Transaction::new(Operation::EthereumCall {
            ethereum_data: vec![0xf8],
            call_data_file_id: None,
            max_gas_allowance: 0,
        });
        tx.set_transaction_id(TransactionId::new(AccountId([1; 32]), 1)).unwrap();
        tx.freeze_with(&node_ids()).unwrap();
        tx.sign(&Ed25519Signer::generate()).unwrap();
        assert_eq!(
            tx.wrap_as_scheduled().unwrap_err(),
            TransactionError::UnsupportedForScheduling("EthereumCall")
        );

        let mut inner = transfer();
        inner.freeze_with(&node_ids()).unwrap();
        inner.sign(&Ed25519Signer::generate()).unwrap();

        let mut nested = inner.schedule().unwrap();
        nested
            .set_transaction_id(TransactionId::new(AccountId([1; 32]), 2))
            .unwrap();
        nested.freeze().unwrap();
        nested.sign(&Ed25519Signer::generate()).unwrap();
        assert_eq!(
            nested.wrap_as_scheduled().unwrap_err(),
            TransactionError::UnsupportedForScheduling("ScheduleCreate")
        );
    }

    #[test]
    fn test_bytes_round_trip_keeps_signatures() {
        let mut tx = transfer();
        tx.set_memo("rent").unwrap();
        tx.freeze_with(&node_ids()).unwrap();
        tx.sign(&Ed25519Signer::generate()).unwrap();

        let decoded = Transaction::from_bytes(&tx.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hashes().unwrap(), tx.hashes().unwrap());

        assert_eq!(transfer().to_bytes().unwrap_err(), TransactionError::NotFrozen);
    }

    #[test]
    fn test_validate_for_execution() {
        let mut tx = transfer();
        assert_eq!(tx.validate_for_execution().unwrap_err(), TransactionError::NotFrozen);
        tx.freeze_with(&node_ids()).unwrap();
        assert_eq!(tx.validate_for_execution().unwrap_err(), TransactionError::NotSigned);
        tx.sign(&Ed25519Signer::generate()).unwrap();
        assert!(tx.validate_for_execution().is_ok());

        tx.complete();
        assert!(matches!(
            tx.validate_for_execution(),
            Err(TransactionError::InvalidState { operation: "execute", .. })
        ));
    }
}
