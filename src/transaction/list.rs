// Ordered list of chunk transactions
// Principle: order is significant, chunk N+1 depends on chunk N

use super::{Transaction, TransactionError};
use crate::crypto::TransactionSigner;
use crate::types::{Hash, NodeId, PublicKey, Signature};

/// Frozen transactions produced by [`Transaction::chunk`], in submission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionList {
    transactions: Vec<Transaction>,
}

impl TransactionList {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Sign every chunk with `signer`
    pub fn sign(&mut self, signer: &dyn TransactionSigner) -> Result<&mut Self, TransactionError> {
        self.sign_with(signer.public_key(), |bytes| signer.sign(bytes))
    }

    pub fn sign_with<F>(
        &mut self,
        public_key: PublicKey,
        mut sign_fn: F,
    ) -> Result<&mut Self, TransactionError>
    where
        F: FnMut(&[u8]) -> Signature,
    {
        // Check every chunk first so a collision leaves the list unsigned
        for tx in &self.transactions {
            for payload in tx.payloads() {
                payload.signatures().check_signer(&public_key)?;
            }
        }
        for tx in &mut self.transactions {
            tx.sign_with(public_key, &mut sign_fn)?;
        }
        Ok(self)
    }

    /// Per-chunk payload hashes
    pub fn hashes(&self) -> Result<Vec<Vec<(NodeId, Hash)>>, TransactionError> {
        self.transactions.iter().map(Transaction::hashes).collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Transaction> {
        self.transactions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Transaction> {
        self.transactions.iter_mut()
    }

    pub fn into_inner(self) -> Vec<Transaction> {
        self.transactions
    }
}
