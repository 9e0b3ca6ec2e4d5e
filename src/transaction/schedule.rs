//! Scheduled transactions
//!
//! A scheduled envelope carries the body bytes and signatures of a frozen
//! transaction verbatim, so the network can run it later once enough
//! signers have authorized it.

use serde::{Deserialize, Serialize};

use super::{SignatureMap, TransactionBody, TransactionError};
use crate::types::{PublicKey, Signature};

/// Signed body wrapped for later execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEnvelope {
    body_bytes: Vec<u8>,
    signatures: SignatureMap,
}

impl ScheduledEnvelope {
    pub fn new(body_bytes: Vec<u8>, signatures: SignatureMap) -> Self {
        Self {
            body_bytes,
            signatures,
        }
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn signatures(&self) -> &SignatureMap {
        &self.signatures
    }

    /// Decode the wrapped body
    pub fn body(&self) -> Result<TransactionBody, TransactionError> {
        Ok(bincode::deserialize(&self.body_bytes)?)
    }

    /// Attach a signature produced out of band. Returns `false` for a signer
    /// that already signed.
    pub fn add_signature(
        &mut self,
        public_key: PublicKey,
        signature: Signature,
    ) -> Result<bool, TransactionError> {
        self.signatures.insert(public_key, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_signature() {
        let mut env = ScheduledEnvelope::new(vec![1, 2, 3], SignatureMap::new());
        assert!(env.add_signature([1; 32], [9; 64]).unwrap());
        assert!(!env.add_signature([1; 32], [8; 64]).unwrap());
        assert_eq!(env.signatures().len(), 1);
        assert_eq!(env.body_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_body_decode_error() {
        let env = ScheduledEnvelope::new(vec![0xff], SignatureMap::new());
        assert!(matches!(env.body(), Err(TransactionError::Serialization(_))));
    }
}
