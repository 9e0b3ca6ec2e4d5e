// Signature map - signer prefix to signature
// Principle: one entry per signer, duplicates are no-ops, prefix collisions are errors

use serde::{Deserialize, Serialize};

use super::TransactionError;
use crate::types::{key_prefix, sig_serde, PublicKey, PublicKeyPrefix, Signature};

/// One signer's signature over the body bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePair {
    /// Full public key of the signer. The network matches on its prefix.
    pub public_key: PublicKey,

    #[serde(with = "sig_serde")]
    pub signature: Signature,
}

impl SignaturePair {
    pub fn prefix(&self) -> PublicKeyPrefix {
        key_prefix(&self.public_key)
    }
}

/// Result of looking a signer up in the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Absent,
    Present,
    /// Another key shares the prefix
    Collision,
}

/// Signatures attached to one payload, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMap {
    pairs: Vec<SignaturePair>,
}

impl SignatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, public_key: &PublicKey) -> Lookup {
        let prefix = key_prefix(public_key);
        match self.pairs.iter().find(|p| p.prefix() == prefix) {
            None => Lookup::Absent,
            Some(pair) if &pair.public_key == public_key => Lookup::Present,
            Some(_) => Lookup::Collision,
        }
    }

    pub fn contains_signer(&self, public_key: &PublicKey) -> bool {
        self.lookup(public_key) == Lookup::Present
    }

    /// Fail if `public_key` would collide with an existing signer
    pub fn check_signer(&self, public_key: &PublicKey) -> Result<(), TransactionError> {
        match self.lookup(public_key) {
            Lookup::Collision => Err(duplicate_prefix(public_key)),
            _ => Ok(()),
        }
    }

    /// Add a signature. Returns `false` when the signer was already present.
    pub fn insert(
        &mut self,
        public_key: PublicKey,
        signature: Signature,
    ) -> Result<bool, TransactionError> {
        match self.lookup(&public_key) {
            Lookup::Present => Ok(false),
            Lookup::Collision => Err(duplicate_prefix(&public_key)),
            Lookup::Absent => {
                self.pairs.push(SignaturePair {
                    public_key,
                    signature,
                });
                Ok(true)
            }
        }
    }

    /// Check that no two entries share a prefix (maps read back from bytes)
    pub fn validate(&self) -> Result<(), TransactionError> {
        for (i, pair) in self.pairs.iter().enumerate() {
            if self.pairs[..i].iter().any(|p| p.prefix() == pair.prefix()) {
                return Err(duplicate_prefix(&pair.public_key));
            }
        }
        Ok(())
    }

    pub fn get(&self, public_key: &PublicKey) -> Option<&Signature> {
        self.pairs
            .iter()
            .find(|p| &p.public_key == public_key)
            .map(|p| &p.signature)
    }

    pub fn signers(&self) -> impl Iterator<Item = &PublicKey> {
        self.pairs.iter().map(|p| &p.public_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignaturePair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn duplicate_prefix(public_key: &PublicKey) -> TransactionError {
    TransactionError::DuplicateSignerPrefix {
        prefix: hex::encode(key_prefix(public_key)),
    }
}
