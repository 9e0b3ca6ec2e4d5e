// Cryptographic operations for the client
// - Transaction signing capability
// - Signature verification
// - Content hashing (Blake3)

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::types::{Hash, PublicKey, Signature};

/// Domain separator for transaction signatures (must match kratos-core)
pub const DOMAIN_TRANSACTION: &[u8] = b"KRATOS_TRANSACTION_V1:";

/// Create a domain-separated message for signing
#[inline]
pub fn domain_separate(domain: &[u8], message: &[u8]) -> Vec<u8> {
    let mut separated = Vec::with_capacity(domain.len() + message.len());
    separated.extend_from_slice(domain);
    separated.extend_from_slice(message);
    separated
}

/// Blake3 hash of arbitrary bytes
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Anything able to sign transaction body bytes
pub trait TransactionSigner: Send + Sync {
    /// Public identity of the signer
    fn public_key(&self) -> PublicKey;

    /// Sign body bytes
    fn sign(&self, body_bytes: &[u8]) -> Signature;
}

/// Ed25519 key held in memory
pub struct Ed25519Signer {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519Signer {
    /// Generate new random keys
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from existing secret key bytes
    pub fn from_secret(secret: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get public key as hex string
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.to_bytes())
    }
}

impl TransactionSigner for Ed25519Signer {
    fn public_key(&self) -> PublicKey {
        self.verifying_key.to_bytes()
    }

    fn sign(&self, body_bytes: &[u8]) -> Signature {
        let message = domain_separate(DOMAIN_TRANSACTION, body_bytes);
        self.signing_key.sign(&message).to_bytes()
    }
}

/// Signer backed by a callback, e.g. a hardware wallet prompt
pub struct FnSigner<F> {
    public_key: PublicKey,
    sign_fn: F,
}

impl<F> FnSigner<F>
where
    F: Fn(&[u8]) -> Signature + Send + Sync,
{
    pub fn new(public_key: PublicKey, sign_fn: F) -> Self {
        Self { public_key, sign_fn }
    }
}

impl<F> TransactionSigner for FnSigner<F>
where
    F: Fn(&[u8]) -> Signature + Send + Sync,
{
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    fn sign(&self, body_bytes: &[u8]) -> Signature {
        (self.sign_fn)(body_bytes)
    }
}

/// Verify a signature produced by [`Ed25519Signer`]
pub fn verify_signature(public_key: &PublicKey, body_bytes: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let message = domain_separate(DOMAIN_TRANSACTION, body_bytes);
    let signature = ed25519_dalek::Signature::from_bytes(signature);
    verifying_key.verify(&message, &signature).is_ok()
}
