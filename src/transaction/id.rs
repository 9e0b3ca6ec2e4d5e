// Transaction identity
// Principle: one id per logical request, stable across retries and nodes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AccountId, Timestamp};

/// Identity of a logical transaction
///
/// The payer account and the valid start time together make the id unique;
/// nodes use it to deduplicate retried submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    /// Paying account
    pub account_id: AccountId,

    /// Start of the validity window (Unix milliseconds)
    pub valid_start: Timestamp,

    /// Distinguishes ids generated in the same millisecond
    pub nonce: u32,

    /// Set on the id of a transaction executed through a schedule
    pub scheduled: bool,
}

impl TransactionId {
    pub fn new(account_id: AccountId, valid_start: Timestamp) -> Self {
        Self {
            account_id,
            valid_start,
            nonce: 0,
            scheduled: false,
        }
    }

    /// Fresh id with a random nonce
    pub fn generate(account_id: AccountId, now: Timestamp) -> Self {
        Self {
            nonce: rand::random(),
            ..Self::new(account_id, now)
        }
    }

    /// Sub-identity for the chunk at `offset`, valid start shifted by one
    /// millisecond per chunk
    pub fn with_offset(&self, offset: u64) -> Self {
        Self {
            valid_start: self.valid_start.saturating_add(offset),
            ..*self
        }
    }

    pub fn with_scheduled(&self, scheduled: bool) -> Self {
        Self { scheduled, ..*self }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:03}",
            self.account_id,
            self.valid_start / 1_000,
            self.valid_start % 1_000
        )?;
        if self.scheduled {
            write!(f, "?scheduled")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_is_monotonic() {
        let base = TransactionId::new(AccountId([1; 32]), 1_554_158_542_000);
        let a = base.with_offset(1);
        let b = base.with_offset(2);
        assert!(base.valid_start < a.valid_start);
        assert!(a.valid_start < b.valid_start);
        assert_eq!(a.account_id, base.account_id);
        assert_eq!(a.nonce, base.nonce);
    }

    #[test]
    fn test_display() {
        let id = TransactionId::new(AccountId([0xab; 32]), 1_554_158_542_007);
        assert_eq!(id.to_string(), "0xabababababababab@1554158542.007");
        assert!(id.with_scheduled(true).to_string().ends_with("?scheduled"));
    }

    #[test]
    fn test_generate_keeps_account_and_start() {
        let id = TransactionId::generate(AccountId([2; 32]), 5_000);
        assert_eq!(id.account_id, AccountId([2; 32]));
        assert_eq!(id.valid_start, 5_000);
        assert!(!id.scheduled);
    }
}
