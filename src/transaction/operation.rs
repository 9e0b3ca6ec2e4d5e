// Operation catalogue - what a transaction does
// Principle: closed set of kinds, each knows its method, its required fields,
// whether it can be scheduled and whether its content can be chunked

use serde::{Deserialize, Serialize};

use super::{ScheduledEnvelope, TransactionError, TransactionId};
use crate::execution::MethodId;
use crate::types::{AccountId, Balance, ContractId, FileId, PublicKey, TopicId};

/// Position of one chunk inside a chunked message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// Id of the first chunk, shared by every chunk of the message
    pub initial_transaction_id: TransactionId,

    /// 1-based chunk number
    pub number: u32,

    pub total: u32,
}

/// Ledger operation carried by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Transfer to another account
    Transfer {
        to: Option<AccountId>,
        amount: Balance,
    },

    /// Create an account controlled by `key`
    AccountCreate {
        key: Option<PublicKey>,
        initial_balance: Balance,
    },

    /// Append bytes to a file
    FileAppend {
        file_id: Option<FileId>,
        contents: Vec<u8>,
    },

    FileDelete {
        file_id: Option<FileId>,
    },

    /// Restore a deleted file or contract (exactly one target)
    SystemUndelete {
        file_id: Option<FileId>,
        contract_id: Option<ContractId>,
    },

    /// Submit a message to a consensus topic
    TopicMessageSubmit {
        topic_id: Option<TopicId>,
        message: Vec<u8>,
        chunk_info: Option<ChunkInfo>,
    },

    /// Raw RLP encoded Ethereum transaction
    EthereumCall {
        ethereum_data: Vec<u8>,
        call_data_file_id: Option<FileId>,
        max_gas_allowance: Balance,
    },

    /// Defer execution of a signed transaction until it is fully authorized
    ScheduleCreate {
        scheduled: ScheduledEnvelope,
        payer_account_id: Option<AccountId>,
        admin_key: Option<PublicKey>,
        memo: String,
    },
}

impl Operation {
    /// Kind name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Transfer { .. } => "Transfer",
            Operation::AccountCreate { .. } => "AccountCreate",
            Operation::FileAppend { .. } => "FileAppend",
            Operation::FileDelete { .. } => "FileDelete",
            Operation::SystemUndelete { .. } => "SystemUndelete",
            Operation::TopicMessageSubmit { .. } => "TopicMessageSubmit",
            Operation::EthereumCall { .. } => "EthereumCall",
            Operation::ScheduleCreate { .. } => "ScheduleCreate",
        }
    }

    /// RPC method used to submit this operation
    pub fn method(&self) -> MethodId {
        match self {
            Operation::Transfer { .. } => MethodId::CRYPTO_TRANSFER,
            Operation::AccountCreate { .. } => MethodId::CREATE_ACCOUNT,
            Operation::FileAppend { .. } => MethodId::APPEND_CONTENT,
            Operation::FileDelete { .. } => MethodId::DELETE_FILE,
            Operation::SystemUndelete { .. } => MethodId::SYSTEM_UNDELETE,
            Operation::TopicMessageSubmit { .. } => MethodId::SUBMIT_MESSAGE,
            Operation::EthereumCall { .. } => MethodId::CALL_ETHEREUM,
            Operation::ScheduleCreate { .. } => MethodId::CREATE_SCHEDULE,
        }
    }

    /// Whether the network accepts this kind inside a schedule
    pub fn is_schedulable(&self) -> bool {
        !matches!(
            self,
            Operation::EthereumCall { .. } | Operation::ScheduleCreate { .. }
        )
    }

    /// Check required fields before freezing
    pub fn validate(&self) -> Result<(), TransactionError> {
        match self {
            Operation::Transfer { to, amount } => {
                to.ok_or(TransactionError::MissingField("to"))?;
                if *amount == 0 {
                    return Err(TransactionError::InvalidField {
                        field: "amount",
                        reason: "must be greater than zero".to_string(),
                    });
                }
            }
            Operation::AccountCreate { key, .. } => {
                key.ok_or(TransactionError::MissingField("key"))?;
            }
            Operation::FileAppend { file_id, .. } | Operation::FileDelete { file_id } => {
                file_id.ok_or(TransactionError::MissingField("file_id"))?;
            }
            Operation::SystemUndelete { file_id, contract_id } => match (file_id, contract_id) {
                (None, None) => {
                    return Err(TransactionError::MissingField("file_id or contract_id"))
                }
                (Some(_), Some(_)) => {
                    return Err(TransactionError::InvalidField {
                        field: "file_id",
                        reason: "file_id and contract_id are mutually exclusive".to_string(),
                    })
                }
                _ => {}
            },
            Operation::TopicMessageSubmit { topic_id, message, .. } => {
                topic_id.ok_or(TransactionError::MissingField("topic_id"))?;
                if message.is_empty() {
                    return Err(TransactionError::MissingField("message"));
                }
            }
            Operation::EthereumCall { ethereum_data, .. } => {
                if ethereum_data.is_empty() {
                    return Err(TransactionError::MissingField("ethereum_data"));
                }
            }
            Operation::ScheduleCreate { scheduled, .. } => {
                if scheduled.body_bytes().is_empty() {
                    return Err(TransactionError::MissingField("scheduled"));
                }
                scheduled.signatures().validate()?;
            }
        }
        Ok(())
    }

    /// Content that may be split across chunks
    pub fn chunk_content(&self) -> Option<&[u8]> {
        match self {
            Operation::FileAppend { contents, .. } => Some(contents),
            Operation::TopicMessageSubmit { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Copy of this operation carrying one chunk of its content
    pub fn with_chunk(&self, content: Vec<u8>, info: ChunkInfo) -> Operation {
        match self {
            Operation::FileAppend { file_id, .. } => Operation::FileAppend {
                file_id: *file_id,
                contents: content,
            },
            Operation::TopicMessageSubmit { topic_id, .. } => Operation::TopicMessageSubmit {
                topic_id: *topic_id,
                message: content,
                chunk_info: Some(info),
            },
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        let op = Operation::Transfer { to: None, amount: 10 };
        assert_eq!(op.validate(), Err(TransactionError::MissingField("to")));

        let op = Operation::FileDelete { file_id: None };
        assert_eq!(op.validate(), Err(TransactionError::MissingField("file_id")));

        let op = Operation::FileDelete { file_id: Some(FileId(444)) };
        assert!(op.validate().is_ok());
    }

    #[test]
    fn test_system_undelete_single_target() {
        let both = Operation::SystemUndelete {
            file_id: Some(FileId(444)),
            contract_id: Some(ContractId(444)),
        };
        assert!(matches!(both.validate(), Err(TransactionError::InvalidField { .. })));

        let contract = Operation::SystemUndelete {
            file_id: None,
            contract_id: Some(ContractId(444)),
        };
        assert!(contract.validate().is_ok());
    }

    #[test]
    fn test_schedulable_kinds() {
        let eth = Operation::EthereumCall {
            ethereum_data: vec![1],
            call_data_file_id: None,
            max_gas_allowance: 0,
        };
        assert!(!eth.is_schedulable());
        assert!(Operation::FileDelete { file_id: Some(FileId(1)) }.is_schedulable());
    }

    #[test]
    fn test_chunk_content() {
        let op = Operation::FileAppend {
            file_id: Some(FileId(7)),
            contents: vec![1, 2, 3],
        };
        assert_eq!(op.chunk_content(), Some(&[1u8, 2, 3][..]));
        assert!(Operation::FileDelete { file_id: None }.chunk_content().is_none());
    }

    #[test]
    fn test_with_chunk_sets_chunk_info() {
        let initial = TransactionId::new(AccountId([1; 32]), 1_000);
        let op = Operation::TopicMessageSubmit {
            topic_id: Some(TopicId(9)),
            message: vec![0; 10],
            chunk_info: None,
        };
        let info = ChunkInfo {
            initial_transaction_id: initial,
            number: 2,
            total: 3,
        };
        match op.with_chunk(vec![5, 5], info) {
            Operation::TopicMessageSubmit { topic_id, message, chunk_info } => {
                assert_eq!(topic_id, Some(TopicId(9)));
                assert_eq!(message, vec![5, 5]);
                assert_eq!(chunk_info, Some(info));
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }
}
