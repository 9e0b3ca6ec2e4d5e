//! Execution Engine
//!
//! Delivers transactions and queries across ranked node candidates:
//!
//! ```text
//! Pending ──▶ Attempting(node) ──▶ Succeeded
//!                  │
//!                  ├──retryable──▶ record_failure ──▶ Attempting(next node)
//!                  └──fatal──────▶ FatalFailure
//! ```
//!
//! Network errors and busy codes move on to the next node. Precheck
//! rejections stop immediately. Running out of nodes or time yields a single
//! aggregated `DeadlineExceeded`.

pub mod channel;
pub mod engine;
pub mod request;
pub mod status;

pub use channel::{Channel, ChannelFactory, MethodId, TcpChannel, TcpChannelFactory, TransportError};
pub use engine::{CancelHandle, CancelToken, ExecutionConfig, ExecutionEngine};
pub use request::{ExecutionRequest, ExecutionResponse, Query, RequestKind, TransactionResponse};
pub use status::{Classification, NodeResponse, PrecheckCode};
