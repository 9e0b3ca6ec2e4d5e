//! Node channels
//!
//! The engine only needs `send(method, bytes) -> bytes`. How a channel is
//! opened (plaintext, TLS, in-memory for tests) is the factory's business.
//!
//! ## Wire frame
//!
//! ```text
//! [ length: u32 BE ][ bincode(RpcFrame { method, payload }) ]
//! ```
//!
//! Responses use the same length prefix around the encoded node response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::node::{Node, TransportMode};

/// Maximum frame size (2MB)
pub const MAX_FRAME_SIZE: usize = 2 * 1024 * 1024;

/// RPC method identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId(pub u16);

impl MethodId {
    // Transactions
    pub const CRYPTO_TRANSFER: MethodId = MethodId(1);
    pub const CREATE_ACCOUNT: MethodId = MethodId(2);
    pub const APPEND_CONTENT: MethodId = MethodId(10);
    pub const DELETE_FILE: MethodId = MethodId(11);
    pub const SYSTEM_UNDELETE: MethodId = MethodId(12);
    pub const SUBMIT_MESSAGE: MethodId = MethodId(20);
    pub const CALL_ETHEREUM: MethodId = MethodId(30);
    pub const CREATE_SCHEDULE: MethodId = MethodId(40);

    // Queries
    pub const GET_ACCOUNT_BALANCE: MethodId = MethodId(100);
    pub const GET_TRANSACTION_RECEIPT: MethodId = MethodId(101);
    pub const GET_FILE_CONTENTS: MethodId = MethodId(102);
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "method:{}", self.0)
    }
}

/// Transport level failures. All of them are retryable on another node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    #[error("Connection reset")]
    ConnectionReset,

    #[error("Transport timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Unsupported transport: {0}")]
    Unsupported(String),

    #[error("Invalid frame: {0}")]
    Frame(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                TransportError::ConnectionReset
            }
            ErrorKind::UnexpectedEof => TransportError::ConnectionReset,
            ErrorKind::ConnectionRefused | ErrorKind::NotConnected => {
                TransportError::Unavailable(e.to_string())
            }
            ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Io(e.to_string()),
        }
    }
}

/// Bidirectional RPC channel to one node
#[async_trait]
pub trait Channel: Send + Sync {
    async fn send(&self, method: MethodId, request: Vec<u8>) -> Result<Vec<u8>, TransportError>;
}

/// Builds channels for nodes
pub trait ChannelFactory: Send + Sync {
    fn channel(&self, node: &Node, mode: TransportMode) -> Result<Arc<dyn Channel>, TransportError>;
}

// =============================================================================
// FRAMING
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RpcFrame {
    pub method: MethodId,
    pub payload: Vec<u8>,
}

pub(crate) async fn write_frame<W>(writer: &mut W, bytes: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if bytes.len() > MAX_FRAME_SIZE {
        return Err(TransportError::Frame(format!(
            "{} bytes exceeds {} byte limit",
            bytes.len(),
            MAX_FRAME_SIZE
        )));
    }
    let len_bytes = (bytes.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::Frame(format!(
            "{} bytes exceeds {} byte limit",
            len, MAX_FRAME_SIZE
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

// =============================================================================
// PLAINTEXT TCP
// =============================================================================

/// Opens one TCP connection per request
pub struct TcpChannel {
    address: String,
}

impl TcpChannel {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Channel for TcpChannel {
    async fn send(&self, method: MethodId, request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let mut stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| TransportError::Unavailable(format!("{}: {}", self.address, e)))?;

        let frame = bincode::serialize(&RpcFrame {
            method,
            payload: request,
        })
        .map_err(|e| TransportError::Frame(e.to_string()))?;

        trace!("Sending {} ({} bytes) to {}", method, frame.len(), self.address);
        write_frame(&mut stream, &frame).await?;
        let response = read_frame(&mut stream).await?;
        debug!("Received {} bytes from {}", response.len(), self.address);
        Ok(response)
    }
}

/// Plaintext channels. TLS channels are provided by a separate factory.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpChannelFactory;

impl ChannelFactory for TcpChannelFactory {
    fn channel(
        &self,
        node: &Node,
        mode: TransportMode,
    ) -> Result<Arc<dyn Channel>, TransportError> {
        match mode {
            TransportMode::Plaintext => Ok(Arc::new(TcpChannel::new(node.address()))),
            TransportMode::Secure => Err(TransportError::Unsupported(
                "secure channels need a TLS channel factory".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::health::{DEFAULT_MAX_BACKOFF, DEFAULT_MIN_BACKOFF};
    use crate::types::NodeId;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_channel_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let bytes = read_frame(&mut stream).await.unwrap();
            let frame: RpcFrame = bincode::deserialize(&bytes).unwrap();
            let mut reply = frame.method.0.to_be_bytes().to_vec();
            reply.extend_from_slice(&frame.payload);
            write_frame(&mut stream, &reply).await.unwrap();
        });

        let node = Node::new(NodeId(3), addr.to_string(), DEFAULT_MIN_BACKOFF, DEFAULT_MAX_BACKOFF);
        let channel = TcpChannelFactory.channel(&node, TransportMode::Plaintext).unwrap();
        let reply = channel
            .send(MethodId::GET_ACCOUNT_BALANCE, vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(reply, vec![0, 100, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let channel = TcpChannel::new(addr.to_string());
        let err = channel.send(MethodId::CRYPTO_TRANSFER, vec![]).await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let len = ((MAX_FRAME_SIZE + 1) as u32).to_be_bytes();
            server.write_all(&len).await.unwrap();
        });
        let err = read_frame(&mut client).await.unwrap_err();
        assert!(matches!(err, TransportError::Frame(_)));
    }

    #[test]
    fn test_secure_mode_unsupported() {
        let node = Node::new(
            NodeId(3),
            "127.0.0.1:50211",
            DEFAULT_MIN_BACKOFF,
            DEFAULT_MAX_BACKOFF,
        );
        assert!(matches!(
            TcpChannelFactory.channel(&node, TransportMode::Secure),
            Err(TransportError::Unsupported(_))
        ));
    }
}
