//! Error types for the peer access layer.

use pagemesh_core::{ChannelError, MessageError, TransferError};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur accessing or serving a peer
#[derive(Debug, Error)]
pub enum PeerError {
    /// No service is reachable at the peer's address
    #[error("connection refused: {0}")]
    ConnectionRefused(SocketAddr),

    /// Connection establishment failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// The chunked exchange failed
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// A wire message could not be encoded or decoded
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// The channel failed outside a transfer
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// A JSON body (request, reply, summary) could not be handled
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The start message did not describe a known operation
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for peer operations
pub type Result<T> = std::result::Result<T, PeerError>;
