//! Error types for the Pagemesh core protocol.

use thiserror::Error;

/// Core protocol errors
#[derive(Debug, Error)]
pub enum Error {
    /// Message codec error
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// Channel error
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Transfer error
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
}

/// Wire codec errors
#[derive(Debug, Error)]
pub enum MessageError {
    /// Buffer too short to hold the length prefix
    #[error("message too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Expected minimum size
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// Declared header length overruns the buffer
    #[error("header length {header_len} overruns buffer of {available} bytes")]
    HeaderOverflow {
        /// Header length declared in the prefix
        header_len: usize,
        /// Bytes available after the prefix
        available: usize,
    },

    /// Header segment is not valid JSON
    #[error("malformed header JSON: {0}")]
    InvalidHeader(#[from] serde_json::Error),

    /// Header JSON is not an object
    #[error("header is not a JSON object")]
    HeaderNotObject,

    /// Header object carries no status field
    #[error("header missing status field")]
    MissingStatus,

    /// Status field is not one of the known codes
    #[error("invalid status code: {0}")]
    InvalidStatus(u64),
}

/// Peer channel errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel has been closed by either end
    #[error("channel closed")]
    Closed,
}

/// Chunk transfer errors
#[derive(Debug, Error)]
pub enum TransferError {
    /// Message codec failure during a transfer
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// Channel failure during a transfer
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Stream metadata could not be decoded
    #[error("malformed stream info: {0}")]
    InvalidStreamInfo(serde_json::Error),

    /// Invalid state for the requested operation
    #[error("invalid state for operation: {0}")]
    InvalidState(&'static str),

    /// Invalid transfer configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Peer sent something the protocol does not allow here
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Peer reported an error over the channel
    #[error("remote error: {0}")]
    Remote(String),
}
