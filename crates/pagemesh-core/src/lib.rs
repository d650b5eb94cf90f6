//! # Pagemesh Core
//!
//! Core protocol implementation for the Pagemesh peer-to-peer page cache.
//!
//! This crate provides:
//! - Wire codec (length-prefixed JSON header + binary payload)
//! - Peer channel abstraction (ordered, message-oriented, with a
//!   buffered-byte gauge for backpressure)
//! - Chunked transfer engines (receiver-driven pull and sender-driven
//!   push with backpressure)
//! - Error types and handling
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Transfer Engines                             │
//! │   (pull / push chunk streaming over one peer channel)           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                        Messages                                 │
//! │   (status + JSON header + binary payload, one codec for both    │
//! │    control messages and raw chunks)                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                        Channel                                  │
//! │   (ordered, reliable, message-oriented duplex handed in by      │
//! │    the session layer)                                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod message;
pub mod transfer;

pub use channel::{DuplexChannel, MessageChannel, duplex_pair};
pub use error::{ChannelError, Error, MessageError, TransferError};
pub use message::{Message, Status};
pub use transfer::{
    DEFAULT_CHUNK_SIZE, PullReceiver, PullSender, PushConfig, PushReceiver, PushSender,
    ReceiverSession, ReceiverState, SenderSession, SenderState, StreamInfo,
};

/// Size of the big-endian header-length prefix on every wire message
pub const LENGTH_PREFIX_SIZE: usize = 4;
