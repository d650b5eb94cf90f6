//! Chunked bulk transfer over a single ordered message channel.
//!
//! Two flow-control variants share one session model:
//!
//! - [`pull`] — the receiver drives, requesting one chunk per control
//!   token; bounded memory on both sides, one round trip per chunk.
//! - [`push`] — the sender streams continuously, throttled by the
//!   channel's buffered-byte gauge between a full and a low threshold.
//!
//! Either way the sender announces the total chunk count up front
//! ([`StreamInfo`]) and the receiver reassembles until that count is
//! reached. A transfer never completes partially and silently: any
//! sender-side failure replaces the next expected message with an ERROR.

pub mod pull;
pub mod push;
pub mod session;

pub use pull::{PullReceiver, PullSender};
pub use push::{PushConfig, PushReceiver, PushSender};
pub use session::{
    DEFAULT_CHUNK_SIZE, ReceiverProgress, ReceiverSession, ReceiverState, SenderSession,
    SenderState, StreamInfo,
};
