//! Transfer session state machines shared by both flow-control variants.
//!
//! A session instance serves exactly one transfer and is never reused or
//! restarted mid-flight.

use crate::error::TransferError;
use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Default chunk size for transfers (empirical tuning, not an invariant)
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Stream metadata announced by the sender before any chunk.
///
/// Always the first message of a transfer, carried as the JSON payload of
/// an OK message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Total number of chunks that will follow
    #[serde(rename = "numChunks")]
    pub num_chunks: u64,
}

impl StreamInfo {
    /// Build the wire message carrying this stream info
    pub fn into_message(self) -> Result<Message, TransferError> {
        let body = serde_json::to_vec(&self).map_err(TransferError::InvalidStreamInfo)?;
        Ok(Message::ok(body))
    }

    /// Parse stream info out of the first OK message of a transfer
    pub fn from_message(msg: &Message) -> Result<Self, TransferError> {
        serde_json::from_slice(&msg.payload).map_err(TransferError::InvalidStreamInfo)
    }
}

/// Sender session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// No payload handed over yet
    Idle,
    /// Streaming chunks
    Sending,
    /// All chunks sent
    Done,
}

/// Sender half of one transfer: owns the payload and slices it into
/// contiguous, non-overlapping chunks behind a monotonically-advancing
/// cursor.
///
/// The cursor supports parking exactly one pending chunk across a
/// suspension, which is how the push variant resumes after backpressure.
#[derive(Debug)]
pub struct SenderSession {
    payload: Vec<u8>,
    chunk_size: usize,
    total_chunks: usize,
    cursor: usize,
    pending: Option<usize>,
    sent: usize,
    state: SenderState,
}

impl SenderSession {
    /// Create an idle sender session
    pub fn new(chunk_size: usize) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidConfig("chunk size must be positive"));
        }
        Ok(Self {
            payload: Vec::new(),
            chunk_size,
            total_chunks: 0,
            cursor: 0,
            pending: None,
            sent: 0,
            state: SenderState::Idle,
        })
    }

    /// Hand the payload over and compute the chunk count.
    ///
    /// Must be called exactly once per session; a second call is an
    /// invalid-state error.
    pub fn prepare(&mut self, payload: Vec<u8>) -> Result<StreamInfo, TransferError> {
        if self.state != SenderState::Idle {
            return Err(TransferError::InvalidState("session already prepared"));
        }
        self.total_chunks = payload.len().div_ceil(self.chunk_size);
        self.payload = payload;
        self.cursor = 0;
        self.sent = 0;
        self.state = if self.total_chunks == 0 {
            SenderState::Done
        } else {
            SenderState::Sending
        };
        Ok(StreamInfo {
            num_chunks: self.total_chunks as u64,
        })
    }

    /// Total number of chunks for the prepared payload
    #[must_use]
    pub fn num_chunks(&self) -> usize {
        self.total_chunks
    }

    /// Chunk bytes at the given index, if in range
    #[must_use]
    pub fn chunk(&self, index: usize) -> Option<&[u8]> {
        if index >= self.total_chunks {
            return None;
        }
        let start = index * self.chunk_size;
        let end = (start + self.chunk_size).min(self.payload.len());
        Some(&self.payload[start..end])
    }

    /// Next chunk index to transmit: the parked chunk if one exists,
    /// otherwise the cursor position. Returns `None` once the cursor has
    /// passed the last chunk.
    pub fn next_index(&mut self) -> Option<usize> {
        if let Some(parked) = self.pending.take() {
            return Some(parked);
        }
        if self.cursor < self.total_chunks {
            let index = self.cursor;
            self.cursor += 1;
            Some(index)
        } else {
            None
        }
    }

    /// Park one chunk for retransmission after a suspension
    pub fn park(&mut self, index: usize) {
        self.pending = Some(index);
    }

    /// Record a chunk as sent; transitions to `Done` on the last one
    pub fn record_sent(&mut self) {
        self.sent += 1;
        if self.sent >= self.total_chunks {
            self.state = SenderState::Done;
        }
    }

    /// Roll the sent counter back after a failed send
    pub fn rollback_sent(&mut self) {
        self.sent = self.sent.saturating_sub(1);
        if self.state == SenderState::Done && self.sent < self.total_chunks {
            self.state = SenderState::Sending;
        }
    }

    /// Number of chunks recorded as sent
    #[must_use]
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SenderState {
        self.state
    }
}

/// Receiver session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Waiting for the stream info message
    AwaitingInfo,
    /// Counting chunks toward the announced total
    Receiving,
    /// All announced chunks received (terminal)
    Complete,
    /// Transfer failed (terminal)
    Errored,
}

/// Progress reported by [`ReceiverSession::on_message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverProgress {
    /// Stream info received; the chunk count is now known
    Started {
        /// Announced total chunk count
        num_chunks: usize,
    },
    /// One chunk received, more expected
    Chunk {
        /// Chunks received so far
        received: usize,
        /// Announced total chunk count
        expected: usize,
    },
    /// Final chunk received; the transfer is complete
    Complete,
}

/// Receiver half of one transfer: counts chunks toward the announced total
/// and optionally accumulates them for reassembly.
#[derive(Debug)]
pub struct ReceiverSession {
    state: ReceiverState,
    received: usize,
    expected: usize,
    buffer: Option<Vec<u8>>,
}

impl ReceiverSession {
    /// Create a session awaiting stream info.
    ///
    /// With `accumulate` set, chunk payloads are concatenated and handed
    /// out on completion; otherwise they are counted and dropped.
    #[must_use]
    pub fn new(accumulate: bool) -> Self {
        Self {
            state: ReceiverState::AwaitingInfo,
            received: 0,
            expected: 0,
            buffer: accumulate.then(Vec::new),
        }
    }

    /// Feed one inbound message through the state machine.
    ///
    /// An ERROR-status message is terminal in any state. The first OK
    /// message must be stream info; every following OK message is one
    /// chunk.
    pub fn on_message(&mut self, msg: &Message) -> Result<ReceiverProgress, TransferError> {
        if msg.status == crate::message::Status::Error {
            self.state = ReceiverState::Errored;
            let description = msg.error_message().unwrap_or("unspecified remote error");
            return Err(TransferError::Remote(description.to_string()));
        }

        match self.state {
            ReceiverState::AwaitingInfo => {
                let info = match StreamInfo::from_message(msg) {
                    Ok(info) => info,
                    Err(err) => {
                        self.state = ReceiverState::Errored;
                        return Err(err);
                    }
                };
                self.expected = usize::try_from(info.num_chunks).map_err(|_| {
                    self.state = ReceiverState::Errored;
                    TransferError::ProtocolViolation("chunk count out of range".to_string())
                })?;
                self.state = if self.expected == 0 {
                    ReceiverState::Complete
                } else {
                    ReceiverState::Receiving
                };
                Ok(ReceiverProgress::Started {
                    num_chunks: self.expected,
                })
            }
            ReceiverState::Receiving => {
                self.received += 1;
                if let Some(buffer) = &mut self.buffer {
                    buffer.extend_from_slice(&msg.payload);
                }
                if self.received == self.expected {
                    self.state = ReceiverState::Complete;
                    Ok(ReceiverProgress::Complete)
                } else {
                    Ok(ReceiverProgress::Chunk {
                        received: self.received,
                        expected: self.expected,
                    })
                }
            }
            ReceiverState::Complete | ReceiverState::Errored => {
                Err(TransferError::InvalidState("session already terminal"))
            }
        }
    }

    /// Mark the session failed (channel loss, undecodable message)
    pub fn fail(&mut self) {
        self.state = ReceiverState::Errored;
    }

    /// Whether all announced chunks have arrived
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == ReceiverState::Complete
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Chunks received so far
    #[must_use]
    pub fn received(&self) -> usize {
        self.received
    }

    /// Announced total, zero until stream info arrives
    #[must_use]
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Take the accumulated buffer, if accumulation was requested
    #[must_use]
    pub fn into_buffer(self) -> Option<Vec<u8>> {
        self.buffer
    }
}
