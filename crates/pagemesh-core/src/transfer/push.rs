//! Push transfer variant: the sender streams continuously, throttled only
//! by the channel's own buffering.
//!
//! After the start handshake the receiver never requests chunks. The
//! sender watches the channel's buffered-byte gauge: past the full
//! threshold it parks the current chunk and suspends on one drained wait;
//! the channel's low threshold decides when that wait resolves. The sent
//! counter is incremented *before* each send attempt so an ack racing the
//! operation cannot cause a double send.
//!
//! Known limitation: there is no signal from the receiver back to the
//! sender, so a slow receiver can still be overwhelmed if the transport's
//! own buffering is insufficient.

use crate::channel::MessageChannel;
use crate::error::TransferError;
use crate::message::Message;
use crate::transfer::session::{
    DEFAULT_CHUNK_SIZE, ReceiverProgress, ReceiverSession, SenderSession,
};

/// Push flow-control configuration.
///
/// Any positive chunk size and any thresholds with `0 < low < full` work;
/// the defaults are empirical tuning, not invariants.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Chunk size in bytes
    pub chunk_size: usize,
    /// Buffered-byte level above which the sender suspends
    pub full_threshold: usize,
    /// Buffered-byte level at which the channel signals it is safe to resume
    pub low_threshold: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            full_threshold: 256 * 1024,
            low_threshold: 64 * 1024,
        }
    }
}

impl PushConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.chunk_size == 0 {
            return Err(TransferError::InvalidConfig("chunk size must be positive"));
        }
        if self.low_threshold == 0 || self.low_threshold >= self.full_threshold {
            return Err(TransferError::InvalidConfig(
                "thresholds must satisfy 0 < low < full",
            ));
        }
        Ok(())
    }
}

/// Sender role of the push variant.
pub struct PushSender<C: MessageChannel> {
    channel: C,
    session: SenderSession,
    config: PushConfig,
}

impl<C: MessageChannel> PushSender<C> {
    /// Create a push sender over a channel, installing the low threshold
    /// on the channel itself.
    pub fn new(channel: C, config: PushConfig) -> Result<Self, TransferError> {
        config.validate()?;
        channel.set_low_threshold(config.low_threshold);
        Ok(Self {
            session: SenderSession::new(config.chunk_size)?,
            channel,
            config,
        })
    }

    /// Stream one payload to completion.
    ///
    /// On a failed chunk send the sent counter is rolled back and the same
    /// chunk is retried after the next drained wait; a closed channel is a
    /// terminal transfer failure. The failed chunk is never skipped, since
    /// the receiver counts toward the announced total and dropped bytes
    /// could never reassemble.
    pub async fn run(mut self, payload: Vec<u8>) -> Result<(), TransferError> {
        let info = self.session.prepare(payload)?;
        tracing::debug!(num_chunks = info.num_chunks, "push transfer starting");
        self.channel.send(info.into_message()?.encode()?).await?;

        while let Some(index) = self.session.next_index() {
            if self.channel.buffered_bytes() > self.config.full_threshold {
                self.session.park(index);
                self.channel.drained().await;
                if self.channel.is_closed() {
                    return Err(TransferError::Channel(crate::error::ChannelError::Closed));
                }
                continue;
            }

            let Some(chunk) = self.session.chunk(index) else {
                return Err(TransferError::InvalidState("chunk cursor out of range"));
            };
            let frame = Message::ok(chunk.to_vec()).encode()?;

            self.session.record_sent();
            if let Err(err) = self.channel.send(frame).await {
                self.session.rollback_sent();
                if self.channel.is_closed() {
                    tracing::warn!(chunk = index, "channel closed mid-push");
                    return Err(err.into());
                }
                tracing::warn!(chunk = index, "chunk send failed, retrying after drain");
                self.session.park(index);
                self.channel.drained().await;
            }
        }

        tracing::debug!(sent = self.session.sent(), "push transfer complete");
        Ok(())
    }
}

/// Receiver role of the push variant.
///
/// Identical to the pull receiver's reassembly, minus the control tokens:
/// the start message must already have been sent; chunks then arrive at
/// the sender's pace.
pub struct PushReceiver<C: MessageChannel> {
    channel: C,
    session: ReceiverSession,
}

impl<C: MessageChannel> PushReceiver<C> {
    /// Create a push receiver over a channel
    #[must_use]
    pub fn new(channel: C, accumulate: bool) -> Self {
        Self {
            channel,
            session: ReceiverSession::new(accumulate),
        }
    }

    /// Drive the exchange to completion and close the channel.
    pub async fn run(mut self) -> Result<Option<Vec<u8>>, TransferError> {
        while !self.session.is_complete() {
            let raw = match self.channel.recv().await {
                Ok(raw) => raw,
                Err(err) => {
                    self.session.fail();
                    return Err(err.into());
                }
            };
            let msg = match Message::decode(&raw) {
                Ok(msg) => msg,
                Err(err) => {
                    self.session.fail();
                    return Err(err.into());
                }
            };
            match self.session.on_message(&msg)? {
                ReceiverProgress::Started { num_chunks } => {
                    tracing::debug!(num_chunks, "push transfer receiving");
                }
                ReceiverProgress::Chunk { .. } | ReceiverProgress::Complete => {}
            }
        }

        self.channel.close();
        Ok(self.session.into_buffer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::duplex_pair;
    use std::time::Duration;

    fn small_config() -> PushConfig {
        PushConfig {
            chunk_size: 16,
            full_threshold: 64,
            low_threshold: 32,
        }
    }

    #[tokio::test]
    async fn test_push_roundtrip() {
        let (client, server) = duplex_pair();
        let payload: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        let sender = tokio::spawn(async move {
            PushSender::new(server, small_config()).unwrap().run(payload).await
        });
        let received = PushReceiver::new(client, true).run().await.unwrap();

        assert_eq!(received.unwrap(), expected);
        sender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_push_empty_payload() {
        let (client, server) = duplex_pair();

        let sender = tokio::spawn(async move {
            PushSender::new(server, small_config()).unwrap().run(Vec::new()).await
        });
        let received = PushReceiver::new(client, true).run().await.unwrap();

        assert_eq!(received.unwrap(), b"");
        sender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_sender_suspends_at_full_threshold() {
        let (client, server) = duplex_pair();
        let config = small_config();
        let payload = vec![0xABu8; 4096];

        let sender = tokio::spawn(async move {
            PushSender::new(server, config).unwrap().run(payload).await
        });

        // Nobody reads: the sender must stall near the full threshold
        // instead of flooding the whole payload into the queue. The
        // backlog may overshoot by at most one framed chunk.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stalled_at = client.peer_buffered_bytes();
        assert!(stalled_at > 0);
        assert!(
            stalled_at < 256,
            "sender queued {stalled_at} bytes past the watermark"
        );

        // Draining the queue lets the transfer finish.
        let received = PushReceiver::new(client, true).run().await.unwrap();
        assert_eq!(received.unwrap().len(), 4096);
        sender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_thresholds_rejected() {
        let (_client, server) = duplex_pair();
        let config = PushConfig {
            chunk_size: 16,
            full_threshold: 32,
            low_threshold: 32,
        };
        assert!(matches!(
            PushSender::new(server, config),
            Err(TransferError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_receiver_surfaces_remote_error() {
        let (client, server) = duplex_pair();

        let receiver = tokio::spawn(async move { PushReceiver::new(client, true).run().await });
        server
            .send(Message::error("stream aborted").encode().unwrap())
            .await
            .unwrap();

        assert!(matches!(
            receiver.await.unwrap(),
            Err(TransferError::Remote(_))
        ));
    }
}
