//! Pull transfer variant: the receiver drives, one control token per chunk.
//!
//! After the start handshake the receiver sends the `next` token once
//! following stream info and again after each chunk, so at most one chunk
//! is ever in flight. Memory stays bounded on both sides at the cost of
//! one round trip per chunk.
//!
//! The token is an OK message whose header is exactly
//! `{"message":"next"}`; anything else on the sender's inbound side is a
//! fatal protocol violation.

use crate::channel::MessageChannel;
use crate::error::TransferError;
use crate::message::{MESSAGE_KEY, Message, Status};
use crate::transfer::session::{ReceiverProgress, ReceiverSession, SenderSession, SenderState};
use serde_json::{Map, Value};

/// Header value of the pull control token
pub const NEXT_TOKEN: &str = "next";

fn next_token_message() -> Message {
    let mut header = Map::new();
    header.insert(MESSAGE_KEY.to_string(), Value::from(NEXT_TOKEN));
    Message::ok_with_header(header)
}

fn is_next_token(msg: &Message) -> bool {
    msg.status == Status::Ok
        && msg.payload.is_empty()
        && msg.header.len() == 1
        && msg.header_str(MESSAGE_KEY) == Some(NEXT_TOKEN)
}

/// Sender role of the pull variant.
///
/// Streams one payload, yielding exactly one chunk per valid inbound
/// token.
pub struct PullSender<C: MessageChannel> {
    channel: C,
    session: SenderSession,
}

impl<C: MessageChannel> PullSender<C> {
    /// Create a pull sender over a channel
    pub fn new(channel: C, chunk_size: usize) -> Result<Self, TransferError> {
        Ok(Self {
            channel,
            session: SenderSession::new(chunk_size)?,
        })
    }

    /// Serve one payload to completion.
    ///
    /// Sends stream info unconditionally as message #1, then answers each
    /// `next` token with the chunk under the cursor. Any other inbound
    /// content is fatal: an ERROR message is sent in place of the next
    /// chunk and the transfer fails.
    pub async fn run(mut self, payload: Vec<u8>) -> Result<(), TransferError> {
        let info = self.session.prepare(payload)?;
        tracing::debug!(num_chunks = info.num_chunks, "pull transfer starting");
        self.channel.send(info.into_message()?.encode()?).await?;

        while self.session.state() != SenderState::Done {
            let raw = self.channel.recv().await?;
            let msg = match Message::decode(&raw) {
                Ok(msg) => msg,
                Err(err) => {
                    self.abort("undecodable control message").await;
                    return Err(err.into());
                }
            };
            if !is_next_token(&msg) {
                self.abort("expected next token").await;
                return Err(TransferError::ProtocolViolation(
                    "unexpected content in place of next token".to_string(),
                ));
            }

            let Some(index) = self.session.next_index() else {
                break;
            };
            let Some(chunk) = self.session.chunk(index) else {
                self.abort("chunk cursor out of range").await;
                return Err(TransferError::InvalidState("chunk cursor out of range"));
            };
            let frame = Message::ok(chunk.to_vec()).encode()?;
            self.channel.send(frame).await?;
            self.session.record_sent();
        }

        tracing::debug!(sent = self.session.sent(), "pull transfer complete");
        Ok(())
    }

    /// Replace the next expected chunk with an ERROR message, best effort
    async fn abort(&self, description: &str) {
        tracing::error!(description, "pull transfer aborted");
        if let Ok(frame) = Message::error(description).encode() {
            let _ = self.channel.send(frame).await;
        }
        self.channel.close();
    }
}

/// Receiver role of the pull variant.
///
/// The application-defined start message must already have been sent over
/// the channel before `run` is called.
pub struct PullReceiver<C: MessageChannel> {
    channel: C,
    session: ReceiverSession,
}

impl<C: MessageChannel> PullReceiver<C> {
    /// Create a pull receiver over a channel
    #[must_use]
    pub fn new(channel: C, accumulate: bool) -> Self {
        Self {
            channel,
            session: ReceiverSession::new(accumulate),
        }
    }

    /// Drive the exchange to completion.
    ///
    /// Returns the reassembled payload if accumulation was requested,
    /// `None` otherwise. The channel is closed once the announced chunk
    /// count has been received.
    pub async fn run(mut self) -> Result<Option<Vec<u8>>, TransferError> {
        loop {
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
                ReceiverProgress::Complete => break,
                ReceiverProgress::Started { .. } if self.session.is_complete() => break,
                ReceiverProgress::Started { .. } | ReceiverProgress::Chunk { .. } => {
                    self.channel
                        .send(next_token_message().encode()?)
                        .await?;
                }
            }
        }

        self.channel.close();
        Ok(self.session.into_buffer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MessageChannel, duplex_pair};
    use crate::transfer::session::StreamInfo;

    #[tokio::test]
    async fn test_pull_roundtrip() {
        let (client, server) = duplex_pair();
        let payload = b"abc def ghi jkl mno p".to_vec();

        let sender = tokio::spawn(async move {
            PullSender::new(server, 4).unwrap().run(payload).await
        });
        let received = PullReceiver::new(client, true).run().await.unwrap();

        assert_eq!(received.unwrap(), b"abc def ghi jkl mno p");
        sender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_pull_empty_payload_sends_no_tokens() {
        let (client, server) = duplex_pair();

        let sender = tokio::spawn(async move {
            PullSender::new(server, 4).unwrap().run(Vec::new()).await
        });
        let received = PullReceiver::new(client, true).run().await.unwrap();

        assert_eq!(received.unwrap(), b"");
        sender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_one_token_per_chunk() {
        let (client, server) = duplex_pair();
        let payload = b"0123456789".to_vec();

        let sender = tokio::spawn(async move {
            PullSender::new(server, 3).unwrap().run(payload).await
        });

        // Drive the receiver side by hand: info, then token/chunk pairs.
        let info_msg = Message::decode(&client.recv().await.unwrap()).unwrap();
        let info = StreamInfo::from_message(&info_msg).unwrap();
        assert_eq!(info.num_chunks, 4);

        let mut chunks = Vec::new();
        for _ in 0..info.num_chunks {
            client.send(next_token_message().encode().unwrap()).await.unwrap();
            let chunk = Message::decode(&client.recv().await.unwrap()).unwrap();
            chunks.push(chunk.payload);
        }
        assert_eq!(chunks.concat(), b"0123456789");
        sender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_token_is_fatal() {
        let (client, server) = duplex_pair();

        let sender = tokio::spawn(async move {
            PullSender::new(server, 4).unwrap().run(b"data".to_vec()).await
        });

        // Swallow stream info, then send garbage instead of the token.
        client.recv().await.unwrap();
        client
            .send(Message::ok(b"give me everything".to_vec()).encode().unwrap())
            .await
            .unwrap();

        let reply = Message::decode(&client.recv().await.unwrap()).unwrap();
        assert_eq!(reply.status, Status::Error);
        assert!(matches!(
            sender.await.unwrap(),
            Err(TransferError::ProtocolViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_receiver_surfaces_remote_error() {
        let (client, server) = duplex_pair();

        let receiver = tokio::spawn(async move { PullReceiver::new(client, true).run().await });

        server
            .send(Message::error("cache offline").encode().unwrap())
            .await
            .unwrap();

        assert!(matches!(
            receiver.await.unwrap(),
            Err(TransferError::Remote(_))
        ));
    }

    #[test]
    fn test_token_shape() {
        let token = next_token_message();
        assert!(is_next_token(&token));

        let mut not_token = next_token_message();
        not_token.payload = b"x".to_vec();
        assert!(!is_next_token(&not_token));
        assert!(!is_next_token(&Message::error(NEXT_TOKEN)));
    }
}
