//! Serving side of the cache operations.
//!
//! One [`CacheService`] answers one channel at a time: it reads the start
//! message, dispatches on the requested operation, and runs the matching
//! sender engine against its [`PageStore`]. Page bodies stream with the
//! push engine; listings and summary blobs go over the pull engine.
//! Anything unservable is answered with an ERROR message in place of
//! stream info.

use crate::error::{PeerError, Result};
use crate::request::CacheRequest;
use crate::store::PageStore;
use pagemesh_core::{Message, MessageChannel, PullSender, PushConfig, PushSender};
use std::sync::Arc;

/// Cache service answering the four operations from a page store
pub struct CacheService<S: PageStore> {
    store: Arc<S>,
    config: PushConfig,
}

impl<S: PageStore> CacheService<S> {
    /// Create a service over a store with default transfer tuning
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            config: PushConfig::default(),
        }
    }

    /// Override the transfer tuning
    #[must_use]
    pub fn with_config(store: Arc<S>, config: PushConfig) -> Self {
        Self { store, config }
    }

    /// Serve one channel to completion, absorbing errors into the log.
    ///
    /// Used where the caller has nowhere to propagate failures (spawned
    /// per-channel tasks); [`Self::serve`] is the fallible version.
    pub async fn handle_channel<C: MessageChannel>(&self, channel: C) {
        if let Err(err) = self.serve(channel).await {
            tracing::warn!(error = %err, "cache exchange failed");
        }
    }

    /// Serve one channel to completion.
    pub async fn serve<C: MessageChannel>(&self, channel: C) -> Result<()> {
        let raw = channel.recv().await?;
        let start = Message::decode(&raw)?;
        let request = match CacheRequest::from_message(&start) {
            Ok(request) => request,
            Err(err) => {
                Self::refuse(&channel, "unrecognized request").await?;
                return Err(err);
            }
        };

        tracing::debug!(
            channel = request.channel(),
            action = ?start.header_str("action"),
            "serving cache request"
        );

        match request {
            CacheRequest::FetchPage { url, .. } => match self.store.page(&url) {
                Some(body) => {
                    PushSender::new(channel, self.config.clone())?.run(body).await?;
                }
                None => {
                    tracing::debug!(url, "page not cached");
                    Self::refuse(&channel, "page not found").await?;
                }
            },
            CacheRequest::ListPages { offset, limit, .. } => {
                let entries = self.store.pages(offset as usize, limit as usize);
                let body = serde_json::to_vec(&entries)?;
                self.pull_reply(channel, body).await?;
            }
            CacheRequest::GetDigest { .. } => {
                let body = self.store.digest();
                self.pull_reply(channel, body).await?;
            }
            CacheRequest::GetBloomFilter { .. } => {
                let body = self.store.bloom();
                self.pull_reply(channel, body).await?;
            }
        }
        Ok(())
    }

    /// Serve one payload over the pull engine
    async fn pull_reply<C: MessageChannel>(&self, channel: C, body: Vec<u8>) -> Result<()> {
        PullSender::new(channel, self.config.chunk_size)?
            .run(body)
            .await?;
        Ok(())
    }

    /// Answer with an ERROR message and close the channel
    async fn refuse<C: MessageChannel>(channel: &C, description: &str) -> Result<()> {
        let frame = Message::error(description).encode()?;
        let send_result = channel.send(frame).await;
        channel.close();
        send_result.map_err(PeerError::Channel)
    }
}
