//! Per-peer cache operations.
//!
//! A [`PeerAccessor`] wraps one peer's address and exposes the four cache
//! operations, each backed by exactly one chunked exchange over a freshly
//! opened channel. No operation partially succeeds: the future resolves
//! with the fully reassembled result or fails with the underlying error.

use crate::connect::{Connection, Connector};
use crate::error::{PeerError, Result};
use crate::request::{CacheRequest, PageEntry};
use pagemesh_core::{MessageChannel, PullReceiver, PushReceiver};
use std::net::IpAddr;
use std::sync::Arc;

/// Client façade for one peer's cache service
pub struct PeerAccessor<N: Connector> {
    connector: Arc<N>,
    ip: IpAddr,
    port: u16,
}

impl<N: Connector> PeerAccessor<N> {
    /// Create an accessor for the peer at `ip:port`
    #[must_use]
    pub fn new(connector: Arc<N>, ip: IpAddr, port: u16) -> Self {
        Self {
            connector,
            ip,
            port,
        }
    }

    /// Peer IP address
    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Peer port
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Fetch one cached page by URL.
    ///
    /// The service streams the body with the push engine.
    pub async fn fetch_page(&self, url: &str) -> Result<Vec<u8>> {
        let request = CacheRequest::FetchPage {
            channel: CacheRequest::new_channel_id(),
            url: url.to_string(),
        };
        let channel = self.start_exchange(&request).await?;
        let body = PushReceiver::new(channel, true).run().await?;
        tracing::debug!(url, bytes = body.as_ref().map_or(0, Vec::len), "page fetched");
        Ok(body.unwrap_or_default())
    }

    /// List a window of the peer's cached pages.
    pub async fn list_pages(&self, offset: u64, limit: u64) -> Result<Vec<PageEntry>> {
        let request = CacheRequest::ListPages {
            channel: CacheRequest::new_channel_id(),
            offset,
            limit,
        };
        let body = self.pull_exchange(&request).await?;
        let entries: Vec<PageEntry> = serde_json::from_slice(&body)?;
        Ok(entries)
    }

    /// Fetch the peer's exact-membership digest blob.
    pub async fn fetch_digest(&self) -> Result<Vec<u8>> {
        let request = CacheRequest::GetDigest {
            channel: CacheRequest::new_channel_id(),
        };
        self.pull_exchange(&request).await
    }

    /// Fetch the peer's bloom-filter blob.
    pub async fn fetch_bloom_filter(&self) -> Result<Vec<u8>> {
        let request = CacheRequest::GetBloomFilter {
            channel: CacheRequest::new_channel_id(),
        };
        self.pull_exchange(&request).await
    }

    /// Open a channel and send the start message
    async fn start_exchange(
        &self,
        request: &CacheRequest,
    ) -> Result<<N::Connection as Connection>::Channel> {
        let connection = self.connector.get_or_create(self.ip, self.port).await?;
        let channel = connection.open_channel(request.channel()).await?;
        let start = request.to_message()?.encode()?;
        channel.send(start).await.map_err(PeerError::Channel)?;
        Ok(channel)
    }

    /// Run one pull-variant exchange to the reassembled payload
    async fn pull_exchange(&self, request: &CacheRequest) -> Result<Vec<u8>> {
        let channel = self.start_exchange(request).await?;
        let body = PullReceiver::new(channel, true).run().await?;
        Ok(body.unwrap_or_default())
    }
}
