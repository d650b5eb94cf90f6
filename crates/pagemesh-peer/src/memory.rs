//! In-process loopback transport.
//!
//! The reference implementation of the connection seam: a registry of
//! bound service endpoints keyed by socket address. Opening a channel
//! creates an in-process duplex pair and hands the far end to the bound
//! endpoint's handler. The CLI demo and the integration tests run
//! entirely on this; real transports implement [`Connector`] and
//! [`Connection`] against actual sockets.

use crate::connect::{Connection, Connector};
use crate::error::PeerError;
use crate::service::CacheService;
use crate::store::PageStore;
use dashmap::DashMap;
use pagemesh_core::{DuplexChannel, duplex_pair};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Something that can take ownership of one inbound channel.
///
/// The loopback transport routes freshly opened channels through this
/// trait; a real session layer's accept loop plays the same role.
pub trait ChannelHandler: Send + Sync + 'static {
    /// Take one inbound channel and serve it, typically on a spawned task
    fn handle(self: Arc<Self>, channel: DuplexChannel);
}

impl<S: PageStore> ChannelHandler for CacheService<S> {
    fn handle(self: Arc<Self>, channel: DuplexChannel) {
        tokio::spawn(async move {
            self.handle_channel(channel).await;
        });
    }
}

/// Registry of in-process service endpoints
#[derive(Default)]
pub struct MemoryNetwork {
    endpoints: DashMap<SocketAddr, Arc<dyn ChannelHandler>>,
}

impl MemoryNetwork {
    /// Create an empty network
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bind a handler at an address, replacing any previous binding
    pub fn bind(&self, addr: SocketAddr, handler: Arc<dyn ChannelHandler>) {
        tracing::debug!(%addr, "endpoint bound");
        self.endpoints.insert(addr, handler);
    }

    /// Remove the binding at an address
    pub fn unbind(&self, addr: SocketAddr) {
        tracing::debug!(%addr, "endpoint unbound");
        self.endpoints.remove(&addr);
    }

    /// Number of bound endpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no endpoint is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    fn lookup(&self, addr: SocketAddr) -> Option<Arc<dyn ChannelHandler>> {
        self.endpoints.get(&addr).map(|entry| Arc::clone(entry.value()))
    }
}

/// Connector over a [`MemoryNetwork`]
#[derive(Clone)]
pub struct MemoryConnector {
    network: Arc<MemoryNetwork>,
}

impl MemoryConnector {
    /// Create a connector over a network
    #[must_use]
    pub fn new(network: Arc<MemoryNetwork>) -> Self {
        Self { network }
    }
}

impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn get_or_create(&self, ip: IpAddr, port: u16) -> Result<MemoryConnection, PeerError> {
        let addr = SocketAddr::new(ip, port);
        let handler = self
            .network
            .lookup(addr)
            .ok_or(PeerError::ConnectionRefused(addr))?;
        Ok(MemoryConnection { handler })
    }
}

/// One loopback connection: channels open directly against the bound
/// handler.
pub struct MemoryConnection {
    handler: Arc<dyn ChannelHandler>,
}

impl Connection for MemoryConnection {
    type Channel = DuplexChannel;

    async fn open_channel(&self, channel_id: &str) -> Result<DuplexChannel, PeerError> {
        tracing::trace!(channel_id, "opening loopback channel");
        let (local, remote) = duplex_pair();
        Arc::clone(&self.handler).handle(remote);
        Ok(local)
    }
}
