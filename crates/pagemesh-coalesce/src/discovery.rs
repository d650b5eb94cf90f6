//! Service discovery seam.
//!
//! Local-network discovery is an external collaborator: something watches
//! the network and produces descriptors of peers advertising the cache
//! service. The engine only needs [`ServiceDiscovery::discover`].

use crate::error::DiscoveryError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// One discovered peer advertising the cache service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDescriptor {
    /// Peer IP address
    pub ip_address: IpAddr,
    /// Peer service port
    pub port: u16,
    /// Advertised service name
    pub service_name: String,
}

impl PeerDescriptor {
    /// Socket address of the peer's service
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip_address, self.port)
    }
}

/// Source of peer descriptors
pub trait ServiceDiscovery: Send + Sync + 'static {
    /// Produce the current set of advertised peers
    fn discover(
        &self,
    ) -> impl Future<Output = Result<Vec<PeerDescriptor>, DiscoveryError>> + Send;
}

impl<T: ServiceDiscovery + ?Sized> ServiceDiscovery for Arc<T> {
    fn discover(
        &self,
    ) -> impl Future<Output = Result<Vec<PeerDescriptor>, DiscoveryError>> + Send {
        (**self).discover()
    }
}

/// Discovery over a fixed peer list.
///
/// Useful wherever the peer set is known up front: configuration-driven
/// deployments, the loopback demo, tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    peers: Vec<PeerDescriptor>,
}

impl StaticDiscovery {
    /// Create a discovery source over a fixed list
    #[must_use]
    pub fn new(peers: Vec<PeerDescriptor>) -> Self {
        Self { peers }
    }
}

impl ServiceDiscovery for StaticDiscovery {
    async fn discover(&self) -> Result<Vec<PeerDescriptor>, DiscoveryError> {
        Ok(self.peers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_static_discovery_returns_list() {
        let peer = PeerDescriptor {
            ip_address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            port: 4700,
            service_name: "pagemesh".to_string(),
        };
        let discovery = StaticDiscovery::new(vec![peer.clone()]);

        let peers = discovery.discover().await.unwrap();
        assert_eq!(peers, vec![peer]);
    }

    #[test]
    fn test_descriptor_addr() {
        let peer = PeerDescriptor {
            ip_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4711,
            service_name: "pagemesh".to_string(),
        };
        assert_eq!(peer.addr().to_string(), "127.0.0.1:4711");
    }
}
