//! Connection seam to the session layer.
//!
//! Establishing and authenticating connections is outside this crate; a
//! [`Connector`] hands back something already connected. One connection
//! opens a fresh logical channel per exchange, routed by the
//! initiator-chosen channel identifier carried in the start message.

use crate::error::PeerError;
use pagemesh_core::MessageChannel;
use std::future::Future;
use std::net::IpAddr;

/// Get-or-create seam for peer connections.
///
/// Failure propagates to the caller unchanged; no retry happens at this
/// layer.
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced by this connector
    type Connection: Connection;

    /// Return a connection to the peer at `ip:port`, establishing one if
    /// none exists.
    fn get_or_create(
        &self,
        ip: IpAddr,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection, PeerError>> + Send;
}

/// One established connection to a peer
pub trait Connection: Send + Sync {
    /// Channel type this connection multiplexes
    type Channel: MessageChannel;

    /// Open a fresh logical channel for one exchange
    fn open_channel(
        &self,
        channel_id: &str,
    ) -> impl Future<Output = Result<Self::Channel, PeerError>> + Send;
}
