//! # Pagemesh Peer
//!
//! Peer access layer for the Pagemesh page cache:
//! - The four cache operations as seen by a client ([`PeerAccessor`])
//! - The serving side answering them ([`CacheService`]) against a
//!   [`PageStore`]
//! - Cache-presence summaries peers exchange ([`PageDigest`],
//!   [`BloomSummary`])
//! - The connection seam real transports implement ([`Connector`],
//!   [`Connection`]) and an in-process loopback implementation
//!   ([`MemoryNetwork`], [`MemoryConnector`])

#![warn(clippy::all)]

pub mod accessor;
pub mod connect;
pub mod error;
pub mod memory;
pub mod request;
pub mod service;
pub mod store;
pub mod summary;

pub use accessor::PeerAccessor;
pub use connect::{Connection, Connector};
pub use error::{PeerError, Result};
pub use memory::{ChannelHandler, MemoryConnector, MemoryNetwork};
pub use request::{CacheRequest, PageEntry};
pub use service::CacheService;
pub use store::{MemoryStore, PageStore};
pub use summary::{BloomSummary, PageDigest};
