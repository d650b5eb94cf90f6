//! # Pagemesh Coalesce
//!
//! Coalescence engine for the Pagemesh page cache: fans a summary query
//! out to every discovered peer, tolerates any subset failing or
//! disappearing mid-query, and merges the survivors into one queryable
//! view behind an explicit, cancellable initialization lifecycle.
//!
//! The engine owns only lifecycle and fetch orchestration; what gets
//! fetched from each peer and how URLs are matched against it is a
//! [`CoalescenceStrategy`].

#![warn(clippy::all)]

pub mod discovery;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod strategy;

pub use discovery::{PeerDescriptor, ServiceDiscovery, StaticDiscovery};
pub use engine::{CoalescenceEngine, UrlMatch};
pub use error::{CoalesceError, DiscoveryError};
pub use fanout::{PeerSummary, fetch_all};
pub use strategy::{BloomStrategy, CoalescenceStrategy, DigestStrategy};
