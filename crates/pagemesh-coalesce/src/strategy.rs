//! Coalescence strategies.
//!
//! A strategy decides which summary a peer is asked for and how a URL is
//! matched against it. The engine stays agnostic: it fetches through the
//! strategy, stores whatever comes back, and delegates queries to it.

use pagemesh_peer::{BloomSummary, Connector, PageDigest, PeerAccessor, PeerError};
use std::future::Future;

/// What to fetch from each peer and how to query it
pub trait CoalescenceStrategy: Send + Sync + 'static {
    /// Parsed per-peer summary held by the engine
    type Summary: Send + Sync + 'static;

    /// Fetch and parse one peer's summary
    fn fetch<N: Connector>(
        &self,
        accessor: &PeerAccessor<N>,
    ) -> impl Future<Output = Result<Self::Summary, PeerError>> + Send;

    /// Whether the summary claims the URL is cached
    fn matches(&self, summary: &Self::Summary, url: &str) -> bool;
}

/// Exact matching against each peer's digest list
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestStrategy;

impl CoalescenceStrategy for DigestStrategy {
    type Summary = PageDigest;

    async fn fetch<N: Connector>(
        &self,
        accessor: &PeerAccessor<N>,
    ) -> Result<PageDigest, PeerError> {
        let blob = accessor.fetch_digest().await?;
        Ok(PageDigest::from_bytes(&blob)?)
    }

    fn matches(&self, summary: &PageDigest, url: &str) -> bool {
        summary.contains(url)
    }
}

/// Probabilistic matching against each peer's bloom filter.
///
/// A match may be a false positive; a non-match is definitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BloomStrategy;

impl CoalescenceStrategy for BloomStrategy {
    type Summary = BloomSummary;

    async fn fetch<N: Connector>(
        &self,
        accessor: &PeerAccessor<N>,
    ) -> Result<BloomSummary, PeerError> {
        let blob = accessor.fetch_bloom_filter().await?;
        Ok(BloomSummary::from_bytes(&blob)?)
    }

    fn matches(&self, summary: &BloomSummary, url: &str) -> bool {
        summary.contains(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_strategy_matches_exactly() {
        let mut digest = PageDigest::new();
        digest.insert("https://example.org/a");

        let strategy = DigestStrategy;
        assert!(strategy.matches(&digest, "https://example.org/a"));
        assert!(!strategy.matches(&digest, "https://example.org/b"));
    }

    #[test]
    fn test_bloom_strategy_never_misses_inserted() {
        let mut bloom = BloomSummary::with_capacity(16, 0.01);
        bloom.insert("https://example.org/a");

        let strategy = BloomStrategy;
        assert!(strategy.matches(&bloom, "https://example.org/a"));
    }
}
