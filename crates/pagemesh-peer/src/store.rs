//! Page store seam and the in-memory implementation.
//!
//! Persistent storage of captured pages is outside this layer; the service
//! only needs lookup, listing, and the two summary forms.

use crate::request::PageEntry;
use crate::summary::{BloomSummary, PageDigest};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Bloom false-positive target used when deriving a summary from a store
const BLOOM_FP_RATE: f64 = 0.01;

/// Read side of a peer's page cache
pub trait PageStore: Send + Sync + 'static {
    /// Body of the page at `url`, if cached
    fn page(&self, url: &str) -> Option<Vec<u8>>;

    /// Window of cached page entries, ordered by URL
    fn pages(&self, offset: usize, limit: usize) -> Vec<PageEntry>;

    /// Exact-membership digest blob
    fn digest(&self) -> Vec<u8>;

    /// Bloom-filter blob
    fn bloom(&self) -> Vec<u8>;
}

/// In-memory page store used by the loopback demo and the test suites
#[derive(Debug, Default)]
pub struct MemoryStore {
    pages: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a cached page
    pub fn insert(&self, url: impl Into<String>, body: Vec<u8>) {
        self.pages.write().expect("store lock").insert(url.into(), body);
    }

    /// Remove a cached page
    pub fn remove(&self, url: &str) {
        self.pages.write().expect("store lock").remove(url);
    }

    /// Number of cached pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.read().expect("store lock").len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageStore for MemoryStore {
    fn page(&self, url: &str) -> Option<Vec<u8>> {
        self.pages.read().expect("store lock").get(url).cloned()
    }

    fn pages(&self, offset: usize, limit: usize) -> Vec<PageEntry> {
        self.pages
            .read()
            .expect("store lock")
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(url, body)| PageEntry {
                url: url.clone(),
                length: body.len() as u64,
            })
            .collect()
    }

    fn digest(&self) -> Vec<u8> {
        let digest: PageDigest = self
            .pages
            .read()
            .expect("store lock")
            .keys()
            .cloned()
            .collect();
        digest.to_bytes().unwrap_or_default()
    }

    fn bloom(&self) -> Vec<u8> {
        let pages = self.pages.read().expect("store lock");
        let mut bloom = BloomSummary::with_capacity(pages.len(), BLOOM_FP_RATE);
        for url in pages.keys() {
            bloom.insert(url);
        }
        drop(pages);
        bloom.to_bytes().unwrap_or_default()
    }
}
