//! Cache-presence summaries peers exchange.
//!
//! Two forms exist. [`PageDigest`] lists the cached URLs exactly;
//! membership answers are precise but the blob grows with the cache.
//! [`BloomSummary`] is a bloom filter: constant-size, may answer yes for a
//! URL the peer never cached (false positive), never answers no for one it
//! did. Both serialize to JSON and travel as opaque payloads of the
//! summary-fetch operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Exact-membership digest: the set of URLs a peer's cache holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageDigest {
    urls: BTreeSet<String>,
}

impl PageDigest {
    /// Create an empty digest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a URL
    pub fn insert(&mut self, url: impl Into<String>) {
        self.urls.insert(url.into());
    }

    /// Exact membership test
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Number of recorded URLs
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether the digest is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Serialize to the wire blob
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse from the wire blob
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl FromIterator<String> for PageDigest {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

/// Bloom-filter summary: probabilistic membership over a fixed bit vector.
///
/// Bit indexes are derived from BLAKE3, keyed by the hash index so the k
/// probes are independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomSummary {
    bits: Vec<u8>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomSummary {
    /// Create a filter with an explicit geometry
    #[must_use]
    pub fn new(num_bits: usize, num_hashes: u32) -> Self {
        let num_bits = num_bits.max(8);
        Self {
            bits: vec![0u8; num_bits.div_ceil(8)],
            num_bits: num_bits as u64,
            num_hashes: num_hashes.max(1),
        }
    }

    /// Create a filter sized for an expected item count and target
    /// false-positive rate, using the standard bloom geometry.
    #[must_use]
    pub fn with_capacity(expected_items: usize, fp_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = fp_rate.clamp(1e-9, 0.5);
        let ln2 = std::f64::consts::LN_2;
        let m = (-n * p.ln() / (ln2 * ln2)).ceil() as usize;
        let k = ((m as f64 / n) * ln2).round().max(1.0) as u32;
        Self::new(m, k)
    }

    /// Record a URL
    pub fn insert(&mut self, url: &str) {
        for i in 0..self.num_hashes {
            let bit = self.bit_index(url, i);
            self.bits[bit / 8] |= 1 << (bit % 8);
        }
    }

    /// Probabilistic membership test: false positives possible, false
    /// negatives not.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        (0..self.num_hashes).all(|i| {
            let bit = self.bit_index(url, i);
            self.bits[bit / 8] & (1 << (bit % 8)) != 0
        })
    }

    /// Filter size in bits
    #[must_use]
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Number of hash probes per key
    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Serialize to the wire blob
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse from the wire blob
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    fn bit_index(&self, url: &str, hash_index: u32) -> usize {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&hash_index.to_be_bytes());
        hasher.update(url.as_bytes());
        let digest = hasher.finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest.as_bytes()[..8]);
        (u64::from_be_bytes(word) % self.num_bits) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_membership() {
        let mut digest = PageDigest::new();
        digest.insert("https://example.org/a");
        digest.insert("https://example.org/b");

        assert!(digest.contains("https://example.org/a"));
        assert!(!digest.contains("https://example.org/c"));
        assert_eq!(digest.len(), 2);
    }

    #[test]
    fn test_digest_blob_roundtrip() {
        let digest: PageDigest = ["x".to_string(), "y".to_string()].into_iter().collect();
        let parsed = PageDigest::from_bytes(&digest.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn test_bloom_no_false_negatives() {
        let mut bloom = BloomSummary::with_capacity(100, 0.01);
        let urls: Vec<String> = (0..100)
            .map(|i| format!("https://example.org/page/{i}"))
            .collect();
        for url in &urls {
            bloom.insert(url);
        }
        for url in &urls {
            assert!(bloom.contains(url));
        }
    }

    #[test]
    fn test_bloom_false_positive_rate_is_low() {
        let mut bloom = BloomSummary::with_capacity(100, 0.01);
        for i in 0..100 {
            bloom.insert(&format!("https://example.org/page/{i}"));
        }

        let false_positives = (0..1000)
            .filter(|i| bloom.contains(&format!("https://other.example/{i}")))
            .count();
        // Target rate is 1%; allow generous slack for hash variance.
        assert!(false_positives < 100, "{false_positives} false positives");
    }

    #[test]
    fn test_bloom_blob_roundtrip() {
        let mut bloom = BloomSummary::new(256, 3);
        bloom.insert("https://example.org/a");
        let parsed = BloomSummary::from_bytes(&bloom.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, bloom);
        assert!(parsed.contains("https://example.org/a"));
    }

    #[test]
    fn test_bloom_minimum_geometry() {
        let bloom = BloomSummary::new(0, 0);
        assert!(bloom.num_bits() >= 8);
        assert!(bloom.num_hashes() >= 1);
    }

    #[test]
    fn test_empty_bloom_contains_nothing_much() {
        let bloom = BloomSummary::new(1024, 4);
        assert!(!bloom.contains("https://example.org/a"));
    }
}
