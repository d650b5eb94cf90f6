//! Coalescence engine lifecycle.
//!
//! The engine moves through `IDLE -> INITIALIZING -> INITIALIZED`,
//! fetching one summary per discovered peer and installing the survivors
//! wholesale. Cancellation is cooperative: `reset` flips the state flags
//! and bumps a generation stamp, and in-flight work discards its own
//! result when it notices the stamp moved - nothing is aborted at the
//! transport level.
//!
//! Every engine is an explicit, independently constructed instance; there
//! is no process-wide state.

use crate::discovery::{PeerDescriptor, ServiceDiscovery};
use crate::error::CoalesceError;
use crate::fanout::{PeerSummary, fetch_all};
use crate::strategy::CoalescenceStrategy;
use pagemesh_peer::Connector;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Lifecycle flags plus the cancellation stamp
#[derive(Debug, Default)]
struct Lifecycle {
    initializing: bool,
    initialized: bool,
    generation: u64,
}

/// Answer for one queried URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMatch {
    /// The queried URL
    pub url: String,
    /// Peers whose summary claims the URL is cached, completion order
    pub peers: Vec<PeerDescriptor>,
}

/// Coalescence engine over one discovery source, one connector, and one
/// strategy.
pub struct CoalescenceEngine<D, S, N>
where
    D: ServiceDiscovery,
    S: CoalescenceStrategy,
    N: Connector,
{
    discovery: D,
    strategy: Arc<S>,
    connector: Arc<N>,
    lifecycle: Mutex<Lifecycle>,
    summaries: RwLock<Vec<PeerSummary<S::Summary>>>,
}

impl<D, S, N> CoalescenceEngine<D, S, N>
where
    D: ServiceDiscovery,
    S: CoalescenceStrategy,
    N: Connector,
{
    /// Create an idle engine
    #[must_use]
    pub fn new(discovery: D, strategy: S, connector: Arc<N>) -> Self {
        Self {
            discovery,
            strategy: Arc::new(strategy),
            connector,
            lifecycle: Mutex::new(Lifecycle::default()),
            summaries: RwLock::new(Vec::new()),
        }
    }

    /// Discover peers and fetch one summary from each.
    ///
    /// At most one initialization is ever in flight: if one is running or
    /// has completed, this resolves immediately and concurrent callers
    /// share the running call's effect. All per-peer attempts are awaited
    /// to settlement; failures are excluded, not fatal. Only a failed
    /// discovery fails the call, since then no peers are known.
    ///
    /// A `reset` racing this call wins: the stale continuation notices the
    /// bumped generation and resolves without installing anything.
    pub async fn initialize(&self) -> Result<(), CoalesceError> {
        let generation = {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.initializing || lifecycle.initialized {
                tracing::debug!("initialization already in flight or complete");
                return Ok(());
            }
            lifecycle.initializing = true;
            lifecycle.generation
        };

        let peers = match self.discovery.discover().await {
            Ok(peers) => peers,
            Err(err) => {
                tracing::warn!(error = %err, "discovery failed, initialization aborted");
                let mut lifecycle = self.lifecycle.lock().await;
                if lifecycle.generation == generation {
                    lifecycle.initializing = false;
                }
                return Err(err.into());
            }
        };

        if self.cancelled(generation).await {
            tracing::debug!("initialization reset during discovery, result discarded");
            return Ok(());
        }

        tracing::debug!(peers = peers.len(), "fetching peer summaries");
        let summaries = fetch_all(
            peers,
            Arc::clone(&self.connector),
            Arc::clone(&self.strategy),
        )
        .await;

        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.generation != generation {
            tracing::debug!(
                discarded = summaries.len(),
                "initialization reset during fetch, result discarded"
            );
            return Ok(());
        }

        let installed = summaries.len();
        *self.summaries.write().await = summaries;
        lifecycle.initializing = false;
        lifecycle.initialized = true;
        tracing::info!(peers = installed, "coalescence initialized");
        Ok(())
    }

    /// Drop all state: flags cleared, summaries emptied, in-flight
    /// initializations orphaned. Safe anytime, idempotent.
    pub async fn reset(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.initializing = false;
        lifecycle.initialized = false;
        lifecycle.generation = lifecycle.generation.wrapping_add(1);
        self.summaries.write().await.clear();
        tracing::debug!("coalescence reset");
    }

    /// Reset, then initialize: always redoes the fetch, even when already
    /// initialized.
    pub async fn refresh(&self) -> Result<(), CoalesceError> {
        self.reset().await;
        self.initialize().await
    }

    /// Map the installed summaries against the requested URLs.
    ///
    /// Each input URL gets an answer listing the peers whose summary
    /// claims it; with nothing installed every answer is empty.
    pub async fn query(&self, urls: &[String]) -> Vec<UrlMatch> {
        let summaries = self.summaries.read().await;
        urls.iter()
            .map(|url| UrlMatch {
                url: url.clone(),
                peers: summaries
                    .iter()
                    .filter(|entry| self.strategy.matches(&entry.summary, url))
                    .map(|entry| entry.peer.clone())
                    .collect(),
            })
            .collect()
    }

    /// Whether an initialization is currently in flight
    pub async fn is_initializing(&self) -> bool {
        self.lifecycle.lock().await.initializing
    }

    /// Whether the engine holds an installed summary collection
    pub async fn is_initialized(&self) -> bool {
        self.lifecycle.lock().await.initialized
    }

    /// Number of installed peer summaries
    pub async fn summary_count(&self) -> usize {
        self.summaries.read().await.len()
    }

    async fn cancelled(&self, generation: u64) -> bool {
        self.lifecycle.lock().await.generation != generation
    }
}
