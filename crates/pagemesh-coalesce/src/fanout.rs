//! Per-peer fetch fan-out.
//!
//! One fetch per peer, all running concurrently; the batch resolves once
//! every attempt has settled. Individual failures are logged and
//! excluded, never placeholders and never fatal for the batch - this is
//! what makes the engine tolerant of any subset of peers being
//! unreachable. Results arrive in completion order; no ordering is
//! guaranteed or required across peers.

use crate::discovery::PeerDescriptor;
use crate::strategy::CoalescenceStrategy;
use pagemesh_peer::{Connector, PeerAccessor};
use std::sync::Arc;
use tokio::task::JoinSet;

/// One peer's successfully fetched summary
#[derive(Debug, Clone)]
pub struct PeerSummary<T> {
    /// The peer the summary came from
    pub peer: PeerDescriptor,
    /// The parsed summary
    pub summary: T,
}

/// Fetch one summary from every peer concurrently.
///
/// An empty peer list resolves immediately with no network activity.
pub async fn fetch_all<S, N>(
    peers: Vec<PeerDescriptor>,
    connector: Arc<N>,
    strategy: Arc<S>,
) -> Vec<PeerSummary<S::Summary>>
where
    S: CoalescenceStrategy,
    N: Connector,
{
    if peers.is_empty() {
        return Vec::new();
    }

    let total = peers.len();
    let mut attempts = JoinSet::new();
    for peer in peers {
        let connector = Arc::clone(&connector);
        let strategy = Arc::clone(&strategy);
        attempts.spawn(async move {
            let accessor = PeerAccessor::new(connector, peer.ip_address, peer.port);
            match strategy.fetch(&accessor).await {
                Ok(summary) => Some(PeerSummary { peer, summary }),
                Err(err) => {
                    tracing::warn!(peer = %peer.addr(), error = %err, "peer fetch failed, excluding");
                    None
                }
            }
        });
    }

    let mut summaries = Vec::new();
    while let Some(settled) = attempts.join_next().await {
        match settled {
            Ok(Some(summary)) => summaries.push(summary),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "peer fetch task failed"),
        }
    }

    tracing::debug!(fetched = summaries.len(), total, "peer fan-out settled");
    summaries
}
