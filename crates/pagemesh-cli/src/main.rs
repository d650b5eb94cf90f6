//! Pagemesh CLI
//!
//! Peer-to-peer page cache demonstration and tooling.

mod config;

use clap::{Parser, Subcommand};
use config::{Config, StrategyKind};
use pagemesh_coalesce::{
    BloomStrategy, CoalescenceEngine, CoalescenceStrategy, DigestStrategy, PeerDescriptor,
    StaticDiscovery,
};
use pagemesh_core::PushConfig;
use pagemesh_peer::{
    BloomSummary, CacheService, MemoryConnector, MemoryNetwork, MemoryStore, PageDigest,
    PeerAccessor,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// Pagemesh - peer-to-peer page cache over the local network
#[derive(Parser)]
#[command(name = "pagemesh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an in-process mesh of cache nodes and query it end to end
    Demo {
        /// Number of cache nodes to spin up
        #[arg(long, default_value_t = 3)]
        peers: usize,

        /// Pages seeded into each node's cache
        #[arg(long, default_value_t = 4)]
        pages: usize,

        /// Coalescence strategy (overrides the config file)
        #[arg(long)]
        strategy: Option<StrategyKind>,
    },

    /// Build a cache-presence summary for a set of URLs and print it
    Summary {
        /// Summary form to build
        #[arg(long, default_value = "digest")]
        strategy: StrategyKind,

        /// URLs to record
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose { "debug" } else { "info" })
        .init();

    let config = Config::load_or_default(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Demo {
            peers,
            pages,
            strategy,
        } => {
            let strategy = strategy.unwrap_or(config.mesh.strategy);
            run_demo(peers, pages, strategy, &config).await?;
        }
        Commands::Summary { strategy, urls } => {
            print_summary(strategy, &urls)?;
        }
    }

    Ok(())
}

/// Base port for demo nodes
const DEMO_BASE_PORT: u16 = 4700;

/// Spin up an in-process mesh, coalesce it, query it, and fetch one page.
async fn run_demo(
    peers: usize,
    pages: usize,
    strategy: StrategyKind,
    config: &Config,
) -> anyhow::Result<()> {
    anyhow::ensure!(peers > 0, "demo needs at least one peer");
    tracing::info!(peers, pages, ?strategy, "starting loopback demo");

    let network = MemoryNetwork::new();
    let push = PushConfig {
        chunk_size: config.transfer.chunk_size,
        full_threshold: config.transfer.full_threshold,
        low_threshold: config.transfer.low_threshold,
    };

    let mut descriptors = Vec::new();
    let shared_url = "https://shared.mesh/index".to_string();
    for node in 0..peers {
        let store = MemoryStore::new();
        for page in 0..pages {
            store.insert(
                format!("https://node{node}.mesh/doc/{page}"),
                format!("body of document {page} cached by node {node}").into_bytes(),
            );
        }
        // The shared page lives on every other node so queries show overlap.
        if node % 2 == 0 {
            store.insert(shared_url.clone(), b"the shared index page".to_vec());
        }

        let port = DEMO_BASE_PORT + node as u16;
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        network.bind(
            addr,
            Arc::new(CacheService::with_config(Arc::new(store), push.clone())),
        );
        descriptors.push(PeerDescriptor {
            ip_address: addr.ip(),
            port,
            service_name: config.mesh.service_name.clone(),
        });
    }

    let queries = vec![
        shared_url.clone(),
        "https://node0.mesh/doc/0".to_string(),
        "https://nowhere.mesh/absent".to_string(),
    ];

    let connector = Arc::new(MemoryConnector::new(network));
    match strategy {
        StrategyKind::Digest => {
            coalesce_and_fetch(descriptors, DigestStrategy, connector, &queries, &shared_url).await
        }
        StrategyKind::Bloom => {
            coalesce_and_fetch(descriptors, BloomStrategy, connector, &queries, &shared_url).await
        }
    }
}

async fn coalesce_and_fetch<S: CoalescenceStrategy>(
    descriptors: Vec<PeerDescriptor>,
    strategy: S,
    connector: Arc<MemoryConnector>,
    queries: &[String],
    fetch_url: &str,
) -> anyhow::Result<()> {
    let engine = CoalescenceEngine::new(
        StaticDiscovery::new(descriptors),
        strategy,
        Arc::clone(&connector),
    );

    engine.initialize().await?;
    println!(
        "mesh coalesced: {} peer summaries installed",
        engine.summary_count().await
    );

    let mut fetch_from = None;
    for answer in engine.query(queries).await {
        println!("  {} -> {} peer(s)", answer.url, answer.peers.len());
        if answer.url == fetch_url {
            fetch_from = answer.peers.first().cloned();
        }
    }

    if let Some(peer) = fetch_from {
        let accessor = PeerAccessor::new(connector, peer.ip_address, peer.port);
        let body = accessor.fetch_page(fetch_url).await?;
        println!(
            "fetched {} ({} bytes) from {}",
            fetch_url,
            body.len(),
            peer.addr()
        );
    } else {
        println!("no peer claims {fetch_url}");
    }

    Ok(())
}

/// Build the requested summary over the URLs and print its footprint.
fn print_summary(strategy: StrategyKind, urls: &[String]) -> anyhow::Result<()> {
    match strategy {
        StrategyKind::Digest => {
            let digest: PageDigest = urls.iter().cloned().collect();
            let blob = digest.to_bytes()?;
            println!("digest: {} urls, {} blob bytes", digest.len(), blob.len());
        }
        StrategyKind::Bloom => {
            let mut bloom = BloomSummary::with_capacity(urls.len(), 0.01);
            for url in urls {
                bloom.insert(url);
            }
            let blob = bloom.to_bytes()?;
            println!(
                "bloom: {} bits, {} hashes, {} blob bytes",
                bloom.num_bits(),
                bloom.num_hashes(),
                blob.len()
            );
        }
    }
    Ok(())
}
