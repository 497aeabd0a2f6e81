//! Cluster manager - discovery, metadata fan-out and registry snapshots
//!
//! A refresh cycle runs entirely on asynchronous values:
//!
//! ```text
//! discovery.get_nodes()
//!     └─ transform ─► per-node metadata fetch (one value per node)
//!                         └─ reduce ─► NodeRegistry ─► atomic swap
//! ```
//!
//! Lookups read the current snapshot without locking and never wait on an
//! in-flight refresh. Per-node failures and cancellations are logged,
//! counted and left out of the new snapshot; only a discovery failure fails
//! the refresh itself.

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_core::{reduce, AsyncValue, Failure, Outcome, Partitions};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::config::ClusterConfig;
use crate::discovery::{ClusterDiscovery, DiscoveredClusterNode, MetadataFetcher};
use crate::error::{ClusterError, Result};
use crate::node::{NodeCapability, NodeMetadata, NodeRegistryEntry, METADATA_VERSION};
use crate::registry::NodeRegistry;

/// Online/offline counts of the current registry snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatistics {
    pub online_nodes: usize,
    pub offline_nodes: usize,
}

/// Registry snapshot tagged with the refresh cycle that built it
struct Snapshot {
    cycle: u64,
    registry: Arc<NodeRegistry>,
}

/// Owns the current registry snapshot and refreshes it from discovery
#[derive(Clone)]
pub struct ClusterManager {
    /// Source of cluster nodes
    discovery: Arc<dyn ClusterDiscovery>,

    /// Metadata this node advertises
    local: NodeMetadata,

    /// Per-node metadata fetch deadline
    metadata_timeout: Option<Duration>,

    /// Current snapshot; `None` until the first refresh completes
    current: Arc<ArcSwapOption<Snapshot>>,

    /// Refresh cycle counter
    cycles: Arc<AtomicU64>,
}

impl ClusterManager {
    /// Create a cluster manager over an existing discovery
    pub fn new(config: ClusterConfig, discovery: Arc<dyn ClusterDiscovery>) -> Result<Self> {
        config.validate()?;

        let local = NodeMetadata {
            version: METADATA_VERSION,
            id: config.node_id,
            tags: config.tags,
            capabilities: config.capabilities,
        };

        info!(
            node_id = %local.id,
            capabilities = ?local.capabilities,
            "cluster manager created"
        );

        Ok(Self {
            discovery,
            local,
            metadata_timeout: config.metadata_timeout,
            current: Arc::new(ArcSwapOption::empty()),
            cycles: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Create a cluster manager using the discovery named in `config`
    pub fn from_config(config: ClusterConfig, fetcher: Arc<dyn MetadataFetcher>) -> Result<Self> {
        let discovery = config.discovery.build(fetcher);
        Self::new(config, discovery)
    }

    /// Metadata this node advertises to its peers
    pub fn local_metadata(&self) -> &NodeMetadata {
        &self.local
    }

    /// Find a node advertising `capability` whose tags include `tags`.
    ///
    /// Returns [`ClusterError::NotReady`] until the first refresh completes,
    /// and `Ok(None)` when the current snapshot has no matching node.
    pub fn find_node(
        &self,
        tags: &HashMap<String, String>,
        capability: NodeCapability,
    ) -> Result<Option<NodeRegistryEntry>> {
        let current = self.current.load();
        match current.as_deref() {
            Some(snapshot) => Ok(snapshot.registry.find_entry(tags, capability).cloned()),
            None => Err(ClusterError::NotReady),
        }
    }

    /// The current registry snapshot, if one was installed
    pub fn registry(&self) -> Option<Arc<NodeRegistry>> {
        self.current
            .load()
            .as_deref()
            .map(|snapshot| Arc::clone(&snapshot.registry))
    }

    /// Online/offline counts of the current snapshot, if one was installed
    pub fn statistics(&self) -> Option<ClusterStatistics> {
        self.current
            .load()
            .as_deref()
            .map(|snapshot| ClusterStatistics {
                online_nodes: snapshot.registry.online_nodes(),
                offline_nodes: snapshot.registry.offline_nodes(),
            })
    }

    /// Run one refresh cycle.
    ///
    /// The returned value resolves once the new snapshot is installed and
    /// fails only if discovery itself fails, in which case the previous
    /// snapshot stays in place. Cancelling it cancels outstanding per-node
    /// fetches; nodes that already answered are still installed.
    ///
    /// Metadata timeouts are armed on the tokio runtime the caller runs on.
    /// Called outside of a runtime, fetches wait without a deadline.
    pub fn refresh(&self) -> AsyncValue<()> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        info!(cycle, "cluster refresh in progress");

        let current = Arc::clone(&self.current);
        let timeout = self.metadata_timeout;
        let runtime = Handle::try_current().ok();
        if timeout.is_some() && runtime.is_none() {
            warn!(cycle, "no tokio runtime; metadata timeout disabled for this refresh");
        }

        let refreshed = self.discovery.get_nodes().transform(move |discovered| {
            let fetches: Vec<AsyncValue<NodeRegistryEntry>> = discovered
                .into_iter()
                .map(|node| fetch_entry(node, timeout, runtime.as_ref()))
                .collect();

            Ok(reduce(fetches, move |partitions| {
                install(&current, cycle, partitions);
                Outcome::Resolved(())
            }))
        });

        refreshed.on_terminal(move |outcome| match outcome {
            Outcome::Resolved(()) => {}
            Outcome::Failed(cause) => error!(cycle, error = %cause, "cluster refresh failed"),
            Outcome::Cancelled(reason) => warn!(cycle, reason = %reason, "cluster refresh cancelled"),
        });

        refreshed
    }

    /// Run one refresh cycle and wait for it
    pub async fn refresh_now(&self) -> Result<()> {
        self.refresh().await.into_result().map_err(ClusterError::from)
    }
}

/// Fetch one node's metadata as a registry entry.
///
/// Failures are tagged with the node address so the reducer can report them.
fn fetch_entry(
    node: DiscoveredClusterNode,
    timeout: Option<Duration>,
    runtime: Option<&Handle>,
) -> AsyncValue<NodeRegistryEntry> {
    let address = node.address();
    let mut metadata = node.fetch_metadata();
    if let (Some(timeout), Some(runtime)) = (timeout, runtime) {
        metadata = metadata.with_timeout_on(timeout, Some(runtime));
    }

    let entry = AsyncValue::pending();
    let target = entry.clone();
    metadata.on_terminal(move |outcome| {
        match outcome {
            Outcome::Resolved(metadata) => target.resolve(NodeRegistryEntry::new(address, metadata)),
            Outcome::Failed(cause) => target.fail(Failure::new(ClusterError::MetadataFetch {
                node: address,
                cause,
            })),
            Outcome::Cancelled(reason) => target.cancel(reason),
        };
    });

    // A cancelled cycle stops the underlying fetch as well
    entry.propagate_cancel(&metadata);
    entry
}

/// Build the snapshot from a finished cycle and publish it
fn install(current: &ArcSwapOption<Snapshot>, cycle: u64, partitions: Partitions<NodeRegistryEntry>) {
    for error in &partitions.errors {
        error!(cycle, error = %error, "failed to refresh node metadata");
    }
    for reason in &partitions.cancellations {
        warn!(cycle, reason = %reason, "node metadata refresh cancelled");
    }

    let attempted = partitions.total();
    info!(
        cycle,
        nodes = partitions.successes.len(),
        attempted,
        failed = partitions.errors.len(),
        cancelled = partitions.cancellations.len(),
        "updated cluster registry"
    );

    let snapshot = Arc::new(Snapshot {
        cycle,
        registry: Arc::new(NodeRegistry::new(partitions.successes, attempted)),
    });

    // A slower, older cycle must not replace a newer snapshot
    let previous = current.rcu(|existing| match existing {
        Some(existing) if existing.cycle > cycle => Some(Arc::clone(existing)),
        _ => Some(Arc::clone(&snapshot)),
    });

    match previous {
        Some(existing) if existing.cycle > cycle => {
            debug!(cycle, installed = existing.cycle, "discarding stale registry snapshot");
        }
        _ => debug!(cycle, "installed registry snapshot"),
    }
}
