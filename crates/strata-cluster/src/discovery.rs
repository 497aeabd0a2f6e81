//! Cluster discovery boundary
//!
//! Discovery produces the set of currently reachable nodes; each discovered
//! node carries an [`AsyncValue`] that settles with that node's metadata.
//! The mechanism behind it (static list, multicast, service registry) is
//! pluggable through [`ClusterDiscovery`], and the wire protocol used to
//! fetch metadata is pluggable through [`MetadataFetcher`].

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use strata_core::AsyncValue;
use tracing::debug;

use crate::node::NodeMetadata;

/// A node returned by discovery, with its metadata fetch in flight
#[derive(Debug, Clone)]
pub struct DiscoveredClusterNode {
    address: SocketAddr,
    metadata: AsyncValue<NodeMetadata>,
}

impl DiscoveredClusterNode {
    pub fn new(address: SocketAddr, metadata: AsyncValue<NodeMetadata>) -> Self {
        Self { address, metadata }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Handle on the node's metadata fetch
    pub fn fetch_metadata(&self) -> AsyncValue<NodeMetadata> {
        self.metadata.clone()
    }
}

/// Source of the currently discoverable cluster nodes.
///
/// Implementations may fail (discovery mechanism down) or resolve with zero
/// or more nodes, and must not return the same address twice in one call.
pub trait ClusterDiscovery: Send + Sync {
    fn get_nodes(&self) -> AsyncValue<Vec<DiscoveredClusterNode>>;
}

/// Retrieves the metadata a remote node advertises.
///
/// Results are untrusted; failures are isolated per node.
pub trait MetadataFetcher: Send + Sync {
    fn fetch(&self, address: SocketAddr) -> AsyncValue<NodeMetadata>;
}

/// Discovery over a fixed list of node addresses
pub struct StaticDiscovery {
    nodes: Vec<SocketAddr>,
    fetcher: Arc<dyn MetadataFetcher>,
}

impl StaticDiscovery {
    /// Create a static discovery. Repeated addresses are collapsed.
    pub fn new(nodes: impl IntoIterator<Item = SocketAddr>, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        let mut seen = HashSet::new();
        let nodes = nodes.into_iter().filter(|addr| seen.insert(*addr)).collect();
        Self { nodes, fetcher }
    }

    pub fn nodes(&self) -> &[SocketAddr] {
        &self.nodes
    }
}

impl fmt::Debug for StaticDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticDiscovery")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

impl ClusterDiscovery for StaticDiscovery {
    fn get_nodes(&self) -> AsyncValue<Vec<DiscoveredClusterNode>> {
        debug!(nodes = self.nodes.len(), "discovering static cluster nodes");
        let discovered = self
            .nodes
            .iter()
            .map(|&address| DiscoveredClusterNode::new(address, self.fetcher.fetch(address)))
            .collect();
        AsyncValue::resolved(discovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{Failure, Outcome};
    use uuid::Uuid;

    struct PortFetcher;

    impl MetadataFetcher for PortFetcher {
        fn fetch(&self, address: SocketAddr) -> AsyncValue<NodeMetadata> {
            if address.port() == 0 {
                return AsyncValue::failed(Failure::msg("port 0 is not reachable"));
            }
            AsyncValue::resolved(
                NodeMetadata::new(Uuid::new_v4()).with_tag("port", address.port().to_string()),
            )
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_static_discovery_collapses_duplicates() {
        let discovery = StaticDiscovery::new(
            vec![addr(1), addr(2), addr(1), addr(3)],
            Arc::new(PortFetcher),
        );
        assert_eq!(discovery.nodes(), &[addr(1), addr(2), addr(3)]);
    }

    #[test]
    fn test_static_discovery_starts_fetches() {
        let discovery = StaticDiscovery::new(vec![addr(7), addr(0)], Arc::new(PortFetcher));

        let nodes = discovery.get_nodes().outcome().and_then(Outcome::ok).unwrap();
        assert_eq!(nodes.len(), 2);

        let ok = nodes[0].fetch_metadata().outcome().and_then(Outcome::ok).unwrap();
        assert_eq!(nodes[0].address(), addr(7));
        assert_eq!(ok.tags.get("port").map(String::as_str), Some("7"));

        assert!(nodes[1].fetch_metadata().outcome().map_or(false, |o| o.is_failed()));
    }

    #[test]
    fn test_empty_static_list() {
        let discovery = StaticDiscovery::new(Vec::new(), Arc::new(PortFetcher));
        let nodes = discovery.get_nodes().outcome().and_then(Outcome::ok).unwrap();
        assert!(nodes.is_empty());
    }
}
