//! Cluster configuration

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::discovery::{ClusterDiscovery, MetadataFetcher, StaticDiscovery};
use crate::error::{ClusterError, Result};
use crate::node::{NodeCapability, NodeId};

/// How cluster nodes are discovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DiscoveryConfig {
    /// Fixed list of node addresses
    Static { nodes: Vec<SocketAddr> },
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig::Static { nodes: vec![] }
    }
}

impl DiscoveryConfig {
    /// Build the configured discovery, fetching metadata with `fetcher`
    pub fn build(&self, fetcher: Arc<dyn MetadataFetcher>) -> Arc<dyn ClusterDiscovery> {
        match self {
            DiscoveryConfig::Static { nodes } => {
                Arc::new(StaticDiscovery::new(nodes.iter().copied(), fetcher))
            }
        }
    }
}

/// Cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Identity of the local node
    pub node_id: NodeId,

    /// Tags advertised by the local node (must not be empty)
    pub tags: HashMap<String, String>,

    /// Capabilities advertised by the local node
    pub capabilities: BTreeSet<NodeCapability>,

    /// Node discovery
    pub discovery: DiscoveryConfig,

    /// Deadline for a single node's metadata fetch; expired fetches are
    /// cancelled, not failed
    pub metadata_timeout: Option<Duration>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_id: Uuid::new_v4(),
            tags: HashMap::new(),
            capabilities: NodeCapability::defaults(),
            discovery: DiscoveryConfig::default(),
            metadata_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl ClusterConfig {
    /// Create cluster configuration builder
    pub fn builder() -> ClusterConfigBuilder {
        ClusterConfigBuilder::new()
    }

    /// Check the configuration, naming the offending field
    pub fn validate(&self) -> Result<()> {
        if self.tags.is_empty() {
            return Err(ClusterError::InvalidConfig(
                "tags: at least one tag is required".to_string(),
            ));
        }
        if self.tags.keys().any(|key| key.is_empty()) {
            return Err(ClusterError::InvalidConfig(
                "tags: keys must not be empty".to_string(),
            ));
        }
        if self.capabilities.is_empty() {
            return Err(ClusterError::InvalidConfig(
                "capabilities: at least one capability is required".to_string(),
            ));
        }
        if self.metadata_timeout == Some(Duration::ZERO) {
            return Err(ClusterError::InvalidConfig(
                "metadata_timeout: must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for cluster configuration
#[derive(Debug, Default)]
pub struct ClusterConfigBuilder {
    node_id: Option<NodeId>,
    tags: HashMap<String, String>,
    capabilities: Option<BTreeSet<NodeCapability>>,
    discovery: Option<DiscoveryConfig>,
    metadata_timeout: Option<Option<Duration>>,
}

impl ClusterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_id(mut self, id: NodeId) -> Self {
        self.node_id = Some(id);
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = NodeCapability>) -> Self {
        self.capabilities = Some(capabilities.into_iter().collect());
        self
    }

    pub fn discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Shorthand for static discovery over `nodes`
    pub fn static_nodes(self, nodes: Vec<SocketAddr>) -> Self {
        self.discovery(DiscoveryConfig::Static { nodes })
    }

    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = Some(Some(timeout));
        self
    }

    /// Wait for metadata fetches without a deadline
    pub fn no_metadata_timeout(mut self) -> Self {
        self.metadata_timeout = Some(None);
        self
    }

    pub fn build(self) -> ClusterConfig {
        let defaults = ClusterConfig::default();
        ClusterConfig {
            node_id: self.node_id.unwrap_or(defaults.node_id),
            tags: self.tags,
            capabilities: self.capabilities.unwrap_or(defaults.capabilities),
            discovery: self.discovery.unwrap_or(defaults.discovery),
            metadata_timeout: self.metadata_timeout.unwrap_or(defaults.metadata_timeout),
        }
    }
}
