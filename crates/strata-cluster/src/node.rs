//! Node types and metadata

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::net::SocketAddr;
use uuid::Uuid;

/// Unique node identifier
pub type NodeId = Uuid;

/// Version of the node metadata format advertised by this build
pub const METADATA_VERSION: u32 = 1;

/// A feature a node advertises to routing layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCapability {
    /// Serves queries against stored data
    Read,
    /// Accepts writes
    Write,
}

impl NodeCapability {
    /// Capabilities advertised when none are configured
    pub fn defaults() -> BTreeSet<NodeCapability> {
        BTreeSet::from([NodeCapability::Read, NodeCapability::Write])
    }
}

impl fmt::Display for NodeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeCapability::Read => write!(f, "read"),
            NodeCapability::Write => write!(f, "write"),
        }
    }
}

/// Identity, capabilities and tags of a cluster node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Metadata format version
    pub version: u32,

    /// Unique node identifier
    pub id: NodeId,

    /// Custom metadata/tags (e.g. `site`, `dc`)
    pub tags: HashMap<String, String>,

    /// Advertised capabilities
    pub capabilities: BTreeSet<NodeCapability>,
}

impl NodeMetadata {
    /// Create metadata with default capabilities and no tags
    pub fn new(id: NodeId) -> Self {
        Self {
            version: METADATA_VERSION,
            id,
            tags: HashMap::new(),
            capabilities: NodeCapability::defaults(),
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Replace the capability set
    pub fn with_capabilities(
        mut self,
        capabilities: impl IntoIterator<Item = NodeCapability>,
    ) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    pub fn has_capability(&self, capability: NodeCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Check that every requested tag is present with the same value.
    ///
    /// Extra tags on the node are allowed.
    pub fn matches_tags(&self, tags: &HashMap<String, String>) -> bool {
        tags.iter()
            .all(|(key, value)| self.tags.get(key) == Some(value))
    }

    /// Check both the capability and the tag filter
    pub fn matches(&self, tags: &HashMap<String, String>, capability: NodeCapability) -> bool {
        self.has_capability(capability) && self.matches_tags(tags)
    }
}

/// A node bound to the metadata of its most recent successful fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRegistryEntry {
    /// Address the node was discovered at
    pub address: SocketAddr,

    /// Metadata reported by the node
    pub metadata: NodeMetadata,
}

impl NodeRegistryEntry {
    pub fn new(address: SocketAddr, metadata: NodeMetadata) -> Self {
        Self { address, metadata }
    }

    /// Get node ID
    pub fn id(&self) -> NodeId {
        self.metadata.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_capabilities() {
        let meta = NodeMetadata::new(Uuid::new_v4());
        assert!(meta.has_capability(NodeCapability::Read));
        assert!(meta.has_capability(NodeCapability::Write));
        assert_eq!(meta.version, METADATA_VERSION);
        assert!(meta.tags.is_empty());
    }

    #[test]
    fn test_tag_superset_matching() {
        let meta = NodeMetadata::new(Uuid::new_v4())
            .with_tag("dc", "us")
            .with_tag("role", "ingest");

        assert!(meta.matches_tags(&tags(&[])));
        assert!(meta.matches_tags(&tags(&[("dc", "us")])));
        assert!(meta.matches_tags(&tags(&[("dc", "us"), ("role", "ingest")])));
        assert!(!meta.matches_tags(&tags(&[("dc", "eu")])));
        assert!(!meta.matches_tags(&tags(&[("dc", "us"), ("rack", "a")])));
    }

    #[test]
    fn test_matches_requires_capability() {
        let meta = NodeMetadata::new(Uuid::new_v4())
            .with_tag("dc", "us")
            .with_capabilities([NodeCapability::Write]);

        assert!(meta.matches(&tags(&[("dc", "us")]), NodeCapability::Write));
        assert!(!meta.matches(&tags(&[("dc", "us")]), NodeCapability::Read));
    }

    #[test]
    fn test_capability_serialization() {
        let json = serde_json::to_string(&NodeCapability::Write).unwrap();
        assert_eq!(json, "\"write\"");
        let back: NodeCapability = serde_json::from_str("\"read\"").unwrap();
        assert_eq!(back, NodeCapability::Read);
        assert_eq!(NodeCapability::Read.to_string(), "read");
    }

    #[test]
    fn test_entry_id() {
        let id = Uuid::new_v4();
        let entry = NodeRegistryEntry::new("127.0.0.1:1394".parse().unwrap(), NodeMetadata::new(id));
        assert_eq!(entry.id(), id);
    }
}
