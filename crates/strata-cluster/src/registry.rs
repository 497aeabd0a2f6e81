//! NodeRegistry: immutable snapshot of the known cluster nodes.
//!
//! A registry is built once per completed refresh cycle and never mutated.
//! The next cycle supersedes it with a fresh snapshot.

use std::collections::HashMap;

use crate::node::{NodeCapability, NodeRegistryEntry};

/// Point-in-time view of cluster nodes and their metadata.
///
/// Entries are ordered by address so that two snapshots built from the same
/// discovery result compare equal regardless of fetch completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRegistry {
    entries: Vec<NodeRegistryEntry>,
    total_nodes: usize,
}

impl NodeRegistry {
    /// Build a registry from the nodes that answered out of `total_nodes`
    /// attempted.
    pub fn new(mut entries: Vec<NodeRegistryEntry>, total_nodes: usize) -> Self {
        entries.sort_by_key(|e| e.address);
        let total_nodes = total_nodes.max(entries.len());
        Self {
            entries,
            total_nodes,
        }
    }

    /// First entry advertising `capability` whose tags are a superset of
    /// `tags`.
    ///
    /// Linear scan; the registry is bounded by the live cluster size.
    pub fn find_entry(
        &self,
        tags: &HashMap<String, String>,
        capability: NodeCapability,
    ) -> Option<&NodeRegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.metadata.matches(tags, capability))
    }

    /// All entries matching the filter, in registry order
    pub fn find_entries<'a>(
        &'a self,
        tags: &'a HashMap<String, String>,
        capability: NodeCapability,
    ) -> impl Iterator<Item = &'a NodeRegistryEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.metadata.matches(tags, capability))
    }

    pub fn entries(&self) -> &[NodeRegistryEntry] {
        &self.entries
    }

    /// Nodes present in this snapshot
    pub fn online_nodes(&self) -> usize {
        self.entries.len()
    }

    /// Nodes attempted in this cycle that did not make it into the snapshot
    pub fn offline_nodes(&self) -> usize {
        self.total_nodes - self.entries.len()
    }

    /// Nodes attempted in the cycle that built this snapshot
    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
