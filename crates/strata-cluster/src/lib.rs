//! # Strata Cluster
//!
//! Cluster membership for Strata nodes with:
//! - **Discovery**: pluggable source of reachable nodes (static seed list built in)
//! - **Metadata fan-out**: one asynchronous metadata fetch per discovered node
//! - **Registry snapshots**: immutable node registry swapped in atomically
//! - **Capability routing**: lock-free lookups by capability and tags
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ClusterManager                         │
//! ├──────────────┬──────────────┬───────────────────────────────┤
//! │  Discovery   │   Fan-out    │        Registry               │
//! ├──────────────┼──────────────┼───────────────────────────────┤
//! │ • Static     │ • Per-node   │ • Immutable snapshot          │
//! │ • Pluggable  │   fetches    │ • Atomic swap per cycle       │
//! │   trait      │ • Timeouts   │ • find_node(tags, capability) │
//! │              │ • Partial    │ • Online/offline statistics   │
//! │              │   failure    │                               │
//! └──────────────┴──────────────┴───────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use strata_cluster::{ClusterConfig, ClusterManager, NodeCapability};
//!
//! let config = ClusterConfig::builder()
//!     .tag("site", "ams")
//!     .static_nodes(vec!["10.0.0.1:1394".parse()?, "10.0.0.2:1394".parse()?])
//!     .build();
//! let manager = ClusterManager::from_config(config, fetcher)?;
//!
//! // Run one refresh cycle (normally triggered by a scheduler)
//! manager.refresh_now().await?;
//!
//! let writer = manager.find_node(&HashMap::new(), NodeCapability::Write)?;
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod node;
pub mod registry;

// Re-export main types
pub use config::{ClusterConfig, ClusterConfigBuilder, DiscoveryConfig};
pub use discovery::{ClusterDiscovery, DiscoveredClusterNode, MetadataFetcher, StaticDiscovery};
pub use error::{ClusterError, Result};
pub use manager::{ClusterManager, ClusterStatistics};
pub use node::{NodeCapability, NodeId, NodeMetadata, NodeRegistryEntry, METADATA_VERSION};
pub use registry::NodeRegistry;

/// Commonly used types
pub mod prelude {
    pub use crate::config::ClusterConfig;
    pub use crate::discovery::{ClusterDiscovery, DiscoveredClusterNode, MetadataFetcher};
    pub use crate::error::{ClusterError, Result};
    pub use crate::manager::ClusterManager;
    pub use crate::node::{NodeCapability, NodeMetadata, NodeRegistryEntry};
    pub use strata_core::{AsyncValue, Failure, Outcome};
}
