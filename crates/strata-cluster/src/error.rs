//! Cluster error types

use std::net::SocketAddr;
use strata_core::{CancelReason, Failure};
use thiserror::Error;

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Cluster errors
#[derive(Debug, Clone, Error)]
pub enum ClusterError {
    // ==================== Configuration Errors ====================
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ==================== Registry Errors ====================
    /// No registry snapshot has been installed yet
    #[error("cluster registry not ready")]
    NotReady,

    // ==================== Discovery Errors ====================
    #[error("cluster discovery failed: {0}")]
    Discovery(Failure),

    #[error("metadata fetch failed for {node}: {cause}")]
    MetadataFetch { node: SocketAddr, cause: Failure },

    // ==================== Async Errors ====================
    #[error("cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ClusterError {
    /// Check if the caller may retry later.
    ///
    /// Routing layers treat these the same as "no matching node" but should
    /// report them differently.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ClusterError::NotReady | ClusterError::Discovery(_) | ClusterError::Cancelled(_)
        )
    }
}

/// Maps the outcome of a refresh cycle. A failed refresh always means
/// discovery failed, whatever error type the discovery reported.
impl From<strata_core::Error> for ClusterError {
    fn from(err: strata_core::Error) -> Self {
        match err {
            strata_core::Error::Failed(failure) => ClusterError::Discovery(failure),
            strata_core::Error::Cancelled(reason) => ClusterError::Cancelled(reason),
            strata_core::Error::AlreadyTerminal => {
                ClusterError::Internal("asynchronous value settled twice".to_string())
            }
        }
    }
}
