//! Error types for asynchronous values

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::outcome::CancelReason;

/// Result type for operations on asynchronous values
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced when an asynchronous value is observed or settled
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The value settled with a failure
    #[error("failed: {0}")]
    Failed(Failure),

    /// The value was cancelled
    #[error("cancelled: {0}")]
    Cancelled(CancelReason),

    /// A strict transition was attempted on a value that already settled
    #[error("asynchronous value already settled")]
    AlreadyTerminal,
}

impl Error {
    /// Check if this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

/// Shareable cause of a failed asynchronous value.
///
/// Every continuation of a value observes the same failure, so the cause is
/// reference counted and cloning is cheap.
#[derive(Clone)]
pub struct Failure(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl Failure {
    /// Wrap an error as a failure cause
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Build a failure from a plain message
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Inspect the underlying error as a concrete type
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&self.0).finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);
