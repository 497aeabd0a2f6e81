//! Terminal outcomes and cancellation reasons

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Failure, Result};

/// Why an asynchronous value was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelKind {
    /// Cancelled explicitly by a caller
    User,
    /// A value this one depends on was cancelled
    Upstream,
    /// A deadline passed before the value settled
    Timeout,
    /// The owning component is shutting down
    Shutdown,
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelKind::User => write!(f, "user"),
            CancelKind::Upstream => write!(f, "upstream"),
            CancelKind::Timeout => write!(f, "timeout"),
            CancelKind::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Tagged explanation for an intentional non-completion.
///
/// Distinct from a [`Failure`]: cancellation is never exceptional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason {
    kind: CancelKind,
    message: Option<String>,
}

impl CancelReason {
    /// Create a reason of the given kind with a message
    pub fn new(kind: CancelKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    /// Caller-initiated cancellation
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(CancelKind::User, message)
    }

    /// Cancellation inherited from another value
    pub fn upstream(cause: &CancelReason) -> Self {
        Self::new(CancelKind::Upstream, cause.to_string())
    }

    /// Deadline expiry
    pub fn timeout(after: Duration) -> Self {
        Self::new(CancelKind::Timeout, format!("no result after {after:?}"))
    }

    /// Shutdown of the owning component
    pub fn shutdown() -> Self {
        Self {
            kind: CancelKind::Shutdown,
            message: None,
        }
    }

    pub fn kind(&self) -> CancelKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.kind, message),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Terminal state of an asynchronous value
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Resolved(T),
    Failed(Failure),
    Cancelled(CancelReason),
}

impl<T> Outcome<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled(_))
    }

    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Resolved(_) => "resolved",
            Outcome::Failed(_) => "failed",
            Outcome::Cancelled(_) => "cancelled",
        }
    }

    /// The resolved value, if any
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Resolved(value) => Outcome::Resolved(f(value)),
            Outcome::Failed(failure) => Outcome::Failed(failure),
            Outcome::Cancelled(reason) => Outcome::Cancelled(reason),
        }
    }

    /// Convert to a standard result, folding cancellation into the error side
    pub fn into_result(self) -> Result<T> {
        match self {
            Outcome::Resolved(value) => Ok(value),
            Outcome::Failed(failure) => Err(Error::Failed(failure)),
            Outcome::Cancelled(reason) => Err(Error::Cancelled(reason)),
        }
    }
}

impl<T> From<std::result::Result<T, Failure>> for Outcome<T> {
    fn from(result: std::result::Result<T, Failure>) -> Self {
        match result {
            Ok(value) => Outcome::Resolved(value),
            Err(failure) => Outcome::Failed(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_reason_display() {
        assert_eq!(CancelReason::shutdown().to_string(), "shutdown");
        assert_eq!(
            CancelReason::user("operator request").to_string(),
            "user: operator request"
        );

        let inherited = CancelReason::upstream(&CancelReason::shutdown());
        assert_eq!(inherited.kind(), CancelKind::Upstream);
        assert_eq!(inherited.message(), Some("shutdown"));
    }

    #[test]
    fn test_timeout_reason() {
        let reason = CancelReason::timeout(Duration::from_millis(250));
        assert_eq!(reason.kind(), CancelKind::Timeout);
        assert!(reason.to_string().contains("250ms"));
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(Outcome::Resolved(7).into_result().unwrap(), 7);

        let failed: Outcome<u32> = Outcome::Failed(Failure::msg("boom"));
        assert!(matches!(failed.into_result(), Err(Error::Failed(_))));

        let cancelled: Outcome<u32> = Outcome::Cancelled(CancelReason::shutdown());
        let err = cancelled.into_result().unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_outcome_from_result() {
        let outcome: Outcome<&str> = Ok("ready").into();
        assert!(outcome.is_resolved());
        assert_eq!(outcome.kind(), "resolved");

        let outcome: Outcome<&str> = Err(Failure::msg("nope")).into();
        assert!(outcome.is_failed());
        assert_eq!(outcome.map(str::len).kind(), "failed");
    }
}
