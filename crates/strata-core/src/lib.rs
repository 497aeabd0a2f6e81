//! # Strata Core
//!
//! Asynchronous composition primitives shared by the Strata services:
//!
//! - [`AsyncValue`]: single-assignment future with resolved, failed and
//!   cancelled outcomes, continuations and deferred chaining
//! - [`reduce`]: fan-out join that tolerates partial failure and hands the
//!   partitioned outcomes to a reducer exactly once
//!
//! ## Example
//!
//! ```rust
//! use strata_core::{reduce, AsyncValue, Failure, Outcome};
//!
//! let inputs = vec![
//!     AsyncValue::resolved(2u32),
//!     AsyncValue::failed(Failure::msg("node unreachable")),
//!     AsyncValue::resolved(3u32),
//! ];
//!
//! let total = reduce(inputs, |p| Outcome::Resolved(p.successes.iter().sum::<u32>()));
//! assert_eq!(total.outcome().and_then(Outcome::ok), Some(5));
//! ```

pub mod error;
pub mod outcome;
pub mod reduce;
pub mod value;

pub use error::{Error, Failure, Result};
pub use outcome::{CancelKind, CancelReason, Outcome};
pub use reduce::{reduce, Partitions};
pub use value::AsyncValue;
