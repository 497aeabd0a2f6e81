//! Fan-out join over independently running asynchronous values
//!
//! [`reduce`] waits for every input to settle (join, not race) and hands the
//! outcomes to a reducer body partitioned into successes, failures and
//! cancellations. Failed or cancelled inputs do not fail the aggregate; the
//! body decides what ratio of bad outcomes it tolerates.

use parking_lot::Mutex;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::Failure;
use crate::outcome::{CancelReason, Outcome};
use crate::value::AsyncValue;

/// Settled inputs of a fan-out join, grouped by outcome.
///
/// Order within each partition follows completion order, not input order.
#[derive(Debug, Clone)]
pub struct Partitions<T> {
    pub successes: Vec<T>,
    pub errors: Vec<Failure>,
    pub cancellations: Vec<CancelReason>,
}

impl<T> Partitions<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            successes: Vec::with_capacity(capacity),
            errors: Vec::new(),
            cancellations: Vec::new(),
        }
    }

    fn record(&mut self, outcome: Outcome<T>) {
        match outcome {
            Outcome::Resolved(value) => self.successes.push(value),
            Outcome::Failed(failure) => self.errors.push(failure),
            Outcome::Cancelled(reason) => self.cancellations.push(reason),
        }
    }

    /// Number of inputs across all partitions
    pub fn total(&self) -> usize {
        self.successes.len() + self.errors.len() + self.cancellations.len()
    }

    /// True if no input failed or was cancelled
    pub fn is_complete_success(&self) -> bool {
        self.errors.is_empty() && self.cancellations.is_empty()
    }
}

impl<T> Default for Partitions<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

struct Join<T, R, F> {
    remaining: AtomicUsize,
    partitions: Mutex<Partitions<T>>,
    reducer: Mutex<Option<F>>,
    target: AsyncValue<R>,
}

impl<T, R, F> Join<T, R, F>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: FnOnce(Partitions<T>) -> Outcome<R> + Send + 'static,
{
    fn settle(&self, outcome: Outcome<T>) {
        self.partitions.lock().record(outcome);

        // Only the thread that settles the last input runs the reducer
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        let partitions = mem::take(&mut *self.partitions.lock());
        let Some(reducer) = self.reducer.lock().take() else {
            return;
        };

        if !self.target.complete(reducer(partitions)) {
            debug!("aggregate settled before the reducer ran; result discarded");
        }
    }
}

/// Join `inputs` and reduce their outcomes into a single value.
///
/// The reducer body runs exactly once, after every input has settled, on the
/// thread that settles the last input (immediately for an empty input set).
/// Cancelling the returned value cancels inputs that are still pending; the
/// body still runs once they have all settled.
pub fn reduce<T, R, F>(inputs: Vec<AsyncValue<T>>, reducer: F) -> AsyncValue<R>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: FnOnce(Partitions<T>) -> Outcome<R> + Send + 'static,
{
    let target = AsyncValue::pending();

    if inputs.is_empty() {
        target.complete(reducer(Partitions::default()));
        return target;
    }

    let join = Arc::new(Join {
        remaining: AtomicUsize::new(inputs.len()),
        partitions: Mutex::new(Partitions::with_capacity(inputs.len())),
        reducer: Mutex::new(Some(reducer)),
        target: target.clone(),
    });

    for input in &inputs {
        target.propagate_cancel(input);
    }

    for input in inputs {
        let join = Arc::clone(&join);
        input.on_terminal(move |outcome| join.settle(outcome));
    }

    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::CancelKind;

    #[test]
    fn test_empty_input_reduces_immediately() {
        let total = reduce(Vec::<AsyncValue<u32>>::new(), |p| {
            assert_eq!(p.total(), 0);
            Outcome::Resolved(p.successes.len())
        });
        assert_eq!(total.outcome().and_then(Outcome::ok), Some(0));
    }

    #[test]
    fn test_partial_failure_is_not_fatal() {
        let inputs = vec![
            AsyncValue::resolved(1u32),
            AsyncValue::failed(Failure::msg("node down")),
            AsyncValue::cancelled(CancelReason::shutdown()),
            AsyncValue::resolved(2u32),
        ];

        let summary = reduce(inputs, |p| {
            assert!(!p.is_complete_success());
            Outcome::Resolved((p.successes.iter().sum::<u32>(), p.errors.len(), p.cancellations.len()))
        });

        assert_eq!(summary.outcome().and_then(Outcome::ok), Some((3, 1, 1)));
    }

    #[test]
    fn test_waits_for_every_input() {
        let a = AsyncValue::<u32>::pending();
        let b = AsyncValue::<u32>::pending();
        let joined = reduce(vec![a.clone(), b.clone()], |p| Outcome::Resolved(p.total()));

        a.fail(Failure::msg("first one failed"));
        assert!(!joined.is_terminal());

        b.resolve(1);
        assert_eq!(joined.outcome().and_then(Outcome::ok), Some(2));
    }

    #[test]
    fn test_reducer_may_fail_the_aggregate() {
        let inputs = vec![AsyncValue::<u32>::failed(Failure::msg("x"))];
        let joined: AsyncValue<u32> = reduce(inputs, |p| {
            if p.successes.is_empty() {
                Outcome::Failed(Failure::msg("no input succeeded"))
            } else {
                Outcome::Resolved(0)
            }
        });
        assert!(joined.outcome().map_or(false, |o| o.is_failed()));
    }

    #[test]
    fn test_cancelling_aggregate_cancels_pending_inputs() {
        let done = AsyncValue::resolved(1u32);
        let pending = AsyncValue::<u32>::pending();

        let joined = reduce(vec![done, pending.clone()], |p| {
            Outcome::Resolved((p.successes.len(), p.cancellations.len()))
        });
        joined.cancel(CancelReason::user("refresh abandoned"));

        match pending.outcome() {
            Some(Outcome::Cancelled(reason)) => assert_eq!(reason.kind(), CancelKind::Upstream),
            other => panic!("unexpected outcome: {other:?}"),
        }
        // The aggregate keeps its cancellation
        assert!(joined.is_cancelled());
    }
}
