//! Single-assignment asynchronous values
//!
//! An [`AsyncValue`] starts pending and settles exactly once into one of
//! three terminal outcomes: resolved, failed or cancelled. Continuations
//! registered with [`AsyncValue::on_terminal`] run exactly once with that
//! outcome, either immediately (value already settled) or on whichever
//! thread performs the settling transition.
//!
//! ```text
//!            resolve(v)
//!          ┌────────────► Resolved(v)
//!          │  fail(e)
//! Pending ─┼────────────► Failed(e)
//!          │  cancel(r)
//!          └────────────► Cancelled(r)
//! ```
//!
//! Cancellation flows downstream only: a cancelled value cancels values
//! derived from it through [`transform`](AsyncValue::transform), never the
//! other way round, unless the caller wires it explicitly with
//! [`propagate_cancel`](AsyncValue::propagate_cancel).

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::error::{Error, Failure, Result};
use crate::outcome::{CancelReason, Outcome};

type Continuation<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

struct State<T> {
    outcome: Option<Outcome<T>>,
    continuations: Vec<Continuation<T>>,
    wakers: Vec<Waker>,
}

/// Single-assignment future with resolved, failed and cancelled outcomes.
///
/// Clones share the same underlying state; any clone may settle it.
pub struct AsyncValue<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for AsyncValue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for AsyncValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let label = state.outcome.as_ref().map_or("pending", Outcome::kind);
        f.debug_struct("AsyncValue").field("state", &label).finish()
    }
}

impl<T> AsyncValue<T>
where
    T: Clone + Send + 'static,
{
    /// Create a pending value
    pub fn pending() -> Self {
        Self::with_outcome(None)
    }

    /// Create a value that is already resolved
    pub fn resolved(value: T) -> Self {
        Self::with_outcome(Some(Outcome::Resolved(value)))
    }

    /// Create a value that has already failed
    pub fn failed(failure: Failure) -> Self {
        Self::with_outcome(Some(Outcome::Failed(failure)))
    }

    /// Create a value that is already cancelled
    pub fn cancelled(reason: CancelReason) -> Self {
        Self::with_outcome(Some(Outcome::Cancelled(reason)))
    }

    fn with_outcome(outcome: Option<Outcome<T>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                outcome,
                continuations: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Run `future` on the current tokio runtime and settle with its result.
    ///
    /// Cancelling the returned value aborts the task. A panicking task fails
    /// the value.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = std::result::Result<T, Failure>> + Send + 'static,
    {
        let value = Self::pending();
        let target = value.clone();

        let task = tokio::spawn(future);
        let abort = task.abort_handle();

        tokio::spawn(async move {
            match task.await {
                Ok(Ok(result)) => target.resolve(result),
                Ok(Err(failure)) => target.fail(failure),
                Err(e) if e.is_cancelled() => target.cancel(CancelReason::user("task aborted")),
                Err(e) => target.fail(Failure::new(e)),
            };
        });

        value.on_terminal(move |outcome| {
            if outcome.is_cancelled() {
                abort.abort();
            }
        });

        value
    }

    /// Settle with a value. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.complete(Outcome::Resolved(value))
    }

    /// Settle with a failure. Returns `false` if already settled.
    pub fn fail(&self, failure: Failure) -> bool {
        self.complete(Outcome::Failed(failure))
    }

    /// Settle as cancelled. Returns `false` if already settled.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.complete(Outcome::Cancelled(reason))
    }

    /// Like [`resolve`](Self::resolve) but reports a second settle as an error
    pub fn try_resolve(&self, value: T) -> Result<()> {
        strict(self.resolve(value))
    }

    /// Like [`fail`](Self::fail) but reports a second settle as an error
    pub fn try_fail(&self, failure: Failure) -> Result<()> {
        strict(self.fail(failure))
    }

    /// Like [`cancel`](Self::cancel) but reports a second settle as an error
    pub fn try_cancel(&self, reason: CancelReason) -> Result<()> {
        strict(self.cancel(reason))
    }

    /// Settle with the given outcome.
    ///
    /// Only the first call takes effect. Continuations and wakers run on the
    /// calling thread after the internal lock is released.
    pub fn complete(&self, outcome: Outcome<T>) -> bool {
        let (continuations, wakers) = {
            let mut state = self.state.lock();
            if let Some(existing) = &state.outcome {
                trace!(
                    existing = existing.kind(),
                    ignored = outcome.kind(),
                    "ignoring transition on settled value"
                );
                return false;
            }
            state.outcome = Some(outcome.clone());
            (
                mem::take(&mut state.continuations),
                mem::take(&mut state.wakers),
            )
        };

        for continuation in continuations {
            continuation(outcome.clone());
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Register a continuation that runs exactly once with the outcome.
    ///
    /// Runs immediately on the calling thread if the value already settled.
    pub fn on_terminal<F>(&self, continuation: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        let mut state = self.state.lock();
        if let Some(outcome) = state.outcome.clone() {
            drop(state);
            continuation(outcome);
            return;
        }
        state.continuations.push(Box::new(continuation));
    }

    /// Cancel `dependent` when this value is cancelled.
    ///
    /// Other outcomes leave `dependent` untouched.
    pub fn propagate_cancel<U>(&self, dependent: &AsyncValue<U>)
    where
        U: Clone + Send + 'static,
    {
        let dependent = dependent.clone();
        self.on_terminal(move |outcome| {
            if let Outcome::Cancelled(reason) = outcome {
                dependent.cancel(CancelReason::upstream(&reason));
            }
        });
    }

    /// Chain dependent asynchronous work onto the resolved value.
    ///
    /// `deferred` runs only if this value resolves and the derived value is
    /// still pending. The derived value settles with the inner value's
    /// outcome, fails if this value fails or `deferred` returns an error,
    /// and is cancelled if this value is cancelled. Cancelling the derived
    /// value cancels the inner value but never this one.
    pub fn transform<U, F>(&self, deferred: F) -> AsyncValue<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> std::result::Result<AsyncValue<U>, Failure> + Send + 'static,
    {
        let derived = AsyncValue::pending();
        let target = derived.clone();

        self.on_terminal(move |outcome| match outcome {
            Outcome::Resolved(value) => {
                if target.is_terminal() {
                    debug!("derived value settled before upstream resolved; skipping");
                    return;
                }
                match deferred(value) {
                    Ok(inner) => {
                        target.propagate_cancel(&inner);
                        inner.on_terminal(move |outcome| {
                            target.complete(outcome);
                        });
                    }
                    Err(failure) => {
                        target.fail(failure);
                    }
                }
            }
            Outcome::Failed(failure) => {
                target.fail(failure);
            }
            Outcome::Cancelled(reason) => {
                target.cancel(reason);
            }
        });

        derived
    }

    /// Synchronously map the resolved value
    pub fn map<U, F>(&self, f: F) -> AsyncValue<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> std::result::Result<U, Failure> + Send + 'static,
    {
        self.transform(move |value| f(value).map(AsyncValue::resolved))
    }

    /// Cancel this value with [`CancelKind::Timeout`](crate::CancelKind::Timeout)
    /// if it is still pending after `timeout`.
    ///
    /// The timer runs on the current tokio runtime. Outside of a runtime no
    /// timer is armed and the value is returned unchanged.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let handle = Handle::try_current().ok();
        self.with_timeout_on(timeout, handle.as_ref())
    }

    /// Like [`with_timeout`](Self::with_timeout) but arms the timer on
    /// `handle`, so it can be called from threads outside the runtime.
    ///
    /// Without a handle no timer is armed and the value is returned
    /// unchanged.
    pub fn with_timeout_on(self, timeout: Duration, handle: Option<&Handle>) -> Self {
        if self.is_terminal() {
            return self;
        }

        let Some(handle) = handle else {
            warn!(?timeout, "no tokio runtime available; timeout not armed");
            return self;
        };

        let target = self.clone();
        let timer = handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            if target.cancel(CancelReason::timeout(timeout)) {
                debug!(?timeout, "asynchronous value timed out");
            }
        });
        let abort = timer.abort_handle();
        self.on_terminal(move |_| abort.abort());

        self
    }

    /// Peek at the outcome without waiting
    pub fn outcome(&self) -> Option<Outcome<T>> {
        self.state.lock().outcome.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.lock().outcome.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.state.lock().outcome, Some(Outcome::Cancelled(_)))
    }
}

fn strict(took_effect: bool) -> Result<()> {
    if took_effect {
        Ok(())
    } else {
        Err(Error::AlreadyTerminal)
    }
}

impl<T> Future for AsyncValue<T>
where
    T: Clone,
{
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.lock();
        if let Some(outcome) = &state.outcome {
            return Poll::Ready(outcome.clone());
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
