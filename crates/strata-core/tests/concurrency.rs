//! Concurrency tests for asynchronous values and fan-out joins
//!
//! These tests settle values from many threads at once and check that:
//! - exactly one transition takes effect per value
//! - every continuation observes that outcome exactly once
//! - the reducer body runs exactly once, after all inputs settled

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use strata_core::{reduce, AsyncValue, CancelReason, Failure, Outcome};

#[test]
fn test_racing_producers_single_outcome() {
    for _ in 0..50 {
        let value = AsyncValue::<usize>::pending();
        let observed = Arc::new(AtomicUsize::new(0));
        let wins = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        for _ in 0..4 {
            let observed = Arc::clone(&observed);
            value.on_terminal(move |_| {
                observed.fetch_add(1, Ordering::SeqCst);
            });
        }

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let value = value.clone();
                let wins = Arc::clone(&wins);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let took_effect = match i % 3 {
                        0 => value.resolve(i),
                        1 => value.fail(Failure::msg(format!("producer {i}"))),
                        _ => value.cancel(CancelReason::user("racing cancel")),
                    };
                    if took_effect {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(observed.load(Ordering::SeqCst), 4);
        assert!(value.is_terminal());
    }
}

#[test]
fn test_reducer_runs_exactly_once_under_concurrent_completion() {
    const INPUTS: usize = 64;

    for _ in 0..20 {
        let inputs: Vec<AsyncValue<usize>> = (0..INPUTS).map(|_| AsyncValue::pending()).collect();
        let invocations = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&invocations);
        let joined = reduce(inputs.clone(), move |p| {
            counter.fetch_add(1, Ordering::SeqCst);
            Outcome::Resolved((p.successes.len(), p.errors.len(), p.cancellations.len()))
        });

        let barrier = Arc::new(Barrier::new(INPUTS));
        let handles: Vec<_> = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    match i % 4 {
                        0 | 1 => input.resolve(i),
                        2 => input.fail(Failure::msg("fetch failed")),
                        _ => input.cancel(CancelReason::user("skip")),
                    };
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        let (successes, errors, cancellations) = joined.outcome().and_then(Outcome::ok).unwrap();
        assert_eq!(successes + errors + cancellations, INPUTS);
        assert_eq!(successes, INPUTS / 2);
        assert_eq!(errors, INPUTS / 4);
        assert_eq!(cancellations, INPUTS / 4);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_inputs_join_on_worker_pool() {
    let inputs: Vec<AsyncValue<u64>> = (0..16u64)
        .map(|i| {
            AsyncValue::spawn(async move {
                tokio::time::sleep(Duration::from_millis(16 - i)).await;
                if i % 5 == 0 {
                    Err(Failure::msg(format!("input {i} failed")))
                } else {
                    Ok(i)
                }
            })
        })
        .collect();

    let joined = reduce(inputs, |p| {
        Outcome::Resolved((p.successes.len(), p.errors.len()))
    });

    // 0, 5, 10, 15 fail
    assert_eq!(joined.await.ok(), Some((12, 4)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelling_aggregate_aborts_spawned_inputs() {
    let slow = AsyncValue::<u8>::spawn(async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(1)
    });
    let fast = AsyncValue::resolved(2u8);

    let joined = reduce(vec![slow.clone(), fast], |p| {
        Outcome::Resolved(p.cancellations.len())
    });
    joined.cancel(CancelReason::shutdown());

    assert!(joined.await.is_cancelled());
    assert!(slow.await.is_cancelled());
}
