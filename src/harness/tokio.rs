//! Task-based variant of the harness for Tokio runtimes.
//!
//! Units are spawned with [`tokio::spawn`] and share the state through an `Arc`.
//! On a multi-threaded runtime the tasks run in parallel and are preempted at every `.await`,
//! which is enough to reproduce the same check-then-act hazards as the thread harness when the
//! body yields between check and act.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use super::Completed;
use crate::error::{HarnessError, panic_message};

/// Spawn `unit_count` tasks running `body(state, index)` and await all of them.
///
/// Task panics are reported after every task has completed, like [`super::Harness::run`].
pub async fn run_tasks<S, F, Fut>(
    state: S,
    unit_count: usize,
    body: F,
) -> Result<Completed<Arc<S>>, HarnessError>
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, usize) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    if unit_count == 0 {
        return Err(HarnessError::NoUnits);
    }
    let state = Arc::new(state);
    let started = Instant::now();

    let handles: Vec<_> = (0..unit_count)
        .map(|unit| tokio::spawn(body(Arc::clone(&state), unit)))
        .collect();

    let mut faults = Vec::new();
    for (unit, handle) in handles.into_iter().enumerate() {
        if let Err(error) = handle.await {
            let message = if error.is_panic() {
                panic_message(error.into_panic().as_ref())
            } else {
                error.to_string()
            };
            tracing::warn!(unit, %message, "task panicked");
            faults.push((unit, message));
        }
    }
    let elapsed = started.elapsed();

    if !faults.is_empty() {
        let total = faults.len();
        let (unit, message) = faults.swap_remove(0);
        return Err(HarnessError::UnitPanicked {
            unit,
            message,
            faults: total,
        });
    }

    Ok(Completed {
        state,
        unit_count,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Amount, Collection, Order};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn guarded_order_collects_once_across_tasks() {
        let completed = run_tasks(Order::new(Amount::from_cents(100_00)), 8, |order, unit| async move {
            tokio::task::yield_now().await;
            order.collect_payment(Some(unit));
        })
        .await
        .expect("tasks should complete");
        assert_eq!(completed.state.transitions(), 1);
        assert_eq!(completed.unit_count, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn guarded_appends_are_exact_across_tasks() {
        let completed = run_tasks(Collection::new(), 10, |collection, unit| async move {
            for op in 0..100 {
                collection.append(unit * 100 + op, Some(unit));
                if op % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
        .await
        .expect("tasks should complete");
        assert_eq!(completed.state.len(), 1000);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn task_panics_surface_after_join() {
        let err = run_tasks((), 3, |_, unit| async move {
            if unit == 2 {
                panic!("task failed");
            }
        })
        .await
        .unwrap_err();
        match err {
            HarnessError::UnitPanicked {
                unit,
                message,
                faults,
            } => {
                assert_eq!(unit, 2);
                assert_eq!(message, "task failed");
                assert_eq!(faults, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
