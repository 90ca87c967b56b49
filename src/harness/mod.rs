//! Spawn-and-join harness for concurrent work units.

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod tokio;

use std::thread;
use std::time::{Duration, Instant};

use crate::error::{HarnessError, panic_message};

/// Final state of a completed run.
#[derive(Debug)]
pub struct Completed<S> {
    /// Shared state after every unit was joined.
    pub state: S,
    /// Number of units that ran.
    pub unit_count: usize,
    /// Wall time from first spawn to last join.
    pub elapsed: Duration,
}

/// Runs N OS threads against one shared state and joins them all.
#[derive(Debug, Clone)]
pub struct Harness {
    thread_prefix: String,
    stack_size: Option<usize>,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            thread_prefix: "unit".to_string(),
            stack_size: None,
        }
    }
}

impl Harness {
    /// Harness with default thread naming.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name threads `<prefix>-<index>`.
    pub fn with_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_prefix = prefix.into();
        self
    }

    /// Stack size for each unit thread.
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Run `unit_count` units, each calling `body(&state, index)`, then join all of them.
    ///
    /// A panic in any unit is reported only after every unit has been joined; siblings are never
    /// cancelled.
    pub fn run<S, F>(
        &self,
        state: S,
        unit_count: usize,
        body: F,
    ) -> Result<Completed<S>, HarnessError>
    where
        S: Sync,
        F: Fn(&S, usize) + Sync,
    {
        self.run_with_controller(state, unit_count, body, |_| {})
    }

    /// Like [`Harness::run`], with `controller` executing on the calling thread while the units
    /// are live. Used to drive hand-offs such as resuming a suspended unit.
    ///
    /// The controller is skipped when spawning fails.
    pub fn run_with_controller<S, F, C>(
        &self,
        state: S,
        unit_count: usize,
        body: F,
        controller: C,
    ) -> Result<Completed<S>, HarnessError>
    where
        S: Sync,
        F: Fn(&S, usize) + Sync,
        C: FnOnce(&S),
    {
        if unit_count == 0 {
            return Err(HarnessError::NoUnits);
        }
        tracing::debug!(unit_count, prefix = %self.thread_prefix, "spawning units");

        let started = Instant::now();
        let (spawn_error, mut faults) = thread::scope(|scope| {
            let state = &state;
            let body = &body;
            let mut handles = Vec::with_capacity(unit_count);
            let mut spawn_error = None;

            for unit in 0..unit_count {
                let mut builder = thread::Builder::new().name(format!("{}-{unit}", self.thread_prefix));
                if let Some(bytes) = self.stack_size {
                    builder = builder.stack_size(bytes);
                }
                match builder.spawn_scoped(scope, move || body(state, unit)) {
                    Ok(handle) => handles.push((unit, handle)),
                    Err(source) => {
                        spawn_error = Some(HarnessError::SpawnFailure {
                            unit,
                            requested: unit_count,
                            source,
                        });
                        break;
                    }
                }
            }

            if spawn_error.is_none() {
                controller(state);
            }

            let faults: Vec<(usize, String)> = handles
                .into_iter()
                .filter_map(|(unit, handle)| {
                    handle
                        .join()
                        .err()
                        .map(|payload| (unit, panic_message(payload.as_ref())))
                })
                .collect();
            (spawn_error, faults)
        });
        let elapsed = started.elapsed();

        if let Some(error) = spawn_error {
            tracing::error!(%error, "spawn failed");
            return Err(error);
        }
        if !faults.is_empty() {
            for (unit, message) in &faults {
                tracing::warn!(unit, %message, "unit panicked");
            }
            let total = faults.len();
            let (unit, message) = faults.swap_remove(0);
            return Err(HarnessError::UnitPanicked {
                unit,
                message,
                faults: total,
            });
        }

        tracing::debug!(unit_count, elapsed_us = saturating_micros(elapsed), "units joined");
        Ok(Completed {
            state,
            unit_count,
            elapsed,
        })
    }
}

/// Whole microseconds in `elapsed`, clamped to `u64::MAX`.
pub(crate) fn saturating_micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn every_unit_runs_once_with_its_index() {
        let completed = Harness::new()
            .run(
                (AtomicUsize::new(0), AtomicUsize::new(0)),
                6,
                |(count, sum), unit| {
                    count.fetch_add(1, Ordering::SeqCst);
                    sum.fetch_add(unit, Ordering::SeqCst);
                },
            )
            .expect("run should succeed");
        assert_eq!(completed.unit_count, 6);
        assert_eq!(completed.state.0.load(Ordering::SeqCst), 6);
        assert_eq!(completed.state.1.load(Ordering::SeqCst), 15);
    }

    #[test]
    fn zero_units_is_rejected() {
        let err = Harness::new().run((), 0, |_, _| {}).unwrap_err();
        assert!(matches!(err, HarnessError::NoUnits));
    }

    #[test]
    fn panics_surface_after_siblings_finish() {
        let finished = AtomicUsize::new(0);
        let err = Harness::new()
            .run(&finished, 4, |finished, unit| {
                if unit == 1 || unit == 3 {
                    panic!("unit {unit} failed");
                }
                std::thread::sleep(Duration::from_millis(20));
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_err();
        assert_eq!(finished.load(Ordering::SeqCst), 2);
        match err {
            HarnessError::UnitPanicked {
                unit,
                message,
                faults,
            } => {
                assert_eq!(unit, 1);
                assert_eq!(message, "unit 1 failed");
                assert_eq!(faults, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn controller_runs_while_units_are_live() {
        let gate = crate::sync::Gate::new();
        let completed = Harness::new()
            .with_thread_prefix("child")
            .run_with_controller(
                gate,
                1,
                |gate, _| {
                    assert_eq!(std::thread::current().name(), Some("child-0"));
                    gate.suspend();
                    gate.terminate();
                },
                |gate| {
                    gate.wait_until_suspended();
                    gate.resume();
                },
            )
            .expect("run should succeed");
        assert_eq!(completed.state.state(), crate::sync::GateState::Terminated);
    }

    #[test]
    fn spawn_failure_is_reported_and_skips_the_controller() {
        let controlled = AtomicBool::new(false);
        let err = Harness::new()
            .with_stack_size(usize::MAX / 2)
            .run_with_controller(
                (),
                3,
                |_, _| {},
                |_| controlled.store(true, Ordering::SeqCst),
            )
            .unwrap_err();
        match err {
            HarnessError::SpawnFailure {
                unit, requested, ..
            } => {
                assert_eq!(unit, 0);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!controlled.load(Ordering::SeqCst));
    }

    #[test]
    fn elapsed_micros_saturate() {
        assert_eq!(saturating_micros(Duration::from_micros(42)), 42);
        assert_eq!(saturating_micros(Duration::MAX), u64::MAX);
    }
}
