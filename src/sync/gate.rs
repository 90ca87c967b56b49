//! Suspend/resume hand-off between one parked unit and a controller.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

/// Lifecycle state of a gated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// Executing normally.
    Running,
    /// Parked until resumed.
    Suspended,
    /// Finished.
    Terminated,
}

#[derive(Debug)]
struct GateInner {
    state: GateState,
    history: Vec<GateState>,
}

impl GateInner {
    fn transition(&mut self, next: GateState) {
        tracing::debug!(from = ?self.state, to = ?next, "gate transition");
        self.state = next;
        self.history.push(next);
    }
}

/// Condition-variable backed gate for one unit.
///
/// Transitions: `Running -> Suspended` (the unit calls [`Gate::suspend`]), `Suspended -> Running`
/// (someone calls [`Gate::resume`]), `Running -> Terminated` ([`Gate::terminate`]).
#[derive(Debug)]
pub struct Gate {
    inner: Mutex<GateInner>,
    changed: Condvar,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    /// Gate in the `Running` state.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: GateState::Running,
                history: vec![GateState::Running],
            }),
            changed: Condvar::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> GateState {
        self.inner.lock().state
    }

    /// Every state the gate has been in, oldest first.
    pub fn history(&self) -> Vec<GateState> {
        self.inner.lock().history.clone()
    }

    /// Park the calling unit until another party resumes it.
    ///
    /// Returns immediately if the gate is already terminated.
    pub fn suspend(&self) {
        let mut inner = self.inner.lock();
        if inner.state != GateState::Running {
            return;
        }
        inner.transition(GateState::Suspended);
        self.changed.notify_all();
        while inner.state == GateState::Suspended {
            self.changed.wait(&mut inner);
        }
    }

    /// Block until the unit has parked or terminated, returning which.
    pub fn wait_until_suspended(&self) -> GateState {
        let mut inner = self.inner.lock();
        while inner.state == GateState::Running {
            self.changed.wait(&mut inner);
        }
        inner.state
    }

    /// Like [`Gate::wait_until_suspended`] but gives up after `timeout`, returning `None`.
    pub fn wait_until_suspended_for(&self, timeout: Duration) -> Option<GateState> {
        let mut inner = self.inner.lock();
        let deadline = std::time::Instant::now() + timeout;
        while inner.state == GateState::Running {
            if self.changed.wait_until(&mut inner, deadline).timed_out() {
                return (inner.state != GateState::Running).then_some(inner.state);
            }
        }
        Some(inner.state)
    }

    /// Release the parked unit, first waiting for it to park if it has not yet.
    ///
    /// Returns `false` if the unit terminated instead of suspending.
    pub fn resume(&self) -> bool {
        let mut inner = self.inner.lock();
        while inner.state == GateState::Running {
            self.changed.wait(&mut inner);
        }
        self.release(&mut inner)
    }

    /// Release the parked unit if it is currently parked; otherwise do nothing.
    pub fn try_resume(&self) -> bool {
        let mut inner = self.inner.lock();
        self.release(&mut inner)
    }

    /// Mark natural completion. Only a running unit can terminate.
    pub fn terminate(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != GateState::Running {
            return false;
        }
        inner.transition(GateState::Terminated);
        self.changed.notify_all();
        true
    }

    fn release(&self, inner: &mut GateInner) -> bool {
        if inner.state != GateState::Suspended {
            return false;
        }
        inner.transition(GateState::Running);
        self.changed.notify_all();
        true
    }
}
