//! Error taxonomy for harness runs and scenario verification.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Final state inconsistent with the expected count or identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    /// Scenario that produced the state.
    pub scenario: String,
    /// Number of units requested for the run.
    pub unit_count: usize,
    /// Name of the invariant that failed.
    pub invariant: &'static str,
    /// Expected observation.
    pub expected: String,
    /// Observed value.
    pub actual: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "race detected in scenario `{}` with {} unit(s): {} expected {}, observed {}",
            self.scenario, self.unit_count, self.invariant, self.expected, self.actual
        )
    }
}

impl std::error::Error for InvariantViolation {}

/// Failures raised while spawning or joining work units.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The OS refused to create a requested thread.
    #[error("failed to spawn unit {unit} of {requested}: {source}")]
    SpawnFailure {
        /// Index of the unit that could not be spawned.
        unit: usize,
        /// Number of units requested.
        requested: usize,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// At least one unit panicked; reported after every unit was joined.
    #[error("unit {unit} panicked: {message} ({faults} faulted unit(s) in total)")]
    UnitPanicked {
        /// Lowest index among the faulted units.
        unit: usize,
        /// Panic payload rendered as text.
        message: String,
        /// Total number of faulted units.
        faults: usize,
    },
    /// A run was requested with no units.
    #[error("unit count must be at least 1")]
    NoUnits,
}

/// Errors surfaced by [`crate::scenario::run_scenario`] and friends.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Harness-level failure.
    #[error(transparent)]
    Harness(#[from] HarnessError),
    /// Verification failure.
    #[error(transparent)]
    Violation(#[from] InvariantViolation),
    /// The requested combination of scenario and guard mode is not meaningful.
    #[error("scenario `{scenario}` does not support guard mode `{guard}`")]
    UnsupportedGuard {
        /// Scenario name.
        scenario: &'static str,
        /// Guard mode name.
        guard: &'static str,
    },
    /// The configuration does not describe a runnable scenario.
    #[error("invalid scenario config: {0}")]
    InvalidConfig(&'static str),
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// Config file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Render a thread panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
