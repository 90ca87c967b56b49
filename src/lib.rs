//! # race-harness
//!
//! `race-harness` reproduces concurrency hazards on demand and shows the synchronization that
//! removes them. It is organized around:
//! - `state`: shared entities with guarded and unguarded operations (order payment, lazy
//!   singleton, append-only collection, file uploader)
//! - `sync`: an instrumented scoped lock and a suspend/resume gate
//! - `harness`: spawn N units against one state, join them all, surface faults afterwards
//! - `law`: final-state invariants, plus loom model checks (feature `loom`)
//! - `scenario`: named, configurable end-to-end runs and repeated-trial calibration
//!
//! Unguarded operations are deliberate. They are how a race is made observable and must not be
//! made safe behind the caller's back.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod generators;
pub mod harness;
pub mod journal;
pub mod law;
pub mod prelude;
pub mod report;
pub mod scenario;
pub mod state;
pub mod sync;

pub use config::{ContentionWindow, GuardMode, ScenarioConfig, ScenarioKind};
pub use error::{HarnessError, InvariantViolation, ScenarioError};
pub use harness::{Completed, Harness};
pub use scenario::{CalibrationReport, ScenarioReport, calibrate, calibrate_until, run_scenario};

/// Re-export `proptest` for convenience.
pub use proptest;
