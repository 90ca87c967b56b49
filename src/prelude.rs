//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use race_harness::prelude::*;
//!
//! let report = run_scenario(&ScenarioConfig::new(ScenarioKind::Order).guarded(true))
//!     .expect("scenario should run");
//! assert!(report.is_clean());
//! ```

pub use crate::config::{ContentionWindow, GuardMode, ScenarioConfig, ScenarioKind};
pub use crate::error::{HarnessError, InvariantViolation, ScenarioError};
pub use crate::generators::{
    amounts, contention_windows, guarded_configs, guarded_modes, tick_aligned_amounts, unit_counts,
};
pub use crate::harness::{Completed, Harness};
pub use crate::journal::{Journal, Record, RecordKind};
pub use crate::law::{Verifier, assert_exactly_once, assert_no_lost_updates, assert_same_allocation};
pub use crate::report::{ReportFormat, render_calibration, render_scenario};
pub use crate::scenario::{
    CalibrationReport, FinalState, ScenarioReport, calibrate, calibrate_until, run_scenario,
};
pub use crate::state::{
    Amount, Collection, FileUploader, LazySingleton, Order, OrderStatus, UploadStatus,
    distinct_allocations,
};
pub use crate::sync::{Exclusive, Gate, GateState};

#[cfg(feature = "tokio")]
pub use crate::harness::tokio::run_tasks;

#[cfg(feature = "loom")]
pub use crate::law::loom::{
    LazyInitKernel, LoomModel, PaymentKernel, assert_loom_model, max_lazy_allocations,
    max_payment_transitions,
};
