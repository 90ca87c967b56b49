//! Named scenarios: build fresh state, run units through the harness, verify the final state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::{GuardMode, ScenarioConfig, ScenarioKind};
use crate::error::{HarnessError, InvariantViolation, ScenarioError};
use crate::harness::{Harness, saturating_micros};
use crate::journal::{Journal, Record, RecordKind};
use crate::law::Verifier;
use crate::state::{Amount, Collection, FileUploader, LazySingleton, Order, OrderStatus};
use crate::sync::{Exclusive, Gate, GateState};

/// Resource handed out by the lazy scenario.
#[derive(Debug, PartialEq, Eq)]
pub struct LazyResource {
    /// Allocation number, starting at 0.
    pub instance: usize,
}

/// Observable final state of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinalState {
    /// Order scenario.
    Order {
        /// Final status.
        status: OrderStatus,
        /// Order amount.
        amount: Amount,
        /// Transitions actually executed.
        transitions: usize,
        /// "collecting payment" journal records.
        payment_records: usize,
    },
    /// Lazy singleton scenario.
    Lazy {
        /// Allocations performed.
        allocations: usize,
        /// Distinct allocations among the handles units received.
        distinct_handles: usize,
        /// Total lookups performed.
        lookups: usize,
    },
    /// Collection scenario.
    Collection {
        /// Final length.
        len: usize,
        /// Appends performed.
        expected: usize,
    },
    /// Uploader scenario.
    Uploader {
        /// Statuses visible in the stored results collection.
        published: usize,
        /// Files uploaded.
        expected: usize,
        /// Results collections created.
        result_collections: usize,
    },
    /// Wakeup scenario.
    Wakeup {
        /// Gate state history per unit.
        histories: Vec<Vec<GateState>>,
        /// Times the controller saw a unit running after it had parked and before resume.
        premature_wakeups: usize,
    },
}

/// Result of one scenario invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Scenario run.
    pub scenario: ScenarioKind,
    /// Guard placement.
    pub guard: GuardMode,
    /// Units spawned.
    pub unit_count: usize,
    /// Operations per unit.
    pub ops_per_unit: usize,
    /// Final observable state.
    pub final_state: FinalState,
    /// Count of the scenario's guarded transition (payments, allocations, appends, resumes).
    pub transition_count: usize,
    /// Wall time from first spawn to last join, in microseconds.
    pub elapsed_us: u64,
    /// Invariant violation, when a race was detected.
    pub violation: Option<InvariantViolation>,
    /// Journal records, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<Vec<Record>>,
}

impl ScenarioReport {
    /// Whether the run satisfied every invariant.
    pub fn is_clean(&self) -> bool {
        self.violation.is_none()
    }

    /// Elapsed wall time.
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }

    /// Turn a detected race into an error.
    pub fn into_result(self) -> Result<Self, ScenarioError> {
        match self.violation {
            Some(violation) => Err(ScenarioError::Violation(violation)),
            None => Ok(self),
        }
    }
}

/// Aggregate of repeated trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    /// Scenario run.
    pub scenario: ScenarioKind,
    /// Guard placement.
    pub guard: GuardMode,
    /// Units per trial.
    pub unit_count: usize,
    /// Trials requested.
    pub trials_requested: usize,
    /// Trials completed.
    pub trials_run: usize,
    /// Trials that violated an invariant.
    pub violations: usize,
    /// First violation observed.
    pub first_violation: Option<InvariantViolation>,
    /// Largest transition count seen in any trial.
    pub max_transition_count: usize,
    /// Sum of trial wall times, in microseconds.
    pub total_elapsed_us: u64,
    /// Stopped early by the caller.
    pub interrupted: bool,
}

impl CalibrationReport {
    /// Whether no trial violated an invariant.
    pub fn is_clean(&self) -> bool {
        self.violations == 0
    }
}

struct Outcome {
    final_state: FinalState,
    transition_count: usize,
    violation: Option<InvariantViolation>,
    journal: Arc<Journal>,
    elapsed: Duration,
}

/// Run one trial of the configured scenario on fresh state.
///
/// A detected race is reported in [`ScenarioReport::violation`], not as an error; errors are
/// reserved for harness failures and invalid configurations.
pub fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioReport, ScenarioError> {
    if config.ops_per_unit == 0 {
        return Err(ScenarioError::InvalidConfig("ops_per_unit must be at least 1"));
    }
    let harness = Harness::new().with_thread_prefix(config.scenario.name());
    let verifier = Verifier::new(config.scenario.name(), config.unit_count);
    let outcome = match config.scenario {
        ScenarioKind::Order => run_order(config, &harness, &verifier)?,
        ScenarioKind::Lazy => run_lazy(config, &harness, &verifier)?,
        ScenarioKind::Collection => run_collection(config, &harness, &verifier)?,
        ScenarioKind::Uploader => run_uploader(config, &harness, &verifier)?,
        ScenarioKind::Wakeup => {
            if config.guard != GuardMode::Entity {
                return Err(ScenarioError::UnsupportedGuard {
                    scenario: config.scenario.name(),
                    guard: config.guard.name(),
                });
            }
            run_wakeup(config, &harness, &verifier)?
        }
    };

    tracing::info!(
        scenario = %config.scenario,
        guard = config.guard.name(),
        units = config.unit_count,
        transitions = outcome.transition_count,
        clean = outcome.violation.is_none(),
        "scenario finished"
    );

    Ok(ScenarioReport {
        scenario: config.scenario,
        guard: config.guard,
        unit_count: config.unit_count,
        ops_per_unit: config.ops_per_unit,
        final_state: outcome.final_state,
        transition_count: outcome.transition_count,
        elapsed_us: saturating_micros(outcome.elapsed),
        violation: outcome.violation,
        journal: config.keep_journal.then(|| outcome.journal.snapshot()),
    })
}

/// Run `config.trials` trials, each on fresh state.
pub fn calibrate(config: &ScenarioConfig) -> Result<CalibrationReport, ScenarioError> {
    calibrate_until(config, || false)
}

/// Like [`calibrate`], checking `stop` before each trial.
pub fn calibrate_until(
    config: &ScenarioConfig,
    stop: impl Fn() -> bool,
) -> Result<CalibrationReport, ScenarioError> {
    let trial_config = ScenarioConfig {
        keep_journal: false,
        ..config.clone()
    };
    let mut report = CalibrationReport {
        scenario: config.scenario,
        guard: config.guard,
        unit_count: config.unit_count,
        trials_requested: config.trials,
        trials_run: 0,
        violations: 0,
        first_violation: None,
        max_transition_count: 0,
        total_elapsed_us: 0,
        interrupted: false,
    };
    let started = Instant::now();

    for _ in 0..config.trials {
        if stop() {
            report.interrupted = true;
            break;
        }
        let trial = run_scenario(&trial_config)?;
        report.trials_run += 1;
        report.total_elapsed_us = report.total_elapsed_us.saturating_add(trial.elapsed_us);
        report.max_transition_count = report.max_transition_count.max(trial.transition_count);
        if let Some(violation) = trial.violation {
            report.violations += 1;
            report.first_violation.get_or_insert(violation);
        }
    }

    if report.is_clean() {
        tracing::info!(
            scenario = %config.scenario,
            trials = report.trials_run,
            elapsed_us = saturating_micros(started.elapsed()),
            "no race condition this time"
        );
    } else {
        tracing::warn!(
            scenario = %config.scenario,
            trials = report.trials_run,
            violations = report.violations,
            "race condition detected"
        );
    }
    Ok(report)
}

struct OrderTrial {
    order: Order,
    caller_lock: Exclusive,
}

fn run_order(
    config: &ScenarioConfig,
    harness: &Harness,
    verifier: &Verifier,
) -> Result<Outcome, HarnessError> {
    let journal = Arc::new(Journal::new());
    let trial = OrderTrial {
        order: Order::new(config.amount)
            .with_window(config.window)
            .with_journal(Arc::clone(&journal)),
        caller_lock: Exclusive::new(),
    };
    let (guard, window, ops) = (config.guard, config.window, config.ops_per_unit);

    let completed = harness.run(trial, config.unit_count, |trial, unit| {
        for _ in 0..ops {
            match guard {
                GuardMode::Unguarded => {
                    trial.order.collect_payment_unguarded(Some(unit));
                }
                GuardMode::Entity => {
                    trial.order.collect_payment(Some(unit));
                }
                GuardMode::Caller => trial.caller_lock.synchronize(|| {
                    if trial.order.is_pending() {
                        window.apply();
                        trial.order.collect_payment_unchecked(Some(unit));
                    }
                }),
            }
        }
    })?;

    let order = &completed.state.order;
    let transitions = order.transitions();
    let payment_records = journal.count(RecordKind::PaymentCollected);
    let violation = verifier
        .exactly("payment transitions", 1, transitions)
        .and_then(|()| verifier.exactly("payment records", 1, payment_records))
        .err();

    Ok(Outcome {
        final_state: FinalState::Order {
            status: order.status(),
            amount: order.amount(),
            transitions,
            payment_records,
        },
        transition_count: transitions,
        violation,
        journal,
        elapsed: completed.elapsed,
    })
}

struct LazyTrial {
    singleton: LazySingleton<LazyResource>,
    caller_lock: Exclusive,
    seen: Mutex<Vec<Arc<LazyResource>>>,
}

fn run_lazy(
    config: &ScenarioConfig,
    harness: &Harness,
    verifier: &Verifier,
) -> Result<Outcome, HarnessError> {
    let journal = Arc::new(Journal::new());
    let trial = LazyTrial {
        singleton: LazySingleton::new(|instance| LazyResource { instance })
            .with_window(config.window)
            .with_journal(Arc::clone(&journal)),
        caller_lock: Exclusive::new(),
        seen: Mutex::new(Vec::new()),
    };
    let (guard, ops) = (config.guard, config.ops_per_unit);

    let completed = harness.run(trial, config.unit_count, |trial, unit| {
        for _ in 0..ops {
            let handle = match guard {
                GuardMode::Unguarded => trial.singleton.get_unguarded(Some(unit)),
                GuardMode::Entity => trial.singleton.get(Some(unit)),
                GuardMode::Caller => trial
                    .caller_lock
                    .synchronize(|| trial.singleton.get_unguarded(Some(unit))),
            };
            trial.seen.lock().push(handle);
        }
    })?;

    let trial = completed.state;
    let allocations = trial.singleton.allocations();
    let seen = trial.seen.into_inner();
    let violation = verifier
        .same_allocation("shared resource identity", &seen)
        .and_then(|()| verifier.at_most("allocations", 1, allocations))
        .err();

    Ok(Outcome {
        final_state: FinalState::Lazy {
            allocations,
            distinct_handles: crate::state::distinct_allocations(&seen),
            lookups: seen.len(),
        },
        transition_count: allocations,
        violation,
        journal,
        elapsed: completed.elapsed,
    })
}

struct CollectionTrial {
    collection: Collection<usize>,
    caller_lock: Exclusive,
}

fn run_collection(
    config: &ScenarioConfig,
    harness: &Harness,
    verifier: &Verifier,
) -> Result<Outcome, HarnessError> {
    let journal = Arc::new(Journal::new());
    let trial = CollectionTrial {
        collection: Collection::new()
            .with_window(config.window)
            .with_journal(Arc::clone(&journal)),
        caller_lock: Exclusive::new(),
    };
    let (guard, ops) = (config.guard, config.ops_per_unit);

    let completed = harness.run(trial, config.unit_count, |trial, unit| {
        for op in 0..ops {
            let value = unit * ops + op;
            match guard {
                GuardMode::Unguarded => trial.collection.append_unguarded(value, Some(unit)),
                GuardMode::Entity => trial.collection.append(value, Some(unit)),
                GuardMode::Caller => trial
                    .caller_lock
                    .synchronize(|| trial.collection.append_unguarded(value, Some(unit))),
            }
        }
    })?;

    let expected = config.unit_count * ops;
    let len = completed.state.collection.len();
    let violation = verifier.exactly("final length", expected, len).err();

    Ok(Outcome {
        final_state: FinalState::Collection { len, expected },
        transition_count: journal.count(RecordKind::Appended),
        violation,
        journal,
        elapsed: completed.elapsed,
    })
}

struct UploaderTrial {
    uploader: FileUploader,
    caller_lock: Exclusive,
}

fn run_uploader(
    config: &ScenarioConfig,
    harness: &Harness,
    verifier: &Verifier,
) -> Result<Outcome, HarnessError> {
    let journal = Arc::new(Journal::new());
    let trial = UploaderTrial {
        uploader: FileUploader::with_generated_files(config.unit_count)
            .with_window(config.window)
            .with_journal(Arc::clone(&journal)),
        caller_lock: Exclusive::new(),
    };
    let guard = config.guard;

    let completed = harness.run(trial, config.unit_count, |trial, unit| match guard {
        GuardMode::Unguarded => trial.uploader.upload(unit, false),
        GuardMode::Entity => trial.uploader.upload(unit, true),
        GuardMode::Caller => {
            if let Some(status) = trial.uploader.upload_file(unit) {
                let results = trial
                    .caller_lock
                    .synchronize(|| trial.uploader.results_unguarded(Some(unit)));
                results.append(status, Some(unit));
            }
        }
    })?;

    let uploader = &completed.state.uploader;
    let expected = uploader.files().len();
    let published = uploader.published();
    let result_collections = uploader.result_collections();
    let violation = verifier.exactly("published results", expected, published).err();

    Ok(Outcome {
        final_state: FinalState::Uploader {
            published,
            expected,
            result_collections,
        },
        transition_count: result_collections,
        violation,
        journal,
        elapsed: completed.elapsed,
    })
}

struct WakeupTrial {
    gates: Vec<Gate>,
    journal: Arc<Journal>,
    premature_wakeups: AtomicUsize,
}

const WAKEUP_HISTORY: [GateState; 4] = [
    GateState::Running,
    GateState::Suspended,
    GateState::Running,
    GateState::Terminated,
];

fn run_wakeup(
    config: &ScenarioConfig,
    harness: &Harness,
    verifier: &Verifier,
) -> Result<Outcome, HarnessError> {
    let journal = Arc::new(Journal::new());
    let trial = WakeupTrial {
        gates: (0..config.unit_count).map(|_| Gate::new()).collect(),
        journal: Arc::clone(&journal),
        premature_wakeups: AtomicUsize::new(0),
    };
    let window = config.window;

    let completed = harness.run_with_controller(
        trial,
        config.unit_count,
        |trial, unit| {
            let Some(gate) = trial.gates.get(unit) else {
                return;
            };
            window.apply();
            gate.suspend();
            trial
                .journal
                .record(Some(unit), RecordKind::Terminated, "child thread woke up");
            gate.terminate();
        },
        |trial| {
            for (unit, gate) in trial.gates.iter().enumerate() {
                if gate.wait_until_suspended() != GateState::Suspended
                    || gate.state() != GateState::Suspended
                {
                    trial.premature_wakeups.fetch_add(1, Ordering::SeqCst);
                    continue;
                }
                trial
                    .journal
                    .record(Some(unit), RecordKind::Suspended, "child sleeping");
                if gate.resume() {
                    trial
                        .journal
                        .record(Some(unit), RecordKind::Resumed, "wakeup sent");
                }
            }
        },
    )?;

    let trial = completed.state;
    let histories: Vec<Vec<GateState>> = trial.gates.iter().map(Gate::history).collect();
    let premature_wakeups = trial.premature_wakeups.load(Ordering::SeqCst);
    let resumes = journal.count(RecordKind::Resumed);

    let violation = verifier
        .exactly("premature wakeups", 0, premature_wakeups)
        .and_then(|()| verifier.exactly("resumes", config.unit_count, resumes))
        .and_then(|()| {
            histories
                .iter()
                .try_for_each(|history| verifier.sequence("gate history", &WAKEUP_HISTORY, history))
        })
        .err();

    Ok(Outcome {
        final_state: FinalState::Wakeup {
            histories,
            premature_wakeups,
        },
        transition_count: resumes,
        violation,
        journal,
        elapsed: completed.elapsed,
    })
}
