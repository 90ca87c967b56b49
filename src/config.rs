//! Scenario configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;
use crate::state::order::Amount;

/// Which demonstration to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Check-then-set payment collection on a shared order.
    Order,
    /// Lazily materialized singleton resource.
    Lazy,
    /// Shared append-only collection.
    Collection,
    /// Uploads publishing into a lazily created results collection.
    Uploader,
    /// Suspend/resume hand-off between the harness and one child unit.
    Wakeup,
}

impl ScenarioKind {
    /// Every scenario, in CLI listing order.
    pub const ALL: [ScenarioKind; 5] = [
        ScenarioKind::Order,
        ScenarioKind::Lazy,
        ScenarioKind::Collection,
        ScenarioKind::Uploader,
        ScenarioKind::Wakeup,
    ];

    /// Stable scenario name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::Order => "order",
            ScenarioKind::Lazy => "lazy",
            ScenarioKind::Collection => "collection",
            ScenarioKind::Uploader => "uploader",
            ScenarioKind::Wakeup => "wakeup",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown scenario `{s}`"))
    }
}

/// Where mutual exclusion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardMode {
    /// No exclusion; the hazard is expected to surface.
    Unguarded,
    /// The entity's own lock covers the whole check-then-act sequence.
    Entity,
    /// A lock owned by the caller wraps the check and the act.
    Caller,
}

impl GuardMode {
    /// Map the boolean `guarded` flag onto a guard mode.
    #[must_use]
    pub fn from_guarded(guarded: bool) -> Self {
        if guarded {
            GuardMode::Entity
        } else {
            GuardMode::Unguarded
        }
    }

    /// Whether any exclusion is applied.
    #[must_use]
    pub fn is_guarded(self) -> bool {
        !matches!(self, GuardMode::Unguarded)
    }

    /// Stable mode name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            GuardMode::Unguarded => "none",
            GuardMode::Entity => "entity",
            GuardMode::Caller => "caller",
        }
    }
}

impl FromStr for GuardMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "unguarded" => Ok(GuardMode::Unguarded),
            "entity" => Ok(GuardMode::Entity),
            "caller" => Ok(GuardMode::Caller),
            other => Err(format!("unknown guard mode `{other}`")),
        }
    }
}

/// Pause inserted between a check and the act that depends on it.
///
/// Widening this gap makes unguarded interleavings far more likely to surface; guarded paths
/// insert the same pause so both variants do comparable work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentionWindow {
    /// No pause.
    None,
    /// Yield the time slice to the scheduler.
    #[default]
    Yield,
    /// Busy-spin for a number of iterations.
    Spin {
        /// Number of `spin_loop` hints to issue.
        iterations: u32,
    },
    /// Sleep for a number of microseconds.
    Sleep {
        /// Sleep length in microseconds.
        micros: u64,
    },
}

impl ContentionWindow {
    /// Execute the pause on the current thread.
    pub fn apply(self) {
        match self {
            ContentionWindow::None => {}
            ContentionWindow::Yield => std::thread::yield_now(),
            ContentionWindow::Spin { iterations } => {
                for _ in 0..iterations {
                    std::hint::spin_loop();
                }
            }
            ContentionWindow::Sleep { micros } => {
                std::thread::sleep(Duration::from_micros(micros));
            }
        }
    }
}

impl FromStr for ContentionWindow {
    type Err = String;

    /// Parses `none`, `yield`, `spin:<iterations>` or `sleep:<micros>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };
        match (kind, arg) {
            ("none", None) => Ok(ContentionWindow::None),
            ("yield", None) => Ok(ContentionWindow::Yield),
            ("spin", Some(arg)) => arg
                .parse()
                .map(|iterations| ContentionWindow::Spin { iterations })
                .map_err(|e| format!("invalid spin iterations `{arg}`: {e}")),
            ("sleep", Some(arg)) => arg
                .parse()
                .map(|micros| ContentionWindow::Sleep { micros })
                .map_err(|e| format!("invalid sleep micros `{arg}`: {e}")),
            _ => Err(format!(
                "invalid contention window `{s}` (expected none, yield, spin:<n> or sleep:<micros>)"
            )),
        }
    }
}

/// Configuration for one scenario invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Scenario to run.
    pub scenario: ScenarioKind,
    /// Number of concurrent units.
    pub unit_count: usize,
    /// Guard placement.
    pub guard: GuardMode,
    /// Operations performed by each unit (collection appends, lazy lookups).
    pub ops_per_unit: usize,
    /// Pause between check and act.
    pub window: ContentionWindow,
    /// Trials performed by [`crate::scenario::calibrate`].
    pub trials: usize,
    /// Order amount used by the order scenario.
    pub amount: Amount,
    /// Keep every journal record in the report.
    pub keep_journal: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            scenario: ScenarioKind::Order,
            unit_count: 5,
            guard: GuardMode::Entity,
            ops_per_unit: 1,
            window: ContentionWindow::default(),
            trials: 100,
            amount: Amount::from_cents(100_00),
            keep_journal: false,
        }
    }
}

impl ScenarioConfig {
    /// Config for `scenario` with defaults for everything else.
    pub fn new(scenario: ScenarioKind) -> Self {
        Self {
            scenario,
            ..Self::default()
        }
    }

    /// Load a config from a JSON file; absent fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Set unit count.
    pub fn with_units(mut self, unit_count: usize) -> Self {
        self.unit_count = unit_count;
        self
    }

    /// Set guard mode.
    pub fn with_guard(mut self, guard: GuardMode) -> Self {
        self.guard = guard;
        self
    }

    /// Set guard mode from the boolean `guarded` flag.
    pub fn guarded(self, guarded: bool) -> Self {
        self.with_guard(GuardMode::from_guarded(guarded))
    }

    /// Set per-unit operation count.
    pub fn with_ops_per_unit(mut self, ops_per_unit: usize) -> Self {
        self.ops_per_unit = ops_per_unit;
        self
    }

    /// Set contention window.
    pub fn with_window(mut self, window: ContentionWindow) -> Self {
        self.window = window;
        self
    }

    /// Set calibration trial count.
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    /// Set order amount.
    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = amount;
        self
    }

    /// Keep journal records in reports.
    pub fn with_journal(mut self, keep_journal: bool) -> Self {
        self.keep_journal = keep_journal;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_builder_overrides_work() {
        let default = ScenarioConfig::default();
        assert_eq!(default.scenario, ScenarioKind::Order);
        assert_eq!(default.unit_count, 5);
        assert_eq!(default.guard, GuardMode::Entity);
        assert_eq!(default.trials, 100);

        let cfg = ScenarioConfig::new(ScenarioKind::Collection)
            .with_units(10)
            .with_ops_per_unit(1000)
            .guarded(false)
            .with_window(ContentionWindow::Spin { iterations: 64 })
            .with_trials(3)
            .with_journal(true);

        assert_eq!(cfg.scenario, ScenarioKind::Collection);
        assert_eq!(cfg.unit_count, 10);
        assert_eq!(cfg.ops_per_unit, 1000);
        assert_eq!(cfg.guard, GuardMode::Unguarded);
        assert_eq!(cfg.window, ContentionWindow::Spin { iterations: 64 });
        assert_eq!(cfg.trials, 3);
        assert!(cfg.keep_journal);
    }

    #[test]
    fn windows_parse_from_cli_syntax() {
        assert_eq!("none".parse(), Ok(ContentionWindow::None));
        assert_eq!("yield".parse(), Ok(ContentionWindow::Yield));
        assert_eq!(
            "spin:250".parse(),
            Ok(ContentionWindow::Spin { iterations: 250 })
        );
        assert_eq!(
            "sleep:100".parse(),
            Ok(ContentionWindow::Sleep { micros: 100 })
        );
        assert!("spin".parse::<ContentionWindow>().is_err());
        assert!("sleep:abc".parse::<ContentionWindow>().is_err());
        assert!("yield:3".parse::<ContentionWindow>().is_err());
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in ScenarioKind::ALL {
            assert_eq!(kind.name().parse::<ScenarioKind>(), Ok(kind));
        }
        for guard in [GuardMode::Unguarded, GuardMode::Entity, GuardMode::Caller] {
            assert_eq!(guard.name().parse::<GuardMode>(), Ok(guard));
        }
        assert!("bogus".parse::<ScenarioKind>().is_err());
    }

    #[test]
    fn partial_json_config_fills_defaults() {
        let cfg: ScenarioConfig = serde_json::from_str(
            r#"{"scenario":"lazy","unit_count":50,"guard":"unguarded","window":{"kind":"sleep","micros":10}}"#,
        )
        .expect("config should parse");
        assert_eq!(cfg.scenario, ScenarioKind::Lazy);
        assert_eq!(cfg.unit_count, 50);
        assert_eq!(cfg.guard, GuardMode::Unguarded);
        assert_eq!(cfg.window, ContentionWindow::Sleep { micros: 10 });
        assert_eq!(cfg.trials, 100);
    }
}
