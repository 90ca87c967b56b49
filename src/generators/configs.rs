//! Scenario configuration strategies.

use proptest::prelude::*;

use crate::config::{ContentionWindow, GuardMode, ScenarioConfig, ScenarioKind};

/// Unit counts in `[1, max]`.
pub fn unit_counts(max: usize) -> impl Strategy<Value = usize> {
    assert!(max >= 1, "max must be >= 1");
    1..=max
}

/// Guard modes that apply exclusion.
pub fn guarded_modes() -> impl Strategy<Value = GuardMode> {
    prop_oneof![Just(GuardMode::Entity), Just(GuardMode::Caller)]
}

/// Short contention windows, cheap enough for property runs.
pub fn contention_windows() -> impl Strategy<Value = ContentionWindow> {
    prop_oneof![
        1 => Just(ContentionWindow::None),
        2 => Just(ContentionWindow::Yield),
        1 => (1_u32..=64).prop_map(|iterations| ContentionWindow::Spin { iterations }),
    ]
}

/// Guarded configs for the shared-state scenarios, which must always verify clean.
pub fn guarded_configs(max_units: usize, max_ops: usize) -> impl Strategy<Value = ScenarioConfig> {
    assert!(max_ops >= 1, "max_ops must be >= 1");
    let scenarios = prop_oneof![
        Just(ScenarioKind::Order),
        Just(ScenarioKind::Lazy),
        Just(ScenarioKind::Collection),
        Just(ScenarioKind::Uploader),
    ];
    (
        scenarios,
        unit_counts(max_units),
        1..=max_ops,
        guarded_modes(),
        contention_windows(),
    )
        .prop_map(|(scenario, units, ops, guard, window)| {
            ScenarioConfig::new(scenario)
                .with_units(units)
                .with_ops_per_unit(ops)
                .with_guard(guard)
                .with_window(window)
        })
}
