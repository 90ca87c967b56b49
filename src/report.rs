//! Human-readable and JSON rendering of scenario results.

use std::fmt::Write as _;

use crate::scenario::{CalibrationReport, FinalState, ScenarioReport};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Plain text lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Render a single-trial report.
pub fn render_scenario(
    report: &ScenarioReport,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(report),
        ReportFormat::Text => Ok(scenario_text(report)),
    }
}

/// Render a calibration report.
pub fn render_calibration(
    report: &CalibrationReport,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(report),
        ReportFormat::Text => Ok(calibration_text(report)),
    }
}

fn scenario_text(report: &ScenarioReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "scenario: {} (guard={}, units={}, ops_per_unit={})",
        report.scenario,
        report.guard.name(),
        report.unit_count,
        report.ops_per_unit
    );
    let _ = writeln!(out, "final state: {}", final_state_text(&report.final_state));
    let _ = writeln!(out, "transitions: {}", report.transition_count);
    let _ = writeln!(out, "elapsed: {}us", report.elapsed_us);
    if let Some(journal) = &report.journal {
        for record in journal {
            match record.unit {
                Some(unit) => {
                    let _ = writeln!(out, "[unit {unit}] {}", record.message);
                }
                None => {
                    let _ = writeln!(out, "[harness] {}", record.message);
                }
            }
        }
    }
    match &report.violation {
        Some(violation) => {
            let _ = writeln!(out, "RACE: {violation}");
        }
        None => {
            let _ = writeln!(out, "clean");
        }
    }
    out
}

fn final_state_text(state: &FinalState) -> String {
    match state {
        FinalState::Order {
            status,
            amount,
            transitions,
            payment_records,
        } => format!(
            "order {amount} {status:?}, {transitions} transition(s), {payment_records} payment record(s)"
        ),
        FinalState::Lazy {
            allocations,
            distinct_handles,
            lookups,
        } => format!(
            "{allocations} allocation(s), {distinct_handles} distinct handle(s) over {lookups} lookup(s)"
        ),
        FinalState::Collection { len, expected } => format!("length {len} of {expected}"),
        FinalState::Uploader {
            published,
            expected,
            result_collections,
        } => format!(
            "{published} of {expected} result(s) published, {result_collections} results collection(s) created"
        ),
        FinalState::Wakeup {
            histories,
            premature_wakeups,
        } => format!(
            "{} gate(s) cycled, {premature_wakeups} premature wakeup(s)",
            histories.len()
        ),
    }
}

fn calibration_text(report: &CalibrationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "scenario: {} (guard={}, units={})",
        report.scenario,
        report.guard.name(),
        report.unit_count
    );
    let _ = writeln!(
        out,
        "trials: {}/{}{}",
        report.trials_run,
        report.trials_requested,
        if report.interrupted { " (interrupted)" } else { "" }
    );
    let _ = writeln!(out, "violations: {}", report.violations);
    let _ = writeln!(out, "max transitions: {}", report.max_transition_count);
    let _ = writeln!(out, "total elapsed: {}us", report.total_elapsed_us);
    match &report.first_violation {
        Some(violation) => {
            let _ = writeln!(out, "RACE: {violation}");
        }
        None => {
            let _ = writeln!(out, "no race condition this time");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GuardMode, ScenarioKind};
    use crate::journal::{Record, RecordKind};

    fn sample() -> ScenarioReport {
        ScenarioReport {
            scenario: ScenarioKind::Collection,
            guard: GuardMode::Entity,
            unit_count: 2,
            ops_per_unit: 1,
            final_state: FinalState::Collection {
                len: 2,
                expected: 2,
            },
            transition_count: 2,
            elapsed_us: 42,
            violation: None,
            journal: Some(vec![Record {
                unit: Some(1),
                kind: RecordKind::Appended,
                message: "appended at index 0".to_string(),
            }]),
        }
    }

    #[test]
    fn text_report_lists_state_journal_and_verdict() {
        let text = render_scenario(&sample(), ReportFormat::Text).expect("render");
        assert!(text.contains("scenario: collection (guard=entity, units=2, ops_per_unit=1)"));
        assert!(text.contains("final state: length 2 of 2"));
        assert!(text.contains("[unit 1] appended at index 0"));
        assert!(text.ends_with("clean\n"));
    }

    #[test]
    fn json_report_is_tagged() {
        let json = render_scenario(&sample(), ReportFormat::Json).expect("render");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["scenario"], "collection");
        assert_eq!(value["guard"], "entity");
        assert_eq!(value["final_state"]["kind"], "collection");
        assert_eq!(value["journal"][0]["kind"], "appended");
        assert!(value["violation"].is_null());
    }

    #[test]
    fn calibration_text_reports_clean_runs() {
        let report = CalibrationReport {
            scenario: ScenarioKind::Order,
            guard: GuardMode::Entity,
            unit_count: 5,
            trials_requested: 100,
            trials_run: 100,
            violations: 0,
            first_violation: None,
            max_transition_count: 1,
            total_elapsed_us: 1000,
            interrupted: false,
        };
        let text = render_calibration(&report, ReportFormat::Text).expect("render");
        assert!(text.contains("trials: 100/100\n"));
        assert!(text.contains("no race condition this time"));
    }
}
