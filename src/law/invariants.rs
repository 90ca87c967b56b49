//! Final-state invariants checked after every unit has been joined.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::InvariantViolation;
use crate::state::distinct_allocations;

/// Checks final state for one scenario run, producing [`InvariantViolation`]s that name the
/// scenario and unit count.
#[derive(Debug, Clone)]
pub struct Verifier {
    scenario: String,
    unit_count: usize,
}

impl Verifier {
    /// Verifier for a run of `scenario` with `unit_count` units.
    pub fn new(scenario: impl Into<String>, unit_count: usize) -> Self {
        Self {
            scenario: scenario.into(),
            unit_count,
        }
    }

    /// `actual` must equal `expected`.
    pub fn exactly(
        &self,
        invariant: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), InvariantViolation> {
        if actual == expected {
            Ok(())
        } else {
            Err(self.violation(invariant, expected.to_string(), actual.to_string()))
        }
    }

    /// `actual` must not exceed `bound`.
    pub fn at_most(
        &self,
        invariant: &'static str,
        bound: usize,
        actual: usize,
    ) -> Result<(), InvariantViolation> {
        if actual <= bound {
            Ok(())
        } else {
            Err(self.violation(invariant, format!("at most {bound}"), actual.to_string()))
        }
    }

    /// Every handle must point at the same allocation.
    pub fn same_allocation<T>(
        &self,
        invariant: &'static str,
        handles: &[Arc<T>],
    ) -> Result<(), InvariantViolation> {
        let distinct = distinct_allocations(handles);
        if distinct <= 1 {
            Ok(())
        } else {
            Err(self.violation(
                invariant,
                "1 distinct allocation".to_string(),
                format!("{distinct} distinct allocations"),
            ))
        }
    }

    /// `actual` must equal `expected` element for element.
    pub fn sequence<T>(
        &self,
        invariant: &'static str,
        expected: &[T],
        actual: &[T],
    ) -> Result<(), InvariantViolation>
    where
        T: PartialEq + Debug,
    {
        if actual == expected {
            Ok(())
        } else {
            Err(self.violation(invariant, format!("{expected:?}"), format!("{actual:?}")))
        }
    }

    fn violation(
        &self,
        invariant: &'static str,
        expected: String,
        actual: String,
    ) -> InvariantViolation {
        let violation = InvariantViolation {
            scenario: self.scenario.clone(),
            unit_count: self.unit_count,
            invariant,
            expected,
            actual,
        };
        tracing::warn!(%violation, "invariant violated");
        violation
    }
}

/// Assert that a side effect happened exactly once.
pub fn assert_exactly_once(what: &str, count: usize) {
    assert_eq!(count, 1, "{what} happened {count} time(s), expected exactly once");
}

/// Assert that every handle shares one allocation.
pub fn assert_same_allocation<T>(handles: &[Arc<T>]) {
    let distinct = distinct_allocations(handles);
    assert!(
        distinct <= 1,
        "expected a single shared allocation, found {distinct} distinct allocations"
    );
}

/// Assert that no update was lost: `len == units * ops_per_unit`.
pub fn assert_no_lost_updates(len: usize, units: usize, ops_per_unit: usize) {
    let expected = units * ops_per_unit;
    assert_eq!(
        len, expected,
        "lost {} update(s): {units} unit(s) x {ops_per_unit} op(s) produced {len} element(s)",
        expected.saturating_sub(len)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_checks_return_ok() {
        let verifier = Verifier::new("order", 5);
        assert!(verifier.exactly("transitions", 1, 1).is_ok());
        assert!(verifier.at_most("allocations", 1, 0).is_ok());
        let shared = Arc::new(3_u8);
        assert!(
            verifier
                .same_allocation("identity", &[Arc::clone(&shared), shared])
                .is_ok()
        );
        assert!(verifier.sequence("history", &[1, 2], &[1, 2]).is_ok());
    }

    #[test]
    fn violations_carry_context() {
        let verifier = Verifier::new("collection", 10);
        let violation = verifier.exactly("final length", 10_000, 9_998).unwrap_err();
        assert_eq!(violation.scenario, "collection");
        assert_eq!(violation.unit_count, 10);
        assert_eq!(violation.invariant, "final length");
        assert_eq!(violation.expected, "10000");
        assert_eq!(violation.actual, "9998");

        let violation = verifier.at_most("allocations", 1, 3).unwrap_err();
        assert_eq!(violation.expected, "at most 1");

        let violation = verifier
            .same_allocation("identity", &[Arc::new(1_u8), Arc::new(1_u8)])
            .unwrap_err();
        assert_eq!(violation.actual, "2 distinct allocations");

        let violation = verifier.sequence("history", &[1, 2], &[1]).unwrap_err();
        assert_eq!(violation.expected, "[1, 2]");
    }

    #[test]
    fn assertion_helpers_accept_clean_state() {
        assert_exactly_once("payment", 1);
        assert_same_allocation(&[Arc::new(())]);
        assert_no_lost_updates(10_000, 10, 1000);
    }

    #[test]
    #[should_panic(expected = "expected exactly once")]
    fn double_payment_panics() {
        assert_exactly_once("payment", 2);
    }

    #[test]
    #[should_panic(expected = "lost 2 update(s)")]
    fn lost_updates_panic() {
        assert_no_lost_updates(8, 2, 5);
    }
}
