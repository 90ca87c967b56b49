//! Side-effect journal.
//!
//! Every observable action a work unit performs (collecting a payment, allocating a resource,
//! appending, suspending) is written here and mirrored to `tracing`. Verification counts records
//! instead of inspecting final state, because a check-then-act race that writes the same value
//! twice leaves no trace in the state itself.

use parking_lot::Mutex;
use serde::Serialize;

/// Kind of side effect recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// "collecting payment" on an order.
    PaymentCollected,
    /// A lazily initialized resource was allocated.
    Allocated,
    /// An element was appended to a shared collection.
    Appended,
    /// A file upload finished.
    Uploaded,
    /// A unit parked itself on a gate.
    Suspended,
    /// A parked unit was released.
    Resumed,
    /// A unit reached natural completion.
    Terminated,
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Unit that performed the action, when known.
    pub unit: Option<usize>,
    /// Kind of action.
    pub kind: RecordKind,
    /// Human-readable line.
    pub message: String,
}

/// Append-only, thread-safe journal of side effects.
#[derive(Debug, Default)]
pub struct Journal {
    records: Mutex<Vec<Record>>,
}

impl Journal {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record and emit it as a tracing event.
    pub fn record(&self, unit: Option<usize>, kind: RecordKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            RecordKind::Appended => tracing::trace!(?unit, ?kind, "{message}"),
            _ => tracing::info!(?unit, ?kind, "{message}"),
        }
        self.records.lock().push(Record {
            unit,
            kind,
            message,
        });
    }

    /// Number of records of `kind`.
    pub fn count(&self, kind: RecordKind) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| record.kind == kind)
            .count()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Kinds in recording order.
    pub fn kinds(&self) -> Vec<RecordKind> {
        self.records.lock().iter().map(|record| record.kind).collect()
    }

    /// Copy of every record.
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind_and_preserves_order() {
        let journal = Journal::new();
        assert!(journal.is_empty());
        journal.record(Some(0), RecordKind::Suspended, "child sleeping");
        journal.record(None, RecordKind::Resumed, "wakeup");
        journal.record(Some(0), RecordKind::Terminated, "child woke up");
        journal.record(Some(1), RecordKind::PaymentCollected, "collecting payment");

        assert_eq!(journal.len(), 4);
        assert_eq!(journal.count(RecordKind::PaymentCollected), 1);
        assert_eq!(journal.count(RecordKind::Appended), 0);
        assert_eq!(
            journal.kinds(),
            vec![
                RecordKind::Suspended,
                RecordKind::Resumed,
                RecordKind::Terminated,
                RecordKind::PaymentCollected
            ]
        );
        assert_eq!(journal.snapshot()[1].unit, None);
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let journal = Journal::new();
        std::thread::scope(|s| {
            for unit in 0..8 {
                let journal = &journal;
                s.spawn(move || {
                    for _ in 0..100 {
                        journal.record(Some(unit), RecordKind::Appended, "append");
                    }
                });
            }
        });
        assert_eq!(journal.count(RecordKind::Appended), 800);
    }
}
