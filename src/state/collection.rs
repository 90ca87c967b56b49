//! Shared append-only collection.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ContentionWindow;
use crate::journal::{Journal, RecordKind};
use crate::sync::Exclusive;

/// Growable sequence appended to by many units.
///
/// An append is two steps: read the current length, then write the element at that index and
/// bump the length. Each step is indivisible on its own; only the guarded path makes the pair
/// indivisible. Two unguarded appends that read the same length write to the same index and
/// one of them is lost.
#[derive(Debug)]
pub struct Collection<T> {
    items: Mutex<Vec<T>>,
    lock: Exclusive,
    window: ContentionWindow,
    journal: Arc<Journal>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Collection<T> {
    /// Empty collection.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            lock: Exclusive::new(),
            window: ContentionWindow::None,
            journal: Arc::new(Journal::new()),
        }
    }

    /// Pause between reading the length and writing the element.
    pub fn with_window(mut self, window: ContentionWindow) -> Self {
        self.window = window;
        self
    }

    /// Record appends into a shared journal.
    pub fn with_journal(mut self, journal: Arc<Journal>) -> Self {
        self.journal = journal;
        self
    }

    /// Append with the read-length/write pair under the collection's lock.
    pub fn append(&self, value: T, unit: Option<usize>) {
        let _section = self.lock.acquire();
        self.append_unguarded(value, unit);
    }

    /// Append with no exclusion; concurrent appends may overwrite each other.
    pub fn append_unguarded(&self, value: T, unit: Option<usize>) {
        let index = self.items.lock().len();
        self.window.apply();
        {
            let mut items = self.items.lock();
            items.truncate(index);
            items.push(value);
        }
        self.journal
            .record(unit, RecordKind::Appended, format!("appended at index {index}"));
    }

    /// Current length.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// The collection's lock.
    pub fn lock(&self) -> &Exclusive {
        &self.lock
    }

    /// Journal receiving append records.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Consume the collection, returning its elements.
    pub fn into_inner(self) -> Vec<T> {
        self.items.into_inner()
    }
}

impl<T: Clone> Collection<T> {
    /// Copy of the current elements.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().clone()
    }
}
