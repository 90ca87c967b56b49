//! Lazily materialized singleton.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::config::ContentionWindow;
use crate::journal::{Journal, RecordKind};
use crate::sync::Exclusive;

/// Contents of the singleton reference.
#[derive(Debug)]
pub enum Slot<R> {
    /// Nothing materialized yet.
    Absent,
    /// Materialized resource.
    Present(Arc<R>),
}

impl<R> Clone for Slot<R> {
    fn clone(&self) -> Self {
        match self {
            Slot::Absent => Slot::Absent,
            Slot::Present(resource) => Slot::Present(Arc::clone(resource)),
        }
    }
}

type Factory<R> = Box<dyn Fn(usize) -> R + Send + Sync>;

/// Memoized accessor whose first call allocates the resource.
///
/// The slot mutex is only ever held for a single load or a single store, so it makes each access
/// indivisible without making check-allocate-store indivisible. That is the job of `init`.
pub struct LazySingleton<R> {
    slot: Mutex<Slot<R>>,
    init: Exclusive,
    allocations: AtomicUsize,
    factory: Factory<R>,
    window: ContentionWindow,
    journal: Arc<Journal>,
}

impl<R> fmt::Debug for LazySingleton<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySingleton")
            .field("present", &self.is_present())
            .field("allocations", &self.allocations())
            .finish_non_exhaustive()
    }
}

impl<R> LazySingleton<R> {
    /// Absent singleton built by `factory`, which receives the zero-based allocation number.
    pub fn new(factory: impl Fn(usize) -> R + Send + Sync + 'static) -> Self {
        Self {
            slot: Mutex::new(Slot::Absent),
            init: Exclusive::new(),
            allocations: AtomicUsize::new(0),
            factory: Box::new(factory),
            window: ContentionWindow::None,
            journal: Arc::new(Journal::new()),
        }
    }

    /// Pause between the absent check and the allocation.
    pub fn with_window(mut self, window: ContentionWindow) -> Self {
        self.window = window;
        self
    }

    /// Record allocations into a shared journal.
    pub fn with_journal(mut self, journal: Arc<Journal>) -> Self {
        self.journal = journal;
        self
    }

    /// Materialize under mutual exclusion; exactly one allocation ever happens.
    pub fn get(&self, unit: Option<usize>) -> Arc<R> {
        if let Slot::Present(resource) = self.load() {
            return resource;
        }
        let _section = self.init.acquire();
        self.get_unguarded(unit)
    }

    /// Materialize with no exclusion; racing callers may each allocate and receive distinct
    /// instances, and the last store wins.
    pub fn get_unguarded(&self, unit: Option<usize>) -> Arc<R> {
        if let Slot::Present(resource) = self.load() {
            return resource;
        }
        self.window.apply();
        let fresh = self.allocate(unit);
        *self.slot.lock() = Slot::Present(Arc::clone(&fresh));
        fresh
    }

    /// Stored resource without materializing it.
    pub fn peek(&self) -> Option<Arc<R>> {
        match self.load() {
            Slot::Present(resource) => Some(resource),
            Slot::Absent => None,
        }
    }

    /// Whether the slot holds a resource.
    pub fn is_present(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Present(_))
    }

    /// Number of allocations performed.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// The initialization lock.
    pub fn lock(&self) -> &Exclusive {
        &self.init
    }

    fn load(&self) -> Slot<R> {
        self.slot.lock().clone()
    }

    fn allocate(&self, unit: Option<usize>) -> Arc<R> {
        let number = self.allocations.fetch_add(1, Ordering::SeqCst);
        self.journal.record(
            unit,
            RecordKind::Allocated,
            format!("allocated instance #{number}"),
        );
        Arc::new((self.factory)(number))
    }
}

/// Count distinct allocations among `handles` by pointer identity.
pub fn distinct_allocations<R>(handles: &[Arc<R>]) -> usize {
    let mut seen: Vec<*const R> = Vec::new();
    for handle in handles {
        let ptr = Arc::as_ptr(handle);
        if !seen.contains(&ptr) {
            seen.push(ptr);
        }
    }
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Resource(usize);

    #[test]
    fn first_get_allocates_once_and_memoizes() {
        let lazy = LazySingleton::new(Resource);
        assert!(!lazy.is_present());
        assert!(lazy.peek().is_none());

        let first = lazy.get(Some(0));
        let second = lazy.get_unguarded(Some(1));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, Resource(0));
        assert_eq!(lazy.allocations(), 1);
        assert!(lazy.peek().is_some());
    }

    #[test]
    fn guarded_get_hands_out_one_allocation_to_fifty_callers() {
        let lazy = LazySingleton::new(Resource).with_window(ContentionWindow::Yield);
        let handles = std::thread::scope(|s| {
            let workers: Vec<_> = (0..50)
                .map(|unit| {
                    let lazy = &lazy;
                    s.spawn(move || lazy.get(Some(unit)))
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().expect("worker should join"))
                .collect::<Vec<_>>()
        });
        assert_eq!(distinct_allocations(&handles), 1);
        assert_eq!(lazy.allocations(), 1);
    }

    #[test]
    fn distinct_allocations_uses_identity_not_equality() {
        let a = Arc::new(Resource(1));
        let b = Arc::new(Resource(1));
        assert_eq!(distinct_allocations(&[Arc::clone(&a), Arc::clone(&a)]), 1);
        assert_eq!(distinct_allocations(&[a, b]), 2);
        assert_eq!(distinct_allocations::<Resource>(&[]), 0);
    }
}
