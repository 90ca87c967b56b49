//! Scoped mutual exclusion.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

/// Instrumented mutual-exclusion lock guarding a critical section.
///
/// The lock protects a *section*, not a value: shared state stays in its own atomics so that the
/// unguarded variant of an operation can touch the same fields without the lock. Release happens
/// when the returned guard is dropped, which covers early returns and unwinding alike; there is no
/// poisoning.
#[derive(Debug, Default)]
pub struct Exclusive {
    lock: Mutex<()>,
    holders: AtomicUsize,
    peak_holders: AtomicUsize,
    acquisitions: AtomicUsize,
}

/// Proof of exclusive access; releases on drop.
#[must_use = "the section is released as soon as the guard is dropped"]
pub struct ExclusiveGuard<'a> {
    owner: &'a Exclusive,
    _guard: MutexGuard<'a, ()>,
}

impl Exclusive {
    /// Unlocked primitive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the section is free and enter it.
    pub fn acquire(&self) -> ExclusiveGuard<'_> {
        let guard = self.lock.lock();
        self.enter();
        ExclusiveGuard {
            owner: self,
            _guard: guard,
        }
    }

    /// Enter the section only if nobody holds it.
    pub fn try_acquire(&self) -> Option<ExclusiveGuard<'_>> {
        let guard = self.lock.try_lock()?;
        self.enter();
        Some(ExclusiveGuard {
            owner: self,
            _guard: guard,
        })
    }

    /// Run `section` while holding the lock.
    pub fn synchronize<R>(&self, section: impl FnOnce() -> R) -> R {
        let _guard = self.acquire();
        section()
    }

    /// Total successful acquisitions.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Largest number of simultaneous holders ever observed. Always 0 or 1.
    pub fn peak_holders(&self) -> usize {
        self.peak_holders.load(Ordering::SeqCst)
    }

    /// Whether the section is currently held.
    pub fn is_held(&self) -> bool {
        self.lock.is_locked()
    }

    fn enter(&self) {
        let now = self.holders.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_holders.fetch_max(now, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        // Runs before the mutex guard field is dropped.
        self.owner.holders.fetch_sub(1, Ordering::SeqCst);
    }
}
