//! Loom-backed model checking of the critical kernels.
//!
//! Random trials can only make a race likely. Under `loom::model` every interleaving of a small
//! kernel is explored, so the guarded kernels are proven race-free and the unguarded kernels are
//! proven to admit the bad schedule.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as StdOrdering};

use loom::sync::atomic::{AtomicBool, AtomicUsize as LoomAtomicUsize, Ordering};
use loom::sync::{Arc as LoomArc, Mutex};
use loom::thread;

/// Kernel runnable under `loom::model`.
pub trait LoomModel: Send + Sync + 'static {
    /// Execute the kernel under Loom instrumentation.
    fn run_model(&self);
}

/// Assert that a model holds under every explored schedule.
pub fn assert_loom_model<M>(model: M)
where
    M: LoomModel,
{
    let model = Arc::new(model);
    loom::model(move || {
        model.run_model();
    });
}

/// Payment check-then-set over `units` threads.
#[derive(Debug, Clone, Copy)]
pub struct PaymentKernel {
    /// Hold a lock across check and set.
    pub guarded: bool,
    /// Number of racing threads; keep at 2 or 3.
    pub units: usize,
}

impl PaymentKernel {
    /// Run one schedule and return how many transitions happened.
    fn transitions(&self) -> usize {
        let pending = LoomArc::new(AtomicBool::new(true));
        let transitions = LoomArc::new(LoomAtomicUsize::new(0));
        let lock = LoomArc::new(Mutex::new(()));

        let handles: Vec<_> = (0..self.units)
            .map(|_| {
                let pending = LoomArc::clone(&pending);
                let transitions = LoomArc::clone(&transitions);
                let lock = LoomArc::clone(&lock);
                let guarded = self.guarded;
                thread::spawn(move || {
                    let _section = guarded
                        .then(|| lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));
                    if pending.load(Ordering::SeqCst) {
                        transitions.fetch_add(1, Ordering::SeqCst);
                        pending.store(false, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            let _ = handle.join();
        }
        transitions.load(Ordering::SeqCst)
    }
}

impl LoomModel for PaymentKernel {
    fn run_model(&self) {
        let transitions = self.transitions();
        assert_eq!(transitions, 1, "payment collected {transitions} time(s)");
    }
}

/// Lazy check-allocate-store over `units` threads.
#[derive(Debug, Clone, Copy)]
pub struct LazyInitKernel {
    /// Hold a lock across check, allocate and store.
    pub guarded: bool,
    /// Number of racing threads; keep at 2 or 3.
    pub units: usize,
}

impl LazyInitKernel {
    fn allocations(&self) -> usize {
        let present = LoomArc::new(AtomicBool::new(false));
        let allocations = LoomArc::new(LoomAtomicUsize::new(0));
        let lock = LoomArc::new(Mutex::new(()));

        let handles: Vec<_> = (0..self.units)
            .map(|_| {
                let present = LoomArc::clone(&present);
                let allocations = LoomArc::clone(&allocations);
                let lock = LoomArc::clone(&lock);
                let guarded = self.guarded;
                thread::spawn(move || {
                    let _section = guarded
                        .then(|| lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));
                    if !present.load(Ordering::SeqCst) {
                        allocations.fetch_add(1, Ordering::SeqCst);
                        present.store(true, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            let _ = handle.join();
        }
        allocations.load(Ordering::SeqCst)
    }
}

impl LoomModel for LazyInitKernel {
    fn run_model(&self) {
        let allocations = self.allocations();
        assert_eq!(allocations, 1, "resource allocated {allocations} time(s)");
    }
}

/// Largest number of payment transitions over every schedule of the kernel.
pub fn max_payment_transitions(guarded: bool, units: usize) -> usize {
    let kernel = PaymentKernel { guarded, units };
    explore_max(move || kernel.transitions())
}

/// Largest number of lazy allocations over every schedule of the kernel.
pub fn max_lazy_allocations(guarded: bool, units: usize) -> usize {
    let kernel = LazyInitKernel { guarded, units };
    explore_max(move || kernel.allocations())
}

fn explore_max<F>(schedule: F) -> usize
where
    F: Fn() -> usize + Send + Sync + 'static,
{
    // Plain std atomic: it records results across schedules and is invisible to loom.
    let observed = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&observed);
    loom::model(move || {
        sink.fetch_max(schedule(), StdOrdering::SeqCst);
    });
    observed.load(StdOrdering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_payment_holds_in_every_schedule() {
        assert_loom_model(PaymentKernel {
            guarded: true,
            units: 2,
        });
    }

    #[test]
    fn unguarded_payment_admits_double_collection() {
        assert_eq!(max_payment_transitions(true, 2), 1);
        assert_eq!(max_payment_transitions(false, 2), 2);
    }

    #[test]
    fn guarded_lazy_init_allocates_once_in_every_schedule() {
        assert_loom_model(LazyInitKernel {
            guarded: true,
            units: 2,
        });
        assert_eq!(max_lazy_allocations(true, 2), 1);
    }

    #[test]
    fn unguarded_lazy_init_admits_double_allocation() {
        assert_eq!(max_lazy_allocations(false, 2), 2);
    }
}
