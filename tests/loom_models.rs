#![cfg(feature = "loom")]

use race_harness::prelude::*;

#[test]
fn guarded_kernels_hold_through_the_prelude() {
    assert_loom_model(PaymentKernel {
        guarded: true,
        units: 2,
    });
    assert_eq!(max_lazy_allocations(true, 2), 1);
}

#[test]
fn unguarded_kernels_admit_the_race() {
    assert!(max_payment_transitions(false, 2) > 1);
    assert!(max_lazy_allocations(false, 2) > 1);
}
