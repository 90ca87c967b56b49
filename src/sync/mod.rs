//! Synchronization primitives used by guarded scenarios.

pub mod exclusive;
pub mod gate;

pub use exclusive::{Exclusive, ExclusiveGuard};
pub use gate::{Gate, GateState};
