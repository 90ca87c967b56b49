//! Proptest strategies for scenario configurations.

pub mod amounts;
pub mod configs;

pub use amounts::{amounts, tick_aligned_amounts};
pub use configs::{contention_windows, guarded_configs, guarded_modes, unit_counts};
