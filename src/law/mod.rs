//! Invariants over final shared state, plus loom model checks of the critical kernels.

pub mod invariants;
#[cfg(feature = "loom")]
#[cfg_attr(docsrs, doc(cfg(feature = "loom")))]
pub mod loom;

pub use invariants::{Verifier, assert_exactly_once, assert_no_lost_updates, assert_same_allocation};
