//! Shared entities placed under contention.
//!
//! Every entity exposes a guarded operation and an unguarded twin. The unguarded twin is a
//! first-class scenario: it performs the same check-then-act with no exclusion so the hazard can
//! be observed, and it must stay that way.

pub mod collection;
pub mod lazy;
pub mod order;
pub mod uploader;

pub use collection::Collection;
pub use lazy::{LazySingleton, Slot, distinct_allocations};
pub use order::{Amount, Order, OrderStatus};
pub use uploader::{FileUploader, UploadStatus};
