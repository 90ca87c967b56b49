//! Order record with a check-then-set payment transition.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::ContentionWindow;
use crate::journal::{Journal, RecordKind};
use crate::sync::Exclusive;

/// Decimal amount held as minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Amount from minor units.
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Minor units.
    pub const fn cents(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OrderStatus {
    /// Awaiting payment.
    Pending = 0,
    /// Payment collected.
    Paid = 1,
}

impl OrderStatus {
    fn from_u8(raw: u8) -> Self {
        if raw == OrderStatus::Paid as u8 {
            OrderStatus::Paid
        } else {
            OrderStatus::Pending
        }
    }
}

/// Order shared by every unit of a trial.
///
/// `status` is a single atomic so each read and each write is indivisible, while the
/// read-check-write sequence in [`Order::collect_payment_unguarded`] is not.
#[derive(Debug)]
pub struct Order {
    amount: Amount,
    status: AtomicU8,
    transitions: AtomicUsize,
    lock: Exclusive,
    window: ContentionWindow,
    journal: Arc<Journal>,
}

impl Order {
    /// Pending order for `amount`.
    pub fn new(amount: Amount) -> Self {
        Self {
            amount,
            status: AtomicU8::new(OrderStatus::Pending as u8),
            transitions: AtomicUsize::new(0),
            lock: Exclusive::new(),
            window: ContentionWindow::None,
            journal: Arc::new(Journal::new()),
        }
    }

    /// Pause between the pending check and the transition.
    pub fn with_window(mut self, window: ContentionWindow) -> Self {
        self.window = window;
        self
    }

    /// Record side effects into a shared journal.
    pub fn with_journal(mut self, journal: Arc<Journal>) -> Self {
        self.journal = journal;
        self
    }

    /// Order amount.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Current status.
    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Read-only pending predicate.
    pub fn is_pending(&self) -> bool {
        self.status() == OrderStatus::Pending
    }

    /// Number of times the pending-to-paid transition actually executed.
    pub fn transitions(&self) -> usize {
        self.transitions.load(Ordering::SeqCst)
    }

    /// Journal receiving "collecting payment" records.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// The entity's own lock.
    pub fn lock(&self) -> &Exclusive {
        &self.lock
    }

    /// Collect payment with the check and the transition under the order's lock.
    ///
    /// Returns whether this call performed the transition.
    pub fn collect_payment(&self, unit: Option<usize>) -> bool {
        let _section = self.lock.acquire();
        self.collect_payment_unguarded(unit)
    }

    /// Collect payment with no exclusion. Concurrent callers can all pass the check.
    pub fn collect_payment_unguarded(&self, unit: Option<usize>) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.window.apply();
        self.collect_payment_unchecked(unit);
        true
    }

    /// The bare act: log and mark paid without checking status.
    ///
    /// Callers that hold their own lock around [`Order::is_pending`] use this.
    pub fn collect_payment_unchecked(&self, unit: Option<usize>) {
        self.journal.record(
            unit,
            RecordKind::PaymentCollected,
            format!("collecting payment of {}", self.amount),
        );
        self.transitions.fetch_add(1, Ordering::SeqCst);
        self.status.store(OrderStatus::Paid as u8, Ordering::SeqCst);
    }
}
