//! Order amount strategies.

use proptest::prelude::*;

use crate::state::Amount;

/// Amounts in `[min_cents, max_cents]`.
pub fn amounts(min_cents: u64, max_cents: u64) -> impl Strategy<Value = Amount> {
    assert!(max_cents >= min_cents, "max must be >= min");
    (min_cents..=max_cents).prop_map(Amount::from_cents)
}

/// Amounts aligned to `tick_cents` in `[min_cents, max_cents]`.
pub fn tick_aligned_amounts(
    min_cents: u64,
    max_cents: u64,
    tick_cents: u64,
) -> impl Strategy<Value = Amount> {
    assert!(tick_cents > 0, "tick must be positive");
    assert!(max_cents >= min_cents, "max must be >= min");

    let min_ticks = min_cents.div_ceil(tick_cents);
    let max_ticks = max_cents / tick_cents;
    assert!(max_ticks >= min_ticks, "no valid ticks in range");

    (min_ticks..=max_ticks).prop_map(move |t| Amount::from_cents(t * tick_cents))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn tick_alignment_holds(amount in tick_aligned_amounts(1_00, 100_00, 25)) {
            prop_assert_eq!(amount.cents() % 25, 0);
            prop_assert!(amount.cents() >= 1_00 && amount.cents() <= 100_00);
        }

        #[test]
        fn amounts_respect_range(amount in amounts(5, 50)) {
            prop_assert!((5..=50).contains(&amount.cents()));
        }
    }
}
