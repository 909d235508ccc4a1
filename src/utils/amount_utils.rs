//! Signed delta arithmetic over token amounts
//!
//! Balance changes are tracked as `I256` so that a single map entry can hold
//! either a net gain or a net loss. Amounts above `I256::MAX` saturate.

use alloy::primitives::{I256, U256};

/// Converts an unsigned amount into a positive delta
pub fn to_delta(amount: U256) -> I256 {
    I256::try_from(amount).unwrap_or(I256::MAX)
}

/// Adds `amount` to `delta`, returning the new value
pub fn credit(delta: I256, amount: U256) -> I256 {
    delta.saturating_add(to_delta(amount))
}

/// Subtracts `amount` from `delta`, returning the new value
pub fn debit(delta: I256, amount: U256) -> I256 {
    delta.saturating_sub(to_delta(amount))
}
