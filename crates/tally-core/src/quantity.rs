//! # Quantity Normalization
//!
//! The single rounding rule every quantity passes through before it is
//! compared, stored or returned.
//!
//! ## The Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  normalize(q, decimal_places)                                           │
//! │                                                                         │
//! │  1. decimal_places == 0 && round_half_up(q, 4) has a fraction           │
//! │        → FractionalQuantityNotAllowed                                   │
//! │  2. q'' = round_half_up(q, decimal_places)   ← one rounding step        │
//! │                                                                         │
//! │  normalize_positive: same, then q'' <= 0 → InvalidQuantity              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing else in the workspace re-derives rounding. The parse helpers at
//! the bottom exist for boundaries that receive quantities as text.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::MAX_DECIMAL_PLACES;

/// Rounds `value` half-up (away from zero on a tie) to `dp` places.
#[inline]
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Normalizes a quantity to a unit's precision.
///
/// `decimal_places` above [`MAX_DECIMAL_PLACES`] are clamped to it.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::quantity::normalize;
///
/// assert_eq!(normalize(Decimal::new(15, 1), 1).unwrap(), Decimal::new(15, 1));
/// assert_eq!(normalize(Decimal::new(1005, 3), 2).unwrap().to_string(), "1.01");
/// assert!(normalize(Decimal::new(25, 1), 0).is_err());
/// ```
pub fn normalize(quantity: Decimal, decimal_places: u32) -> CoreResult<Decimal> {
    let dp = decimal_places.min(MAX_DECIMAL_PLACES);

    if dp == 0 {
        let stored = round_half_up(quantity, MAX_DECIMAL_PLACES);
        if !stored.fract().is_zero() {
            return Err(CoreError::FractionalQuantityNotAllowed { quantity: stored });
        }
    }

    let mut normalized = round_half_up(quantity, dp);
    // Keep a fixed scale so "7" and "7.000" render the same way everywhere.
    normalized.rescale(dp);
    Ok(normalized)
}

/// Normalizes and rejects anything that is not strictly positive.
pub fn normalize_positive(quantity: Decimal, decimal_places: u32) -> CoreResult<Decimal> {
    let normalized = normalize(quantity, decimal_places)?;
    if normalized <= Decimal::ZERO {
        return Err(CoreError::InvalidQuantity {
            quantity: normalized,
        });
    }
    Ok(normalized)
}

/// Parses a decimal quantity from its string form.
///
/// Floats never enter the ledger; text such as `"1.235"` is the only
/// accepted wire form.
pub fn parse_quantity(field: &str, raw: &str) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Decimal::from_str(trimmed).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Sums quantities exactly.
pub fn sum<'a, I>(quantities: I) -> Decimal
where
    I: IntoIterator<Item = &'a Decimal>,
{
    quantities
        .into_iter()
        .fold(Decimal::ZERO, |acc, q| acc + *q)
}
