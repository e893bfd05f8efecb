//! # Batch Ledger
//!
//! Pure rules over a product's batches: consumption order, FIFO draw
//! planning, and single-batch consumption. The database layer loads the
//! batches, asks this module what to do, and applies the result.
//!
//! ## FIFO Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sort key: (expiration_date NULLS LAST, created_at, insertion order)    │
//! │                                                                         │
//! │   B1 exp 2026-03-01  5.000 ─┐                                           │
//! │   B2 exp 2026-05-01  5.000 ─┼──► sell 7.000                             │
//! │   B3 exp  (none)     9.000 ─┘                                           │
//! │                                                                         │
//! │   plan: B1 -5.000 (exhausted, deleted)                                  │
//! │         B2 -2.000 (3.000 left)                                          │
//! │         B3 untouched                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The final tie-break (insertion order) comes from a stable sort over the
//! input slice, so callers must hand batches over in insertion order.

use rust_decimal::Decimal;
use std::cmp::Ordering;

use crate::error::{CoreError, CoreResult};
use crate::types::Batch;

// =============================================================================
// Ordering
// =============================================================================

/// Compares two batches by consumption priority.
///
/// Batches with an expiration date come before batches without one; equal
/// expirations fall back to creation time.
pub fn fifo_cmp(a: &Batch, b: &Batch) -> Ordering {
    let by_expiry = match (a.expiration_date, b.expiration_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_expiry.then_with(|| a.created_at.cmp(&b.created_at))
}

/// Sorts batches into consumption order in place (stable).
pub fn sort_fifo(batches: &mut [Batch]) {
    batches.sort_by(fifo_cmp);
}

/// Exact sum of batch quantities.
pub fn total(batches: &[Batch]) -> Decimal {
    batches.iter().fold(Decimal::ZERO, |acc, b| acc + b.quantity)
}

// =============================================================================
// Draw Planning
// =============================================================================

/// One step of a FIFO walk: take `amount` from `batch_id`, leaving
/// `remaining` in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub batch_id: String,
    pub amount: Decimal,
    pub remaining: Decimal,
}

impl Draw {
    /// A draw that empties its batch; the batch must be deleted.
    pub fn exhausts_batch(&self) -> bool {
        self.remaining.is_zero()
    }
}

/// Plans a greedy FIFO walk taking `requested` from `batches`.
///
/// `cached_stock` is the aggregate the caller already checked `requested`
/// against. If the batches cannot cover `requested` the ledger and the
/// aggregate disagree, which is reported as
/// [`CoreError::LedgerInconsistency`] rather than clamped.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use rust_decimal::Decimal;
/// use tally_core::ledger::plan_draws;
/// use tally_core::types::Batch;
///
/// let now = Utc::now();
/// let batch = |id: &str, qty: i64| Batch {
///     id: id.to_string(),
///     product_id: "p".to_string(),
///     quantity: Decimal::new(qty, 0),
///     purchase_price_cents: None,
///     supplier: None,
///     expiration_date: None,
///     created_at: now,
/// };
/// let batches = vec![batch("a", 5), batch("b", 5)];
///
/// let draws = plan_draws("p", &batches, Decimal::new(7, 0), Decimal::new(10, 0)).unwrap();
/// assert_eq!(draws.len(), 2);
/// assert!(draws[0].exhausts_batch());
/// assert_eq!(draws[1].remaining, Decimal::new(3, 0));
/// ```
pub fn plan_draws(
    product_id: &str,
    batches: &[Batch],
    requested: Decimal,
    cached_stock: Decimal,
) -> CoreResult<Vec<Draw>> {
    let mut ordered: Vec<&Batch> = batches
        .iter()
        .filter(|b| b.quantity > Decimal::ZERO)
        .collect();
    ordered.sort_by(|a, b| fifo_cmp(a, b));

    let mut remaining = requested;
    let mut draws = Vec::new();

    for batch in ordered {
        if remaining <= Decimal::ZERO {
            break;
        }
        let amount = remaining.min(batch.quantity);
        draws.push(Draw {
            batch_id: batch.id.clone(),
            amount,
            remaining: batch.quantity - amount,
        });
        remaining -= amount;
    }

    if remaining > Decimal::ZERO {
        return Err(CoreError::LedgerInconsistency {
            product_id: product_id.to_string(),
            expected: cached_stock,
            found: total(batches),
        });
    }

    Ok(draws)
}

// =============================================================================
// Consumption
// =============================================================================

/// Takes `amount` from a batch and returns the quantity left in it.
///
/// A result of exactly zero means the batch must be deleted.
pub fn consume(batch: &Batch, amount: Decimal) -> CoreResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidQuantity { quantity: amount });
    }
    if amount > batch.quantity {
        return Err(CoreError::InsufficientBatchStock {
            batch_id: batch.id.clone(),
            available: batch.quantity,
            requested: amount,
        });
    }
    Ok(batch.quantity - amount)
}

// =============================================================================
// Unit Tests
// =============================================================================
