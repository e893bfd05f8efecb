//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units ("cents")                            │
//! │    price 12.50 is stored as 1250                                        │
//! │    price × 1.235 kg is computed in Decimal, then rounded ONCE          │
//! │    half-up back to whole cents                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(1250); // 12.50 per kg
//! let line = price.multiply_quantity(Decimal::new(1235, 3)).unwrap(); // 1.235 kg
//! assert_eq!(line.cents(), 1544); // 15.4375 → 15.44
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::{LOYALTY_POINT_CENTS, MAX_AMOUNT_CENTS};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for corrections
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Serializes as a plain integer of minor units
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.sale_price ──► TransactionItem.unit_price ──► line_total      │
/// │                                                          │              │
/// │                                  Transaction.total ◄─────┘              │
/// │                                         │                               │
/// │              Customer.total_spent / debt / loyalty_points               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from a decimal amount in major units,
    /// rounding half-up to whole minor units.
    ///
    /// Returns `None` when the amount does not fit in an i64 of cents.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    ///
    /// let m = Money::from_decimal(Decimal::new(10995, 3)).unwrap(); // 10.995
    /// assert_eq!(m.cents(), 1100);
    /// ```
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        let cents = (amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        cents.to_i64().map(Money)
    }

    /// Returns the value as a decimal in major units (2 decimal places).
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).major(), 10);
    /// assert_eq!(Money::from_cents(-550).major(), -5);
    /// ```
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a decimal quantity.
    ///
    /// The product is computed exactly and rounded half-up to whole minor
    /// units once.
    ///
    /// ## Returns
    /// `None` when the result is outside `±MAX_AMOUNT_CENTS`.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(Decimal::new(3, 0)).unwrap().cents(), 897);
    /// // 2.99 × 0.5 = 1.495 → 1.50
    /// assert_eq!(unit_price.multiply_quantity(Decimal::new(5, 1)).unwrap().cents(), 150);
    /// ```
    pub fn multiply_quantity(&self, qty: Decimal) -> Option<Self> {
        let exact = Decimal::from(self.0).checked_mul(qty)?;
        let rounded = exact.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        rounded.to_i64().and_then(Money::bounded)
    }

    /// Sum of two amounts, `None` outside `±MAX_AMOUNT_CENTS`.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).and_then(Money::bounded)
    }

    fn bounded(cents: i64) -> Option<Self> {
        (-MAX_AMOUNT_CENTS..=MAX_AMOUNT_CENTS)
            .contains(&cents)
            .then_some(Money(cents))
    }

    /// Loyalty points earned by spending this amount: one point per
    /// `LOYALTY_POINT_CENTS` minor units, rounded down. Non-positive amounts
    /// earn nothing.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(12_345).loyalty_points(), 12); // 123.45 → 12
    /// assert_eq!(Money::from_cents(999).loyalty_points(), 0);
    /// ```
    pub const fn loyalty_points(&self) -> i64 {
        if self.0 <= 0 {
            0
        } else {
            self.0 / LOYALTY_POINT_CENTS
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount in major units with two decimals, no currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
