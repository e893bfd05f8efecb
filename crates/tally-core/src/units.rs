//! # Unit Conversion
//!
//! Fixed conversion factors between unit-of-measure codes. Sale lines may be
//! entered in a "sell unit" (e.g. `cm` for a product stocked in `m`); the
//! entered amount is converted to the product's base unit here and then
//! normalized by [`crate::quantity::normalize`].
//!
//! ```text
//!   length   m ─×100─► cm ─×10─► mm        inch ─×2.54─► cm
//!            m ─×1000──────────► mm        cm ─×0.393701─► inch
//!   weight   kg ─×1000─► g
//!   volume   l  ─×1000─► ml
//!   count    pcs ◄─×1─► pack
//! ```
//!
//! A pair missing from the table falls back to the reciprocal of the
//! reverse pair; anything else is [`CoreError::IncompatibleUnits`].

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult};

/// `(from, to, factor)`; `quantity_in_to = quantity_in_from * factor`.
const CONVERSION_TABLE: &[(&str, &str, i64, u32)] = &[
    // length
    ("m", "cm", 100, 0),
    ("cm", "m", 1, 2),
    ("m", "mm", 1000, 0),
    ("mm", "m", 1, 3),
    ("cm", "mm", 10, 0),
    ("mm", "cm", 1, 1),
    ("inch", "cm", 254, 2),
    ("cm", "inch", 393_701, 6),
    // weight
    ("kg", "g", 1000, 0),
    ("g", "kg", 1, 3),
    // volume
    ("l", "ml", 1000, 0),
    ("ml", "l", 1, 3),
    // count
    ("pcs", "pack", 1, 0),
    ("pack", "pcs", 1, 0),
];

fn lookup(from: &str, to: &str) -> Option<Decimal> {
    CONVERSION_TABLE
        .iter()
        .find(|(f, t, _, _)| *f == from && *t == to)
        .map(|(_, _, mantissa, scale)| Decimal::new(*mantissa, *scale))
}

/// Returns the factor that converts a quantity in `from` into `to`.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::units::conversion_rate;
///
/// assert_eq!(conversion_rate("kg", "g").unwrap(), Decimal::new(1000, 0));
/// assert_eq!(conversion_rate("cm", "m").unwrap(), Decimal::new(1, 2));
/// assert!(conversion_rate("kg", "m").is_err());
/// ```
pub fn conversion_rate(from: &str, to: &str) -> CoreResult<Decimal> {
    if from == to {
        return Ok(Decimal::ONE);
    }
    if let Some(rate) = lookup(from, to) {
        return Ok(rate);
    }
    if let Some(reverse) = lookup(to, from) {
        if !reverse.is_zero() {
            return Ok(Decimal::ONE / reverse);
        }
    }
    Err(CoreError::IncompatibleUnits {
        from: from.to_string(),
        to: to.to_string(),
    })
}

/// Converts `quantity` expressed in `from` into `to`. The result is exact
/// and still needs normalizing to the target unit's precision.
pub fn convert_quantity(quantity: Decimal, from: &str, to: &str) -> CoreResult<Decimal> {
    let rate = conversion_rate(from, to)?;
    Ok(quantity * rate)
}

/// True when a quantity in `a` can be expressed in `b`.
pub fn are_compatible(a: &str, b: &str) -> bool {
    conversion_rate(a, b).is_ok()
}

/// Unit codes convertible to and from `base`, `base` first.
pub fn compatible_units(base: &str) -> Vec<String> {
    let mut units = vec![base.to_string()];
    for (from, to, _, _) in CONVERSION_TABLE {
        let other = if *from == base {
            to
        } else if *to == base {
            from
        } else {
            continue;
        };
        if !units.iter().any(|u| u == other) {
            units.push(other.to_string());
        }
    }
    units
}
