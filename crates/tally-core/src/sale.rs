//! # Sale Rules
//!
//! Pure pieces of the sale flow: request validation, line resolution
//! (sell-unit conversion, normalization, pricing) and the customer
//! bookkeeping a completed sale causes. The database layer runs these
//! inside its unit of work.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutRequest                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_request ──► resolve_line (per line) ──► Σ line totals        │
//! │                              │                                          │
//! │                 sell_unit ─► convert ─► normalize ─► price              │
//! │                                                                         │
//! │  process_sale:                                                          │
//! │  ensure_pending ──► Stock.sell per line ──► customer_effect            │
//! │                                                ├── debt += total        │
//! │                                                ├── total_spent += total │
//! │                                                └── loyalty += total/10  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::quantity::normalize_positive;
use crate::types::{
    CheckoutRequest, Customer, LineRequest, PaymentMethod, Transaction, TransactionStatus,
    UnitOfMeasure,
};
use crate::units::convert_quantity;
use crate::validation::{validate_line_count, validate_phone};
use crate::MAX_AMOUNT_CENTS;

// =============================================================================
// Request Validation
// =============================================================================

/// Checks a checkout request before anything is loaded or written.
///
/// - at least one line and at most `MAX_TRANSACTION_LINES`
/// - `debt` needs an existing customer id or new-customer details
/// - new-customer details need both a full name and a phone
pub fn validate_request(request: &CheckoutRequest) -> CoreResult<()> {
    validate_line_count(request.items.len())?;

    if request.payment_method == PaymentMethod::Debt
        && request.customer_id.is_none()
        && request.new_customer.is_none()
    {
        return Err(CoreError::CustomerRequiredForDebt);
    }

    if request.customer_id.is_none() {
        if let Some(details) = &request.new_customer {
            let name = details.full_name.as_deref().unwrap_or("").trim();
            if name.is_empty() {
                return Err(ValidationError::Required {
                    field: "new_customer.full_name".to_string(),
                }
                .into());
            }
            match details.phone.as_deref() {
                Some(phone) if !phone.trim().is_empty() => validate_phone(phone)?,
                _ => {
                    return Err(ValidationError::Required {
                        field: "new_customer.phone".to_string(),
                    }
                    .into())
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// Line Resolution
// =============================================================================

/// A sale line ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    pub product_id: String,
    /// Normalized quantity in the product's base unit.
    pub base_quantity: Decimal,
    pub unit_price: Money,
    pub line_total: Money,
    pub sell_unit: Option<String>,
    pub sell_quantity: Option<Decimal>,
}

/// Converts a requested line into the product's base unit, normalizes it
/// and prices it.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::money::Money;
/// use tally_core::sale::resolve_line;
/// use tally_core::types::{LineRequest, UnitOfMeasure};
///
/// let metre = UnitOfMeasure {
///     id: "u".into(), code: "m".into(), name: "Metre".into(), decimal_places: 2,
/// };
/// let line = LineRequest {
///     product_id: "cable".into(),
///     quantity: Decimal::new(150, 0),
///     sell_unit: Some("cm".into()),
/// };
/// let resolved = resolve_line(&line, &metre, Money::from_cents(800)).unwrap();
/// assert_eq!(resolved.base_quantity.to_string(), "1.50");
/// assert_eq!(resolved.line_total.cents(), 1200);
/// ```
pub fn resolve_line(
    line: &LineRequest,
    base_unit: &UnitOfMeasure,
    unit_price: Money,
) -> CoreResult<ResolvedLine> {
    let converted = match line.sell_unit.as_deref() {
        Some(sell_unit) if sell_unit != base_unit.code => {
            if line.quantity <= Decimal::ZERO {
                return Err(CoreError::InvalidQuantity {
                    quantity: line.quantity,
                });
            }
            convert_quantity(line.quantity, sell_unit, &base_unit.code)?
        }
        _ => line.quantity,
    };

    let base_quantity = normalize_positive(converted, base_unit.decimal_places)?;

    Ok(ResolvedLine {
        product_id: line.product_id.clone(),
        base_quantity,
        unit_price,
        line_total: price_line(unit_price, base_quantity)?,
        sell_unit: line.sell_unit.clone(),
        sell_quantity: line.sell_unit.as_ref().map(|_| line.quantity),
    })
}

/// Line total: unit price × base quantity, rounded half-up to minor units.
///
/// ## Errors
/// `AmountOutOfRange` when the total exceeds `MAX_AMOUNT_CENTS`.
pub fn price_line(unit_price: Money, base_quantity: Decimal) -> CoreResult<Money> {
    unit_price
        .multiply_quantity(base_quantity)
        .ok_or_else(|| out_of_range("line_total"))
}

/// Sum of line totals, refused past `MAX_AMOUNT_CENTS`.
pub fn total(lines: &[ResolvedLine]) -> CoreResult<Money> {
    lines
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total))
        .ok_or_else(|| out_of_range("total_amount"))
}

fn out_of_range(field: &str) -> CoreError {
    CoreError::AmountOutOfRange {
        field: field.to_string(),
        max: MAX_AMOUNT_CENTS,
    }
}

// =============================================================================
// Processing Rules
// =============================================================================

/// Fails with `AlreadyProcessed` unless the transaction is pending.
pub fn ensure_pending(transaction: &Transaction) -> CoreResult<()> {
    if transaction.status != TransactionStatus::Pending {
        return Err(CoreError::AlreadyProcessed {
            transaction_id: transaction.id.clone(),
            status: transaction.status.to_string(),
        });
    }
    Ok(())
}

/// Changes a completed sale applies to its customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomerEffect {
    pub debt: Money,
    pub total_spent: Money,
    pub loyalty_points: i64,
}

impl CustomerEffect {
    /// Adds this effect to the customer's counters.
    ///
    /// ## Errors
    /// `AmountOutOfRange` when a balance would leave the money range; the
    /// customer is left untouched.
    pub fn apply_to(&self, customer: &mut Customer) -> CoreResult<()> {
        let debt = Money::from_cents(customer.debt_cents)
            .checked_add(self.debt)
            .ok_or_else(|| out_of_range("debt"))?;
        let total_spent = Money::from_cents(customer.total_spent_cents)
            .checked_add(self.total_spent)
            .ok_or_else(|| out_of_range("total_spent"))?;
        let loyalty_points = customer
            .loyalty_points
            .checked_add(self.loyalty_points)
            .ok_or_else(|| out_of_range("loyalty_points"))?;

        customer.debt_cents = debt.cents();
        customer.total_spent_cents = total_spent.cents();
        customer.loyalty_points = loyalty_points;
        Ok(())
    }
}

/// Computes the customer bookkeeping for a sale of `total`.
///
/// Returns `None` for an anonymous sale, which is only legal when the
/// payment method is not `debt`.
pub fn customer_effect(
    total: Money,
    payment_method: PaymentMethod,
    has_customer: bool,
) -> CoreResult<Option<CustomerEffect>> {
    if !has_customer {
        if payment_method == PaymentMethod::Debt {
            return Err(CoreError::CustomerRequiredForDebt);
        }
        return Ok(None);
    }

    let debt = if payment_method == PaymentMethod::Debt {
        total
    } else {
        Money::zero()
    };

    Ok(Some(CustomerEffect {
        debt,
        total_spent: total,
        loyalty_points: total.loyalty_points(),
    }))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewCustomer;
    use chrono::Utc;

    fn unit(code: &str, dp: u32) -> UnitOfMeasure {
        UnitOfMeasure {
            id: format!("unit-{code}"),
            code: code.to_string(),
            name: code.to_string(),
            decimal_places: dp,
        }
    }

    fn line(qty: Decimal, sell_unit: Option<&str>) -> LineRequest {
        LineRequest {
            product_id: "p".to_string(),
            quantity: qty,
            sell_unit: sell_unit.map(str::to_string),
        }
    }

    fn request(method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            cashier_id: "cashier".to_string(),
            customer_id: None,
            new_customer: None,
            payment_method: method,
            items: vec![line(Decimal::ONE, None)],
        }
    }

    #[test]
    fn test_validate_request_rules() {
        assert!(validate_request(&request(PaymentMethod::Cash)).is_ok());

        let mut empty = request(PaymentMethod::Cash);
        empty.items.clear();
        assert_eq!(validate_request(&empty), Err(CoreError::EmptyTransaction));

        assert_eq!(
            validate_request(&request(PaymentMethod::Debt)),
            Err(CoreError::CustomerRequiredForDebt)
        );

        let mut debt_new = request(PaymentMethod::Debt);
        debt_new.new_customer = Some(NewCustomer {
            full_name: Some("Ali".to_string()),
            phone: None,
            email: None,
        });
        assert!(matches!(
            validate_request(&debt_new),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));

        debt_new.new_customer = Some(NewCustomer {
            full_name: Some("Ali".to_string()),
            phone: Some("+998901112233".to_string()),
            email: None,
        });
        assert!(validate_request(&debt_new).is_ok());
    }

    #[test]
    fn test_resolve_line_in_base_unit() {
        let kg = unit("kg", 3);
        let resolved = resolve_line(&line(Decimal::new(12345, 4), None), &kg, Money::from_cents(1000)).unwrap();
        assert_eq!(resolved.base_quantity, Decimal::new(1235, 3));
        // 10.00 × 1.235 = 12.35
        assert_eq!(resolved.line_total.cents(), 1235);
        assert!(resolved.sell_quantity.is_none());
    }

    #[test]
    fn test_resolve_line_with_sell_unit() {
        let kg = unit("kg", 3);
        let resolved = resolve_line(
            &line(Decimal::new(250, 0), Some("g")),
            &kg,
            Money::from_cents(2000),
        )
        .unwrap();
        assert_eq!(resolved.base_quantity, Decimal::new(25, 2));
        assert_eq!(resolved.line_total.cents(), 500);
        assert_eq!(resolved.sell_quantity, Some(Decimal::new(250, 0)));
    }

    #[test]
    fn test_resolve_line_errors() {
        let pcs = unit("pcs", 0);
        assert!(matches!(
            resolve_line(&line(Decimal::new(25, 1), None), &pcs, Money::zero()),
            Err(CoreError::FractionalQuantityNotAllowed { .. })
        ));
        assert!(matches!(
            resolve_line(&line(Decimal::ZERO, None), &pcs, Money::zero()),
            Err(CoreError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            resolve_line(&line(Decimal::ONE, Some("kg")), &pcs, Money::zero()),
            Err(CoreError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_ensure_pending() {
        let mut tx = Transaction {
            id: "t".to_string(),
            cashier_id: "c".to_string(),
            customer_id: None,
            total_amount_cents: 0,
            payment_method: PaymentMethod::Cash,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        };
        assert!(ensure_pending(&tx).is_ok());
        tx.status = TransactionStatus::Completed;
        assert_eq!(
            ensure_pending(&tx),
            Err(CoreError::AlreadyProcessed {
                transaction_id: "t".to_string(),
                status: "completed".to_string()
            })
        );
    }

    #[test]
    fn test_customer_effect() {
        let total = Money::from_cents(25_000);

        let debt = customer_effect(total, PaymentMethod::Debt, true).unwrap().unwrap();
        assert_eq!(debt.debt, total);
        assert_eq!(debt.total_spent, total);
        assert_eq!(debt.loyalty_points, 25);

        let cash = customer_effect(total, PaymentMethod::Cash, true).unwrap().unwrap();
        assert!(cash.debt.is_zero());

        assert_eq!(customer_effect(total, PaymentMethod::Card, false), Ok(None));
        assert_eq!(
            customer_effect(total, PaymentMethod::Debt, false),
            Err(CoreError::CustomerRequiredForDebt)
        );
    }

    #[test]
    fn test_amounts_past_the_ceiling() {
        let pcs = unit("pcs", 0);
        let huge = Money::from_cents(MAX_AMOUNT_CENTS / 2 + 1);

        let one = resolve_line(&line(Decimal::ONE, None), &pcs, huge).unwrap();
        assert_eq!(one.line_total, huge);
        assert_eq!(
            total(&[one.clone(), one.clone()]),
            Err(CoreError::AmountOutOfRange {
                field: "total_amount".to_string(),
                max: MAX_AMOUNT_CENTS
            })
        );
        assert_eq!(total(&[one]), Ok(huge));

        assert!(matches!(
            resolve_line(&line(Decimal::new(3, 0), None), &pcs, huge),
            Err(CoreError::AmountOutOfRange { .. })
        ));
    }

    #[test]
    fn test_customer_effect_apply_to() {
        let mut customer = Customer {
            id: "c".to_string(),
            full_name: Some("Ali".to_string()),
            phone: None,
            email: None,
            total_spent_cents: 1_000,
            debt_cents: 500,
            loyalty_points: 1,
            last_purchase_at: None,
            created_at: Utc::now(),
        };
        let effect = customer_effect(Money::from_cents(2_000), PaymentMethod::Debt, true)
            .unwrap()
            .unwrap();
        effect.apply_to(&mut customer).unwrap();
        assert_eq!(customer.debt_cents, 2_500);
        assert_eq!(customer.total_spent_cents, 3_000);
        assert_eq!(customer.loyalty_points, 3);

        customer.debt_cents = MAX_AMOUNT_CENTS;
        assert!(matches!(
            effect.apply_to(&mut customer),
            Err(CoreError::AmountOutOfRange { .. })
        ));
        assert_eq!(customer.debt_cents, MAX_AMOUNT_CENTS);
        assert_eq!(customer.total_spent_cents, 3_000);
    }
}
