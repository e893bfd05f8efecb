//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ UnitOfMeasure   │◄──│    Product      │──►│    Category     │       │
//! │  │  code           │   │  sale_price     │   │  name           │       │
//! │  │  decimal_places │   │  barcode        │   └─────────────────┘       │
//! │  └─────────────────┘   └───┬─────────┬───┘                             │
//! │                        1:1 │         │ 1:N                              │
//! │                  ┌─────────▼──┐   ┌──▼──────────┐                       │
//! │                  │   Stock    │   │   Batch     │  Stock.quantity ==    │
//! │                  │  quantity  │   │  quantity   │  Σ Batch.quantity     │
//! │                  └────────────┘   │  expiration │                       │
//! │                                   └─────────────┘                       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Transaction    │──►│ TransactionItem │   │    Customer     │       │
//! │  │  status         │   │  quantity       │   │  debt           │       │
//! │  │  payment_method │   │  unit_price     │   │  loyalty_points │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Conventions
//! - Quantities serialize as decimal strings (`"1.235"`), never floats
//! - Money serializes as integer minor units (`*_cents`)
//! - Every entity id is a UUID v4 string

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Unit of Measure
// =============================================================================

/// A unit of measure and the precision quantities in it are kept at.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnitOfMeasure {
    pub id: String,
    /// Short code: `pcs`, `kg`, `g`, `l`, `ml`, `m`, `cm`, `mm`, `inch`, `pack`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// 0 to 4; 0 forces whole quantities.
    pub decimal_places: u32,
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name (1-255 characters).
    pub name: String,

    /// Base unit; stock, batches and line quantities are kept in it.
    pub unit_id: String,

    /// Price per one base unit, in minor units.
    pub sale_price_cents: i64,

    pub category_id: String,

    /// Free-form size label ("0.5 l", "XL").
    pub size_label: Option<String>,

    /// Numeric barcode, unique across products.
    pub barcode: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the sale price as a Money type.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }
}

// =============================================================================
// Stock & Batches
// =============================================================================

/// Denormalized running total of a product's batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Stock {
    pub id: String,
    pub product_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A discrete lot of stock received in one restock.
///
/// Quantity only ever decreases; a batch that reaches zero is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    #[ts(type = "string")]
    pub quantity: Decimal,
    pub purchase_price_cents: Option<i64>,
    pub supplier: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Result of receiving goods by barcode.
///
/// `created` is false when the barcode already belonged to a product; the
/// batch, if any, was then appended to that product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductReceipt {
    pub product: Product,
    pub batch: Option<Batch>,
    pub created: bool,
}

/// Result of selling a quantity of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SellOutcome {
    pub product_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    #[ts(type = "string")]
    pub sold_quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    #[ts(type = "string")]
    pub remaining_stock: Decimal,
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub full_name: Option<String>,
    /// Unique when present.
    pub phone: Option<String>,
    pub email: Option<String>,
    pub total_spent_cents: i64,
    /// Outstanding debt, never negative.
    pub debt_cents: i64,
    pub loyalty_points: i64,
    #[ts(as = "Option<String>")]
    pub last_purchase_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Name shown on receipts: full name, else phone, else email.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.phone.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("Anonymous customer")
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// The status of a sale transaction.
///
/// `Pending → Completed` happens only through `process_sale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    /// Bank transfer.
    Transfer,
    Card,
    /// Sale on credit; requires a customer and increases their debt.
    Debt,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Transfer,
        PaymentMethod::Card,
        PaymentMethod::Debt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Debt => "debt",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A sale transaction header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub cashier_id: String,
    pub customer_id: Option<String>,
    pub total_amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// A line of a transaction.
///
/// `quantity` is always in the product's base unit; `sell_unit` and
/// `sell_quantity` keep what the cashier actually entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    /// 1-based position; lines are processed in this order.
    pub line_no: i64,
    pub product_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    #[ts(type = "string")]
    pub quantity: Decimal,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub sell_unit: Option<String>,
    #[serde(with = "rust_decimal::serde::str_option")]
    #[ts(type = "string | null")]
    pub sell_quantity: Option<Decimal>,
}

/// A transaction with its lines, in line order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionDetail {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

// =============================================================================
// Transaction History
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Completed,
    Refunded,
}

/// An audit record written in the same unit of work as the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionHistoryEntry {
    pub id: String,
    pub transaction_id: String,
    pub action: HistoryAction,
    /// Snapshot of the transaction at the time of the event.
    #[ts(type = "unknown")]
    pub details: serde_json::Value,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUnit {
    pub code: String,
    pub name: String,
    pub decimal_places: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
}

/// Input for creating a product. A missing barcode is generated.
///
/// When `initial_batch` is present the product is stocked in the same
/// transaction that creates it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub unit_id: String,
    pub sale_price_cents: i64,
    pub category_id: String,
    #[serde(default)]
    pub size_label: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub initial_batch: Option<InitialBatch>,
}

/// The first lot received with a product, before the product has an id.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InitialBatch {
    #[serde(with = "rust_decimal::serde::str")]
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub purchase_price_cents: Option<i64>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
}

impl InitialBatch {
    pub fn for_product(&self, product_id: &str) -> NewBatch {
        NewBatch {
            product_id: product_id.to_string(),
            quantity: self.quantity,
            supplier: self.supplier.clone(),
            purchase_price_cents: self.purchase_price_cents,
            expiration_date: self.expiration_date,
        }
    }
}

/// Input for a restock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewBatch {
    pub product_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub purchase_price_cents: Option<i64>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One requested sale line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub product_id: String,
    /// Amount in `sell_unit`, or in the product's base unit when absent.
    #[serde(with = "rust_decimal::serde::str")]
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[serde(default)]
    pub sell_unit: Option<String>,
}

/// A full sale request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    pub cashier_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Used when `customer_id` is absent; matched to an existing
    /// customer by phone or created.
    #[serde(default)]
    pub new_customer: Option<NewCustomer>,
    pub payment_method: PaymentMethod,
    pub items: Vec<LineRequest>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_status_default() {
        assert_eq!(TransactionStatus::default(), TransactionStatus::Pending);
        assert_eq!(TransactionStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_payment_method_from_str() {
        assert_eq!("debt".parse::<PaymentMethod>().unwrap(), PaymentMethod::Debt);
        let err = "crypto".parse::<PaymentMethod>().unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));
    }

    #[test]
    fn test_quantities_serialize_as_strings() {
        let outcome = SellOutcome {
            product_id: "p".to_string(),
            sold_quantity: Decimal::new(3, 0),
            remaining_stock: Decimal::new(7000, 3),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["sold_quantity"], json!("3"));
        assert_eq!(value["remaining_stock"], json!("7.000"));
    }

    #[test]
    fn test_line_request_rejects_float_quantity() {
        let ok: LineRequest =
            serde_json::from_value(json!({"product_id": "p", "quantity": "1.5"})).unwrap();
        assert_eq!(ok.quantity, Decimal::new(15, 1));
        assert!(ok.sell_unit.is_none());

        let float = serde_json::from_value::<LineRequest>(json!({"product_id": "p", "quantity": 1.5}));
        assert!(float.is_err());
    }

    #[test]
    fn test_customer_display_name() {
        let mut customer = Customer {
            id: "c".to_string(),
            full_name: None,
            phone: Some("+998901234567".to_string()),
            email: None,
            total_spent_cents: 0,
            debt_cents: 0,
            loyalty_points: 0,
            last_purchase_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(customer.display_name(), "+998901234567");
        customer.phone = None;
        assert_eq!(customer.display_name(), "Anonymous customer");
    }
}
