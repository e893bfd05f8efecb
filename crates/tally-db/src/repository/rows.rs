//! Row records decoded by `sqlx::FromRow` and their conversion into
//! tally-core domain types.
//!
//! Quantities live in TEXT columns; they are parsed here and nowhere else.
//! A value that fails to parse is reported as [`DbError::CorruptData`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{DbError, DbResult};
use tally_core::{
    Batch, Category, Customer, HistoryAction, PaymentMethod, Product, Stock, Transaction,
    TransactionHistoryEntry, TransactionItem, TransactionStatus, UnitOfMeasure,
};

/// Parses a stored decimal.
pub(crate) fn parse_decimal(column: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw).map_err(|_| DbError::corrupt(column, raw))
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UnitRow {
    pub id: String,
    pub code: String,
    pub name: String,
    pub decimal_places: i64,
}

impl UnitRow {
    pub fn into_domain(self) -> DbResult<UnitOfMeasure> {
        let decimal_places = u32::try_from(self.decimal_places)
            .map_err(|_| DbError::corrupt("units.decimal_places", self.decimal_places.to_string()))?;
        Ok(UnitOfMeasure {
            id: self.id,
            code: self.code,
            name: self.name,
            decimal_places,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CategoryRow {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: String,
    pub name: String,
    pub unit_id: String,
    pub sale_price_cents: i64,
    pub category_id: String,
    pub size_label: Option<String>,
    pub barcode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            unit_id: row.unit_id,
            sale_price_cents: row.sale_price_cents,
            category_id: row.category_id,
            size_label: row.size_label,
            barcode: row.barcode,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StockRow {
    pub id: String,
    pub product_id: String,
    pub quantity: String,
    pub updated_at: DateTime<Utc>,
}

impl StockRow {
    pub fn into_domain(self) -> DbResult<Stock> {
        Ok(Stock {
            quantity: parse_decimal("stocks.quantity", &self.quantity)?,
            id: self.id,
            product_id: self.product_id,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BatchRow {
    pub id: String,
    pub product_id: String,
    pub quantity: String,
    pub purchase_price_cents: Option<i64>,
    pub supplier: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl BatchRow {
    pub fn into_domain(self) -> DbResult<Batch> {
        Ok(Batch {
            quantity: parse_decimal("batches.quantity", &self.quantity)?,
            id: self.id,
            product_id: self.product_id,
            purchase_price_cents: self.purchase_price_cents,
            supplier: self.supplier,
            expiration_date: self.expiration_date,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CustomerRow {
    pub id: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub total_spent_cents: i64,
    pub debt_cents: i64,
    pub loyalty_points: i64,
    pub last_purchase_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            full_name: row.full_name,
            phone: row.phone,
            email: row.email,
            total_spent_cents: row.total_spent_cents,
            debt_cents: row.debt_cents,
            loyalty_points: row.loyalty_points,
            last_purchase_at: row.last_purchase_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TransactionRow {
    pub id: String,
    pub cashier_id: String,
    pub customer_id: Option<String>,
    pub total_amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Transaction {
            id: row.id,
            cashier_id: row.cashier_id,
            customer_id: row.customer_id,
            total_amount_cents: row.total_amount_cents,
            payment_method: row.payment_method,
            status: row.status,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TransactionItemRow {
    pub id: String,
    pub transaction_id: String,
    pub line_no: i64,
    pub product_id: String,
    pub quantity: String,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub sell_unit: Option<String>,
    pub sell_quantity: Option<String>,
}

impl TransactionItemRow {
    pub fn into_domain(self) -> DbResult<TransactionItem> {
        let sell_quantity = self
            .sell_quantity
            .as_deref()
            .map(|raw| parse_decimal("transaction_items.sell_quantity", raw))
            .transpose()?;
        Ok(TransactionItem {
            quantity: parse_decimal("transaction_items.quantity", &self.quantity)?,
            sell_quantity,
            id: self.id,
            transaction_id: self.transaction_id,
            line_no: self.line_no,
            product_id: self.product_id,
            unit_price_cents: self.unit_price_cents,
            line_total_cents: self.line_total_cents,
            sell_unit: self.sell_unit,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HistoryRow {
    pub id: String,
    pub transaction_id: String,
    pub action: HistoryAction,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryRow {
    pub fn into_domain(self) -> DbResult<TransactionHistoryEntry> {
        let details = serde_json::from_str(&self.details)
            .map_err(|_| DbError::corrupt("transaction_history.details", &self.details))?;
        Ok(TransactionHistoryEntry {
            id: self.id,
            transaction_id: self.transaction_id,
            action: self.action,
            details,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(
            parse_decimal("stocks.quantity", "7.000").unwrap(),
            Decimal::new(7000, 3)
        );
        assert!(matches!(
            parse_decimal("stocks.quantity", "seven"),
            Err(DbError::CorruptData { .. })
        ));
    }
}
