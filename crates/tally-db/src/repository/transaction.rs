//! # Transaction Repository
//!
//! The sale orchestrator. A sale is one SQLite transaction covering every
//! line's stock deduction, the customer bookkeeping and the status change;
//! any failure rolls all of it back.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout(request)                                                      │
//! │                                                                         │
//! │  validate_request                   lines, debt needs a customer        │
//! │  ProductLocks::lock_many(products)  ascending id, de-duplicated         │
//! │  BEGIN                                                                  │
//! │   ├── touch each stock row          same canonical order                │
//! │   ├── resolve / create customer     get-or-create by phone              │
//! │   ├── resolve lines                 sell unit → base unit, price        │
//! │   ├── INSERT pending transaction, items, history "created"              │
//! │   └── process_in                                                        │
//! │        ├── ensure pending           else AlreadyProcessed               │
//! │        ├── sell_in per line         in line order                       │
//! │        ├── customer debt / spend / loyalty                              │
//! │        └── status completed, history "completed"                        │
//! │  COMMIT, release locks                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `create_pending` stops after the inserts; `process_sale` runs
//! `process_in` later in its own transaction.

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::customer::{self, get_or_create_by_phone_in};
use super::product::{product_in, unit_in};
use super::rows::{HistoryRow, TransactionItemRow, TransactionRow};
use super::stock::{lock_stock_row, sell_in};
use crate::error::{DbError, DbResult};
use crate::locks::ProductLocks;
use tally_core::sale::{self, customer_effect, ensure_pending, resolve_line, validate_request};
use tally_core::{
    CheckoutRequest, CoreError, HistoryAction, Transaction, TransactionDetail,
    TransactionHistoryEntry, TransactionItem, TransactionStatus, ValidationError,
};

const TRANSACTION_COLUMNS: &str =
    "id, cashier_id, customer_id, total_amount_cents, payment_method, status, created_at, completed_at";

const ITEM_COLUMNS: &str = "id, transaction_id, line_no, product_id, quantity, unit_price_cents, \
                            line_total_cents, sell_unit, sell_quantity";

/// Repository for sales.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
    locks: ProductLocks,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool, locks: ProductLocks) -> Self {
        TransactionRepository { pool, locks }
    }

    /// Records and completes a sale in one unit of work.
    ///
    /// ## Returns
    /// * `Ok(TransactionDetail)` - the completed transaction and its items
    /// * `Err(_)` - nothing was written
    pub async fn checkout(&self, request: &CheckoutRequest) -> DbResult<TransactionDetail> {
        validate_checkout(request)?;

        let guards = self
            .locks
            .lock_many(request.items.iter().map(|l| l.product_id.as_str()))
            .await;

        let mut tx = self.pool.begin().await?;
        for product_id in guards.product_ids() {
            lock_stock_row(&mut tx, product_id).await?;
        }

        let transaction_id = insert_pending_in(&mut tx, request).await?;
        let detail = process_in(&mut tx, &transaction_id).await?;
        tx.commit().await?;

        info!(
            transaction_id = %detail.transaction.id,
            total = %detail.transaction.total(),
            payment_method = %detail.transaction.payment_method,
            lines = detail.items.len(),
            "Sale completed"
        );
        Ok(detail)
    }

    /// Records a pending sale without touching stock.
    pub async fn create_pending(&self, request: &CheckoutRequest) -> DbResult<TransactionDetail> {
        validate_checkout(request)?;

        let guards = self
            .locks
            .lock_many(request.items.iter().map(|l| l.product_id.as_str()))
            .await;

        let mut tx = self.pool.begin().await?;
        for product_id in guards.product_ids() {
            lock_stock_row(&mut tx, product_id).await?;
        }

        let transaction_id = insert_pending_in(&mut tx, request).await?;
        let detail = detail_in(&mut tx, &transaction_id).await?;
        tx.commit().await?;

        info!(transaction_id = %transaction_id, total = %detail.transaction.total(), "Pending sale recorded");
        Ok(detail)
    }

    /// Completes a pending sale: deducts stock for every line and applies
    /// the customer bookkeeping.
    ///
    /// ## Errors
    /// * `TransactionNotFound`
    /// * `AlreadyProcessed` - the transaction is not pending
    /// * any stock error from a line; the transaction stays pending
    pub async fn process_sale(&self, transaction_id: &str) -> DbResult<TransactionDetail> {
        let items = self.items(transaction_id).await?;
        let _guards = self
            .locks
            .lock_many(items.iter().map(|i| i.product_id.as_str()))
            .await;

        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE transactions SET status = status WHERE id = ?1")
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(CoreError::TransactionNotFound(transaction_id.to_string()).into());
        }

        let detail = process_in(&mut tx, transaction_id).await?;
        tx.commit().await?;

        info!(transaction_id = %transaction_id, total = %detail.transaction.total(), "Sale processed");
        Ok(detail)
    }

    /// A transaction with its items.
    pub async fn get(&self, id: &str) -> DbResult<TransactionDetail> {
        let mut conn = self.pool.acquire().await?;
        detail_in(&mut conn, id).await
    }

    /// Items of a transaction in line order.
    pub async fn items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let mut conn = self.pool.acquire().await?;
        items_in(&mut conn, transaction_id).await
    }

    /// Audit trail of a transaction, oldest first.
    pub async fn history(&self, transaction_id: &str) -> DbResult<Vec<TransactionHistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, transaction_id, action, details, created_at
            FROM transaction_history
            WHERE transaction_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryRow::into_domain).collect()
    }

    /// Lists transactions, most recent first.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY rowid DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Transaction::from).collect())
    }
}

// =============================================================================
// Units of work
// =============================================================================

fn validate_checkout(request: &CheckoutRequest) -> DbResult<()> {
    if request.cashier_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "cashier_id".to_string(),
        }
        .into());
    }
    validate_request(request)?;
    Ok(())
}

/// Resolves the customer and lines, then inserts the pending transaction,
/// its items and a `created` history entry. Returns the new id.
async fn insert_pending_in(conn: &mut SqliteConnection, request: &CheckoutRequest) -> DbResult<String> {
    let customer = match (&request.customer_id, &request.new_customer) {
        (Some(id), _) => Some(customer::get_in(conn, id).await?),
        (None, Some(details)) => Some(get_or_create_by_phone_in(conn, details).await?),
        (None, None) => None,
    };

    let mut lines = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let product = product_in(conn, &line.product_id).await?;
        let unit = unit_in(conn, &product.unit_id).await?;
        lines.push(resolve_line(line, &unit, product.sale_price())?);
    }
    let total = sale::total(&lines)?;

    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        cashier_id: request.cashier_id.trim().to_string(),
        customer_id: customer.as_ref().map(|c| c.id.clone()),
        total_amount_cents: total.cents(),
        payment_method: request.payment_method,
        status: TransactionStatus::Pending,
        created_at: Utc::now(),
        completed_at: None,
    };

    debug!(transaction_id = %transaction.id, total = %total, lines = lines.len(), "Inserting pending transaction");

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, cashier_id, customer_id, total_amount_cents,
            payment_method, status, created_at, completed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.cashier_id)
    .bind(&transaction.customer_id)
    .bind(transaction.total_amount_cents)
    .bind(transaction.payment_method)
    .bind(transaction.status)
    .bind(transaction.created_at)
    .execute(&mut *conn)
    .await?;

    for (index, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO transaction_items (
                id, transaction_id, line_no, product_id, quantity,
                unit_price_cents, line_total_cents, sell_unit, sell_quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&transaction.id)
        .bind(index as i64 + 1)
        .bind(&line.product_id)
        .bind(line.base_quantity.to_string())
        .bind(line.unit_price.cents())
        .bind(line.line_total.cents())
        .bind(&line.sell_unit)
        .bind(line.sell_quantity.map(|q| q.to_string()))
        .execute(&mut *conn)
        .await?;
    }

    let items = items_in(conn, &transaction.id).await?;
    record_history_in(conn, &transaction.id, HistoryAction::Created, snapshot(&transaction, &items))
        .await?;

    Ok(transaction.id)
}

/// Completes a pending transaction inside the caller's database
/// transaction. The caller holds the locks of every product involved.
async fn process_in(conn: &mut SqliteConnection, transaction_id: &str) -> DbResult<TransactionDetail> {
    let mut transaction = get_in(conn, transaction_id).await?;
    ensure_pending(&transaction)?;

    let items = items_in(conn, transaction_id).await?;
    for item in &items {
        let outcome = sell_in(conn, &item.product_id, item.quantity).await.map_err(|err| {
            warn!(
                transaction_id = %transaction_id,
                line_no = item.line_no,
                product_id = %item.product_id,
                error = %err,
                "Sale line failed, rolling back"
            );
            err
        })?;
        debug!(line_no = item.line_no, remaining = %outcome.remaining_stock, "Line deducted");
    }

    let total = transaction.total();
    let effect = customer_effect(total, transaction.payment_method, transaction.customer_id.is_some())?;

    if let (Some(customer_id), Some(effect)) = (&transaction.customer_id, effect) {
        let mut customer = customer::get_in(conn, customer_id).await?;
        effect.apply_to(&mut customer)?;
        let last_purchase_at = match customer.last_purchase_at {
            Some(previous) if previous > transaction.created_at => previous,
            _ => transaction.created_at,
        };

        // Absolute values: the row is already under this transaction's
        // write lock, and the sums were range-checked above.
        sqlx::query(
            r#"
            UPDATE customers
            SET debt_cents = ?1,
                total_spent_cents = ?2,
                loyalty_points = ?3,
                last_purchase_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(customer.debt_cents)
        .bind(customer.total_spent_cents)
        .bind(customer.loyalty_points)
        .bind(last_purchase_at)
        .bind(customer_id)
        .execute(&mut *conn)
        .await?;

        debug!(
            customer_id = %customer_id,
            debt_added = %effect.debt,
            points_added = effect.loyalty_points,
            "Customer updated"
        );
    }

    let completed_at = Utc::now();
    sqlx::query("UPDATE transactions SET status = ?1, completed_at = ?2 WHERE id = ?3")
        .bind(TransactionStatus::Completed)
        .bind(completed_at)
        .bind(transaction_id)
        .execute(&mut *conn)
        .await?;

    transaction.status = TransactionStatus::Completed;
    transaction.completed_at = Some(completed_at);

    record_history_in(conn, transaction_id, HistoryAction::Completed, snapshot(&transaction, &items))
        .await?;

    Ok(TransactionDetail { transaction, items })
}

// =============================================================================
// Reads
// =============================================================================

async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Transaction> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Transaction::from)
        .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()).into())
}

async fn items_in(conn: &mut SqliteConnection, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
    let rows = sqlx::query_as::<_, TransactionItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ?1 ORDER BY line_no"
    ))
    .bind(transaction_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(TransactionItemRow::into_domain).collect()
}

async fn detail_in(conn: &mut SqliteConnection, id: &str) -> DbResult<TransactionDetail> {
    let transaction = get_in(conn, id).await?;
    let items = items_in(conn, id).await?;
    Ok(TransactionDetail { transaction, items })
}

// =============================================================================
// History
// =============================================================================

fn snapshot(transaction: &Transaction, items: &[TransactionItem]) -> Value {
    json!({
        "total_amount_cents": transaction.total_amount_cents,
        "payment_method": transaction.payment_method.as_str(),
        "status": transaction.status.as_str(),
        "cashier_id": transaction.cashier_id,
        "customer_id": transaction.customer_id,
        "items": items
            .iter()
            .map(|item| json!({
                "line_no": item.line_no,
                "product_id": item.product_id,
                "quantity": item.quantity.to_string(),
                "unit_price_cents": item.unit_price_cents,
                "line_total_cents": item.line_total_cents,
            }))
            .collect::<Vec<_>>(),
    })
}

async fn record_history_in(
    conn: &mut SqliteConnection,
    transaction_id: &str,
    action: HistoryAction,
    details: Value,
) -> DbResult<()> {
    let details = serde_json::to_string(&details).map_err(|e| DbError::Internal(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO transaction_history (id, transaction_id, action, details, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(transaction_id)
    .bind(action)
    .bind(details)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
