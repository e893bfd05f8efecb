//! # Stock Repository
//!
//! The Stock aggregate: one denormalized quantity per product, always
//! equal to the sum of that product's batches.
//!
//! ## Sell Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sell(product, qty)                                                     │
//! │                                                                         │
//! │  ProductLocks::lock(product)          in-process exclusion              │
//! │  BEGIN                                                                  │
//! │   ├── touch stocks row                SQLite write lock taken first     │
//! │   ├── normalize_positive(qty, unit)   InvalidQuantity / Fractional...   │
//! │   ├── qty > stock?                    InsufficientStock (no writes)     │
//! │   ├── plan_draws over FIFO batches    LedgerInconsistency on shortfall  │
//! │   ├── per draw: consume → UPDATE or DELETE batch                        │
//! │   └── recompute stock = Σ batches                                       │
//! │  COMMIT, release lock                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The connection-level pieces (`sell_in`, `recompute_in`) are shared with
//! batch creation and the sale orchestrator so that they run inside the
//! caller's transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, error, info};

use super::batch::load_batches;
use super::product::product_unit_in;
use super::rows::StockRow;
use crate::error::DbResult;
use crate::locks::ProductLocks;
use tally_core::ledger::{consume, plan_draws, total as ledger_total};
use tally_core::quantity::{normalize, normalize_positive};
use tally_core::{CoreError, SellOutcome, Stock};

/// Repository for the Stock aggregate.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
    locks: ProductLocks,
}

impl StockRepository {
    pub fn new(pool: SqlitePool, locks: ProductLocks) -> Self {
        StockRepository { pool, locks }
    }

    /// Sells `quantity` of a product, drawing from its batches in FIFO
    /// order.
    ///
    /// All-or-nothing: on any error no batch or stock row has changed.
    ///
    /// ## Returns
    /// * `Ok(SellOutcome)` - normalized quantity sold and stock left
    /// * `Err(DbError::Domain(CoreError::InsufficientStock))` - oversell
    pub async fn sell(&self, product_id: &str, quantity: Decimal) -> DbResult<SellOutcome> {
        let _guards = self.locks.lock(product_id).await;

        let mut tx = self.pool.begin().await?;
        let outcome = sell_in(&mut tx, product_id, quantity).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            sold = %outcome.sold_quantity,
            remaining = %outcome.remaining_stock,
            "Stock sold"
        );
        Ok(outcome)
    }

    /// Recomputes the stock quantity from the batch ledger. Idempotent.
    pub async fn update_quantity(&self, product_id: &str) -> DbResult<Stock> {
        let _guards = self.locks.lock(product_id).await;

        let mut tx = self.pool.begin().await?;
        lock_stock_row(&mut tx, product_id).await?;
        let decimal_places = product_unit_in(&mut tx, product_id).await?.decimal_places;
        let stock = recompute_in(&mut tx, product_id, decimal_places).await?;
        tx.commit().await?;

        Ok(stock)
    }

    /// Current stock of a product.
    pub async fn get(&self, product_id: &str) -> DbResult<Stock> {
        let mut conn = self.pool.acquire().await?;
        load_stock(&mut conn, product_id).await
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

/// No-op write on the stock row. Running it first makes the enclosing
/// transaction a writer before it reads anything.
pub(crate) async fn lock_stock_row(conn: &mut SqliteConnection, product_id: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE stocks SET updated_at = updated_at WHERE product_id = ?1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(product_id.to_string()).into());
    }
    Ok(())
}

pub(crate) async fn load_stock(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Stock> {
    let row = sqlx::query_as::<_, StockRow>(
        "SELECT id, product_id, quantity, updated_at FROM stocks WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?
        .into_domain()
}

/// Writes `Σ batches` into the stock row and returns the fresh stock.
pub(crate) async fn recompute_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    decimal_places: u32,
) -> DbResult<Stock> {
    let batches = load_batches(conn, product_id).await?;
    let total = normalize(ledger_total(&batches), decimal_places)?;

    sqlx::query("UPDATE stocks SET quantity = ?1, updated_at = ?2 WHERE product_id = ?3")
        .bind(total.to_string())
        .bind(Utc::now())
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    debug!(product_id = %product_id, quantity = %total, batches = batches.len(), "Stock recomputed");

    load_stock(conn, product_id).await
}

/// The sell sequence, inside the caller's transaction.
///
/// The caller must hold the product's lock.
pub(crate) async fn sell_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: Decimal,
) -> DbResult<SellOutcome> {
    lock_stock_row(conn, product_id).await?;

    let decimal_places = product_unit_in(conn, product_id).await?.decimal_places;
    let requested = normalize_positive(quantity, decimal_places)?;

    let stock = load_stock(conn, product_id).await?;
    if requested > stock.quantity {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            available: stock.quantity,
            requested,
        }
        .into());
    }

    let batches = load_batches(conn, product_id).await?;
    let draws = plan_draws(product_id, &batches, requested, stock.quantity).map_err(|err| {
        error!(product_id = %product_id, error = %err, "Batch ledger disagrees with stock");
        err
    })?;

    let by_id: HashMap<&str, _> = batches.iter().map(|b| (b.id.as_str(), b)).collect();

    for draw in &draws {
        let batch = by_id
            .get(draw.batch_id.as_str())
            .ok_or_else(|| CoreError::BatchNotFound(draw.batch_id.clone()))?;
        let left = normalize(consume(batch, draw.amount)?, decimal_places)?;

        if left.is_zero() {
            sqlx::query("DELETE FROM batches WHERE id = ?1")
                .bind(&batch.id)
                .execute(&mut *conn)
                .await?;
            debug!(batch_id = %batch.id, taken = %draw.amount, "Batch exhausted and removed");
        } else {
            sqlx::query("UPDATE batches SET quantity = ?1 WHERE id = ?2")
                .bind(left.to_string())
                .bind(&batch.id)
                .execute(&mut *conn)
                .await?;
            debug!(batch_id = %batch.id, taken = %draw.amount, left = %left, "Batch drawn");
        }
    }

    let stock = recompute_in(conn, product_id, decimal_places).await?;

    Ok(SellOutcome {
        product_id: product_id.to_string(),
        sold_quantity: requested,
        remaining_stock: stock.quantity,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::test_support::{dec, file_database, product, remove_database, restock, seed_catalog};
    use crate::{Database, DbConfig, DbError};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use tally_core::CoreError;

    async fn assert_ledger_matches(db: &Database, product_id: &str) {
        let stock = db.stock().get(product_id).await.unwrap();
        let batches = db.batches().list_for_product(product_id).await.unwrap();
        let total: Decimal = batches.iter().map(|b| b.quantity).sum();
        assert_eq!(stock.quantity, total);
    }

    #[tokio::test]
    async fn test_fifo_split_deletes_first_batch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.pcs, 100).await;

        let first = restock(&db, &p.id, "5", None).await;
        let second = restock(&db, &p.id, "5", None).await;

        let outcome = db.stock().sell(&p.id, dec("7")).await.unwrap();
        assert_eq!(outcome.sold_quantity, dec("7"));
        assert_eq!(outcome.remaining_stock, dec("3"));

        let left = db.batches().list_for_product(&p.id).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, second.id);
        assert_eq!(left[0].quantity, dec("3"));
        assert!(matches!(
            db.batches().get(&first.id).await,
            Err(DbError::Domain(CoreError::BatchNotFound(_)))
        ));
        assert_ledger_matches(&db, &p.id).await;
    }

    #[tokio::test]
    async fn test_expiring_batch_sold_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.kg, 450).await;
        let today = Utc::now().date_naive();

        let undated = restock(&db, &p.id, "2.5", None).await;
        let late = restock(&db, &p.id, "1.5", Some(today + Duration::days(30))).await;
        let soon = restock(&db, &p.id, "1", Some(today + Duration::days(3))).await;

        db.stock().sell(&p.id, dec("1.25")).await.unwrap();

        let left = db.batches().list_for_product(&p.id).await.unwrap();
        let ids: Vec<_> = left.iter().map(|b| b.id.as_str()).collect();
        assert!(!ids.contains(&soon.id.as_str()));
        assert_eq!(ids, vec![late.id.as_str(), undated.id.as_str()]);
        assert_eq!(left[0].quantity, dec("1.25"));
        assert_eq!(left[1].quantity, dec("2.5"));
        assert_eq!(db.stock().get(&p.id).await.unwrap().quantity.to_string(), "3.750");
    }

    #[tokio::test]
    async fn test_selling_everything_leaves_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.pcs, 100).await;

        restock(&db, &p.id, "10", None).await;

        let after_three = db.stock().sell(&p.id, dec("3")).await.unwrap();
        assert_eq!(after_three.remaining_stock, dec("7"));
        assert_eq!(
            db.batches().list_for_product(&p.id).await.unwrap()[0].quantity,
            dec("7")
        );

        let after_seven = db.stock().sell(&p.id, dec("7")).await.unwrap();
        assert_eq!(after_seven.remaining_stock, Decimal::ZERO);
        assert!(db.batches().list_for_product(&p.id).await.unwrap().is_empty());
        assert_eq!(db.stock().get(&p.id).await.unwrap().quantity, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_rejects_bad_quantities_without_mutation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.pcs, 100).await;
        restock(&db, &p.id, "4", None).await;

        for bad in ["0", "-1", "0.00001"] {
            let err = db.stock().sell(&p.id, dec(bad)).await.unwrap_err();
            assert!(
                matches!(err, DbError::Domain(CoreError::InvalidQuantity { .. })),
                "{bad}: {err:?}"
            );
        }

        let err = db.stock().sell(&p.id, dec("2.5")).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::FractionalQuantityNotAllowed { .. })
        ));

        let err = db.stock().sell(&p.id, dec("5")).await.unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, dec("4"));
                assert_eq!(requested, dec("5"));
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(db.stock().get(&p.id).await.unwrap().quantity, dec("4"));
        assert_eq!(
            db.batches().list_for_product(&p.id).await.unwrap()[0].quantity,
            dec("4")
        );
    }

    #[tokio::test]
    async fn test_quantity_rounds_half_up_to_unit_precision() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.kg, 450).await;
        restock(&db, &p.id, "2", None).await;

        let outcome = db.stock().sell(&p.id, dec("0.2345")).await.unwrap();
        assert_eq!(outcome.sold_quantity.to_string(), "0.235");
        assert_eq!(outcome.remaining_stock.to_string(), "1.765");
    }

    #[tokio::test]
    async fn test_update_quantity_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.kg, 450).await;
        restock(&db, &p.id, "1.5", None).await;
        restock(&db, &p.id, "0.25", None).await;

        let first = db.stock().update_quantity(&p.id).await.unwrap();
        let second = db.stock().update_quantity(&p.id).await.unwrap();
        assert_eq!(first.quantity, dec("1.75"));
        assert_eq!(first.quantity, second.quantity);
        assert_ledger_matches(&db, &p.id).await;
    }

    #[tokio::test]
    async fn test_drifted_stock_is_a_ledger_fault() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.pcs, 100).await;

        // Stock says 5 but there are no batches behind it.
        sqlx::query("UPDATE stocks SET quantity = '5' WHERE product_id = ?1")
            .bind(&p.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.stock().sell(&p.id, dec("2")).await.unwrap_err();
        assert!(err.is_integrity_fault());
        assert!(matches!(
            err,
            DbError::Domain(CoreError::LedgerInconsistency { .. })
        ));
        assert_eq!(db.stock().get(&p.id).await.unwrap().quantity, dec("5"));

        let repaired = db.stock().update_quantity(&p.id).await.unwrap();
        assert_eq!(repaired.quantity, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.stock().sell("missing", dec("1")).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sells_never_oversell() {
        let (db, path) = file_database(4).await;
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.pcs, 100).await;
        restock(&db, &p.id, "3", None).await;
        restock(&db, &p.id, "2", None).await;

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            let id = p.id.clone();
            tasks.push(tokio::spawn(async move { db.stock().sell(&id, dec("1")).await }));
        }

        let mut sold = 0;
        let mut refused = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => sold += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { .. })) => refused += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(sold, 5);
        assert_eq!(refused, 5);
        assert_eq!(db.stock().get(&p.id).await.unwrap().quantity, Decimal::ZERO);
        assert!(db.batches().list_for_product(&p.id).await.unwrap().is_empty());

        remove_database(db, path).await;
    }
}
