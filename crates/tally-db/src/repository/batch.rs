//! # Batch Repository
//!
//! The batch ledger: discrete stock lots per product. Restocking appends a
//! batch (batches are never merged) and recomputes the product's stock in
//! the same transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::product::product_unit_in;
use super::rows::BatchRow;
use super::stock::{lock_stock_row, recompute_in};
use crate::error::DbResult;
use crate::locks::ProductLocks;
use tally_core::ledger::sort_fifo;
use tally_core::quantity::normalize_positive;
use tally_core::validation::{validate_expiration_date, validate_price_cents};
use tally_core::{Batch, CoreError, NewBatch, ValidationError};

const BATCH_COLUMNS: &str =
    "id, product_id, quantity, purchase_price_cents, supplier, expiration_date, created_at";

const MAX_SUPPLIER_LENGTH: usize = 255;

#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
    locks: ProductLocks,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool, locks: ProductLocks) -> Self {
        BatchRepository { pool, locks }
    }

    /// Restocks a product with a new batch.
    ///
    /// ## Errors
    /// * `InvalidQuantity` / `FractionalQuantityNotAllowed` - quantity does
    ///   not normalize to a positive value under the product's unit
    /// * `ExpirationInPast` - expiration date before today
    /// * `ProductNotFound`
    pub async fn create(&self, new: &NewBatch) -> DbResult<Batch> {
        let supplier = validate_restock(new)?;

        let _guards = self.locks.lock(&new.product_id).await;
        let mut tx = self.pool.begin().await?;

        lock_stock_row(&mut tx, &new.product_id).await?;
        let unit = product_unit_in(&mut tx, &new.product_id).await?;
        let batch = insert_batch_in(&mut tx, new, supplier, unit.decimal_places).await?;

        let stock = recompute_in(&mut tx, &batch.product_id, unit.decimal_places).await?;
        tx.commit().await?;

        info!(
            batch_id = %batch.id,
            product_id = %batch.product_id,
            quantity = %batch.quantity,
            stock = %stock.quantity,
            "Batch received"
        );
        Ok(batch)
    }

    pub async fn get(&self, id: &str) -> DbResult<Batch> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| CoreError::BatchNotFound(id.to_string()))?
            .into_domain()
    }

    /// A product's batches in consumption order.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        let mut conn = self.pool.acquire().await?;
        load_batches(&mut conn, product_id).await
    }
}

/// Checks the unit-independent restock fields and returns the trimmed
/// supplier.
pub(crate) fn validate_restock(new: &NewBatch) -> DbResult<Option<String>> {
    validate_expiration_date(new.expiration_date, Utc::now().date_naive())?;
    if let Some(cents) = new.purchase_price_cents {
        validate_price_cents(cents)?;
    }
    let supplier = new
        .supplier
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    if supplier.as_ref().is_some_and(|s| s.chars().count() > MAX_SUPPLIER_LENGTH) {
        return Err(ValidationError::TooLong {
            field: "supplier".to_string(),
            max: MAX_SUPPLIER_LENGTH,
        }
        .into());
    }
    Ok(supplier)
}

/// Normalizes the quantity and inserts the batch row.
///
/// The caller holds the product's lock (or owns a product nobody else can
/// see yet) and recomputes the stock before committing.
pub(crate) async fn insert_batch_in(
    conn: &mut SqliteConnection,
    new: &NewBatch,
    supplier: Option<String>,
    decimal_places: u32,
) -> DbResult<Batch> {
    let quantity = normalize_positive(new.quantity, decimal_places)?;

    let batch = Batch {
        id: Uuid::new_v4().to_string(),
        product_id: new.product_id.clone(),
        quantity,
        purchase_price_cents: new.purchase_price_cents,
        supplier,
        expiration_date: new.expiration_date,
        created_at: Utc::now(),
    };

    debug!(batch_id = %batch.id, product_id = %batch.product_id, quantity = %quantity, "Inserting batch");

    sqlx::query(
        r#"
        INSERT INTO batches (
            id, product_id, quantity, purchase_price_cents,
            supplier, expiration_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&batch.id)
    .bind(&batch.product_id)
    .bind(batch.quantity.to_string())
    .bind(batch.purchase_price_cents)
    .bind(&batch.supplier)
    .bind(batch.expiration_date)
    .bind(batch.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(batch)
}

/// Loads a product's batches in FIFO order.
///
/// Rows come back in insertion order and the sort is stable, so insertion
/// order is the final tie-break.
pub(crate) async fn load_batches(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<Batch>> {
    let rows = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM batches WHERE product_id = ?1 ORDER BY rowid"
    ))
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut batches = rows
        .into_iter()
        .map(BatchRow::into_domain)
        .collect::<DbResult<Vec<_>>>()?;
    sort_fifo(&mut batches);
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{dec, product, restock, seed_catalog};
    use crate::{Database, DbConfig, DbError};
    use chrono::{Duration, Utc};
    use tally_core::{CoreError, NewBatch};

    #[tokio::test]
    async fn test_create_appends_and_recomputes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.m, 800).await;

        let batch = db
            .batches()
            .create(&NewBatch {
                product_id: p.id.clone(),
                quantity: dec("12.345"),
                supplier: Some("  Kabel LLC ".to_string()),
                purchase_price_cents: Some(500),
                expiration_date: None,
            })
            .await
            .unwrap();
        assert_eq!(batch.quantity.to_string(), "12.35");
        assert_eq!(batch.supplier.as_deref(), Some("Kabel LLC"));

        restock(&db, &p.id, "12.35", None).await;

        // Same quantity twice stays two batches.
        assert_eq!(db.batches().list_for_product(&p.id).await.unwrap().len(), 2);
        assert_eq!(db.stock().get(&p.id).await.unwrap().quantity.to_string(), "24.70");
        assert_eq!(db.batches().get(&batch.id).await.unwrap(), batch);
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;
        let p = product(&db, &catalog.pcs, 100).await;
        let base = NewBatch {
            product_id: p.id.clone(),
            quantity: dec("3"),
            supplier: None,
            purchase_price_cents: None,
            expiration_date: None,
        };

        let mut zero = base.clone();
        zero.quantity = dec("0");
        assert!(matches!(
            db.batches().create(&zero).await,
            Err(DbError::Domain(CoreError::InvalidQuantity { .. }))
        ));

        let mut fractional = base.clone();
        fractional.quantity = dec("2.5");
        assert!(matches!(
            db.batches().create(&fractional).await,
            Err(DbError::Domain(CoreError::FractionalQuantityNotAllowed { .. }))
        ));

        let mut expired = base.clone();
        expired.expiration_date = Some(Utc::now().date_naive() - Duration::days(1));
        assert!(matches!(
            db.batches().create(&expired).await,
            Err(DbError::Domain(CoreError::ExpirationInPast { .. }))
        ));

        let mut orphan = base.clone();
        orphan.product_id = "missing".to_string();
        assert!(matches!(
            db.batches().create(&orphan).await,
            Err(DbError::Domain(CoreError::ProductNotFound(_)))
        ));

        assert!(db.batches().list_for_product(&p.id).await.unwrap().is_empty());
        assert!(db.stock().get(&p.id).await.unwrap().quantity.is_zero());

        let mut today = base;
        today.expiration_date = Some(Utc::now().date_naive());
        assert!(db.batches().create(&today).await.is_ok());
    }
}
