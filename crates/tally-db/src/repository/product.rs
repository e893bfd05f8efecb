//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Product Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   One unit of work per product                          │
//! │                                                                         │
//! │  validate name / price / barcode                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   ├── unit exists?      else UnitNotFound                               │
//! │   ├── category exists?  else CategoryNotFound                           │
//! │   ├── barcode given?    else generate (≤100 tries, then UUID digits)   │
//! │   ├── INSERT products                                                   │
//! │   ├── INSERT stocks (quantity 0 at the unit's precision)               │
//! │   └── initial batch?    INSERT batches, recompute stock                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A product therefore never exists without its stock row, and an invalid
//! initial batch leaves no product behind.
//!
//! [`ProductRepository::receive`] is the scanner entry point: a barcode that
//! already belongs to a product turns the request into a restock of that
//! product instead of a duplicate error.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::batch::{insert_batch_in, validate_restock, BatchRepository};
use super::rows::{ProductRow, UnitRow};
use super::stock::recompute_in;
use crate::error::{DbError, DbResult};
use crate::locks::ProductLocks;
use tally_core::barcode;
use tally_core::quantity::normalize;
use tally_core::validation::{
    validate_barcode, validate_price_cents, validate_product_name, validate_size_label,
};
use tally_core::{
    Batch, CoreError, NewProduct, Product, ProductReceipt, UnitOfMeasure, BARCODE_MAX_ATTEMPTS,
};

const PRODUCT_COLUMNS: &str = "id, name, unit_id, sale_price_cents, category_id, size_label, \
                               barcode, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    locks: ProductLocks,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, locks: ProductLocks) -> Self {
        ProductRepository { pool, locks }
    }

    /// Creates a product, its stock row and the optional initial batch in
    /// one transaction.
    ///
    /// ## Returns
    /// * `Ok(Product)` - with the given or generated barcode
    /// * `Err(DbError::UniqueViolation)` - the given barcode is taken
    pub async fn create(&self, new: &NewProduct) -> DbResult<Product> {
        let (product, _) = self.create_stocked(new).await?;
        Ok(product)
    }

    /// Receives goods by barcode.
    ///
    /// An unknown (or absent) barcode creates the product as [`create`]
    /// does. A known barcode appends `initial_batch` to the existing product
    /// under its lock; without a batch the existing product is returned
    /// untouched. The rest of the input is ignored in that case.
    ///
    /// [`create`]: ProductRepository::create
    pub async fn receive(&self, new: &NewProduct) -> DbResult<ProductReceipt> {
        let existing = match new.barcode.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => self.get_by_barcode(code).await?,
            _ => None,
        };

        let Some(product) = existing else {
            let (product, batch) = self.create_stocked(new).await?;
            return Ok(ProductReceipt { product, batch, created: true });
        };

        let batch = match &new.initial_batch {
            Some(initial) => {
                let batches = BatchRepository::new(self.pool.clone(), self.locks.clone());
                Some(batches.create(&initial.for_product(&product.id)).await?)
            }
            None => None,
        };

        info!(
            product_id = %product.id,
            barcode = ?product.barcode,
            restocked = batch.is_some(),
            "Barcode already known, received into existing product"
        );
        Ok(ProductReceipt { product, batch, created: false })
    }

    async fn create_stocked(&self, new: &NewProduct) -> DbResult<(Product, Option<Batch>)> {
        validate_product_name(&new.name)?;
        validate_price_cents(new.sale_price_cents)?;
        if let Some(label) = &new.size_label {
            validate_size_label(label)?;
        }
        let barcode = match new.barcode.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                validate_barcode(code)?;
                Some(code.to_string())
            }
            _ => None,
        };

        let product_id = Uuid::new_v4().to_string();
        let initial = match &new.initial_batch {
            Some(initial) => {
                let batch = initial.for_product(&product_id);
                let supplier = validate_restock(&batch)?;
                Some((batch, supplier))
            }
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let unit = unit_in(&mut tx, &new.unit_id).await?;
        ensure_category_in(&mut tx, &new.category_id).await?;

        let barcode = match barcode {
            Some(code) => code,
            None => generate_barcode_in(&mut tx).await?,
        };

        let now = Utc::now();
        let product = Product {
            id: product_id,
            name: new.name.trim().to_string(),
            unit_id: unit.id.clone(),
            sale_price_cents: new.sale_price_cents,
            category_id: new.category_id.clone(),
            size_label: new.size_label.clone(),
            barcode: Some(barcode),
            created_at: now,
            updated_at: now,
        };

        debug!(product_id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, unit_id, sale_price_cents, category_id,
                size_label, barcode, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.unit_id)
        .bind(product.sale_price_cents)
        .bind(&product.category_id)
        .bind(&product.size_label)
        .bind(&product.barcode)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, product.barcode.clone().unwrap_or_default())
            }
            other => other,
        })?;

        let zero = normalize(Decimal::ZERO, unit.decimal_places)?;
        sqlx::query(
            "INSERT INTO stocks (id, product_id, quantity, updated_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&product.id)
        .bind(zero.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let batch = match initial {
            Some((batch, supplier)) => {
                let batch = insert_batch_in(&mut tx, &batch, supplier, unit.decimal_places).await?;
                recompute_in(&mut tx, &product.id, unit.decimal_places).await?;
                Some(batch)
            }
            None => None,
        };

        tx.commit().await?;

        info!(
            product_id = %product.id,
            barcode = ?product.barcode,
            initial_quantity = ?batch.as_ref().map(|b| b.quantity),
            "Product created"
        );
        Ok((product, batch))
    }

    /// Gets a product by its ID.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::from)
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Gets a product by barcode (scanner lookup).
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1"
        ))
        .bind(barcode.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Lists products by name, paged.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, rowid LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Returns the product's base unit.
    pub async fn unit_of(&self, product_id: &str) -> DbResult<UnitOfMeasure> {
        let mut conn = self.pool.acquire().await?;
        product_unit_in(&mut conn, product_id).await
    }
}

// =============================================================================
// Connection-level helpers (shared by units of work)
// =============================================================================

pub(crate) async fn unit_in(conn: &mut SqliteConnection, unit_id: &str) -> DbResult<UnitOfMeasure> {
    let row = sqlx::query_as::<_, UnitRow>(
        "SELECT id, code, name, decimal_places FROM units WHERE id = ?1",
    )
    .bind(unit_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or_else(|| CoreError::UnitNotFound(unit_id.to_string()))?
        .into_domain()
}

async fn ensure_category_in(conn: &mut SqliteConnection, category_id: &str) -> DbResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM categories WHERE id = ?1")
        .bind(category_id)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(CoreError::CategoryNotFound(category_id.to_string()).into()),
    }
}

pub(crate) async fn product_in(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Product> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Product::from)
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
}

/// The base unit of a product.
pub(crate) async fn product_unit_in(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<UnitOfMeasure> {
    let row = sqlx::query_as::<_, UnitRow>(
        r#"
        SELECT u.id, u.code, u.name, u.decimal_places
        FROM products p
        INNER JOIN units u ON u.id = p.unit_id
        WHERE p.id = ?1
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?
        .into_domain()
}

async fn barcode_taken(conn: &mut SqliteConnection, code: &str) -> DbResult<bool> {
    let hit: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE barcode = ?1")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(hit.is_some())
}

/// Generates a barcode not used by any product.
async fn generate_barcode_in(conn: &mut SqliteConnection) -> DbResult<String> {
    for _ in 0..BARCODE_MAX_ATTEMPTS {
        let code = barcode::candidate(Utc::now());
        if !barcode_taken(conn, &code).await? {
            return Ok(code);
        }
    }

    warn!(attempts = BARCODE_MAX_ATTEMPTS, "Barcode space congested, using UUID fallback");
    Ok(barcode::fallback_barcode())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::test_support::{dec, seed_catalog, Catalog};
    use crate::{Database, DbConfig, DbError};
    use rust_decimal::Decimal;
    use tally_core::{CoreError, InitialBatch, NewProduct};

    fn new_product(catalog: &Catalog, barcode: Option<&str>) -> NewProduct {
        NewProduct {
            name: "Sugar".to_string(),
            unit_id: catalog.kg.id.clone(),
            sale_price_cents: 1250,
            category_id: catalog.category.id.clone(),
            size_label: None,
            barcode: barcode.map(str::to_string),
            initial_batch: None,
        }
    }

    fn initial(quantity: &str) -> InitialBatch {
        InitialBatch {
            quantity: dec(quantity),
            supplier: Some(" Mill Co ".to_string()),
            purchase_price_cents: Some(900),
            expiration_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_generates_barcode_and_zero_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;

        let product = db.products().create(&new_product(&catalog, None)).await.unwrap();
        let code = product.barcode.clone().unwrap();
        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        let stock = db.stock().get(&product.id).await.unwrap();
        assert_eq!(stock.quantity, Decimal::ZERO);
        assert_eq!(stock.quantity.to_string(), "0.000");

        assert_eq!(db.products().get(&product.id).await.unwrap(), product);
        assert_eq!(
            db.products().get_by_barcode(&code).await.unwrap(),
            Some(product)
        );
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;

        db.products()
            .create(&new_product(&catalog, Some("4600000000017")))
            .await
            .unwrap();
        let err = db
            .products()
            .create(&new_product(&catalog, Some("4600000000017")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_validates_references() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;

        let mut bad_unit = new_product(&catalog, None);
        bad_unit.unit_id = "missing".to_string();
        assert!(matches!(
            db.products().create(&bad_unit).await,
            Err(DbError::Domain(CoreError::UnitNotFound(_)))
        ));

        let mut bad_category = new_product(&catalog, None);
        bad_category.category_id = "missing".to_string();
        assert!(matches!(
            db.products().create(&bad_category).await,
            Err(DbError::Domain(CoreError::CategoryNotFound(_)))
        ));

        let mut bad_barcode = new_product(&catalog, Some("12-34"));
        bad_barcode.name = "Salt".to_string();
        assert!(matches!(
            db.products().create(&bad_barcode).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));

        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_with_initial_batch_stocks_in_one_step() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;

        let mut new = new_product(&catalog, Some("4600000000017"));
        new.initial_batch = Some(initial("2.5"));
        let product = db.products().create(&new).await.unwrap();

        let batches = db.batches().list_for_product(&product.id).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].quantity.to_string(), "2.500");
        assert_eq!(batches[0].supplier.as_deref(), Some("Mill Co"));
        assert_eq!(
            db.stock().get(&product.id).await.unwrap().quantity.to_string(),
            "2.500"
        );
    }

    #[tokio::test]
    async fn test_invalid_initial_batch_leaves_no_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;

        // Passes the early checks, fails on the unit's precision inside the
        // transaction after the product row is written.
        let mut new = new_product(&catalog, Some("4600000000017"));
        new.unit_id = catalog.pcs.id.clone();
        new.initial_batch = Some(initial("1.5"));
        assert!(matches!(
            db.products().create(&new).await,
            Err(DbError::Domain(CoreError::FractionalQuantityNotAllowed { .. }))
        ));

        let mut zero = new_product(&catalog, None);
        zero.initial_batch = Some(initial("0"));
        assert!(matches!(
            db.products().create(&zero).await,
            Err(DbError::Domain(CoreError::InvalidQuantity { .. }))
        ));

        assert_eq!(db.products().count().await.unwrap(), 0);
        assert_eq!(db.products().get_by_barcode("4600000000017").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_receive_unknown_barcode_creates_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;

        let mut new = new_product(&catalog, Some("4600000000017"));
        new.initial_batch = Some(initial("3"));
        let receipt = db.products().receive(&new).await.unwrap();

        assert!(receipt.created);
        assert_eq!(receipt.product.barcode.as_deref(), Some("4600000000017"));
        assert_eq!(receipt.batch.unwrap().quantity.to_string(), "3.000");
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_receive_known_barcode_appends_batch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = seed_catalog(&db).await;

        let mut first = new_product(&catalog, Some("4600000000017"));
        first.initial_batch = Some(initial("3"));
        let original = db.products().create(&first).await.unwrap();

        // Name and price of a repeat delivery do not overwrite the product.
        let mut again = new_product(&catalog, Some(" 4600000000017 "));
        again.name = "Sugar, refined".to_string();
        again.sale_price_cents = 1400;
        again.initial_batch = Some(initial("1.25"));
        let receipt = db.products().receive(&again).await.unwrap();

        assert!(!receipt.created);
        assert_eq!(receipt.product, original);
        assert_eq!(receipt.batch.as_ref().unwrap().product_id, original.id);
        assert_eq!(db.products().count().await.unwrap(), 1);
        assert_eq!(db.batches().list_for_product(&original.id).await.unwrap().len(), 2);
        assert_eq!(
            db.stock().get(&original.id).await.unwrap().quantity.to_string(),
            "4.250"
        );

        // Without a batch the known product comes back unchanged.
        let mut lookup = new_product(&catalog, Some("4600000000017"));
        lookup.initial_batch = None;
        let receipt = db.products().receive(&lookup).await.unwrap();
        assert!(!receipt.created);
        assert!(receipt.batch.is_none());
        assert_eq!(
            db.stock().get(&original.id).await.unwrap().quantity.to_string(),
            "4.250"
        );
    }
}
