//! Fixtures shared by the repository tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{Database, DbConfig};
use tally_core::{Batch, Category, NewBatch, NewCategory, NewProduct, NewUnit, Product, UnitOfMeasure};

pub struct Catalog {
    pub pcs: UnitOfMeasure,
    pub kg: UnitOfMeasure,
    pub m: UnitOfMeasure,
    pub category: Category,
}

pub fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap()
}

pub async fn seed_catalog(db: &Database) -> Catalog {
    let unit = |code: &str, name: &str, dp: u32| NewUnit {
        code: code.to_string(),
        name: name.to_string(),
        decimal_places: dp,
    };

    Catalog {
        pcs: db.units().create(&unit("pcs", "Piece", 0)).await.unwrap(),
        kg: db.units().create(&unit("kg", "Kilogram", 3)).await.unwrap(),
        m: db.units().create(&unit("m", "Metre", 2)).await.unwrap(),
        category: db
            .categories()
            .create(&NewCategory {
                name: "Other".to_string(),
            })
            .await
            .unwrap(),
    }
}

pub async fn product(db: &Database, unit: &UnitOfMeasure, price_cents: i64) -> Product {
    db.products()
        .create(&NewProduct {
            name: format!("Test {}", unit.code),
            unit_id: unit.id.clone(),
            sale_price_cents: price_cents,
            category_id: category_id(db).await,
            size_label: None,
            barcode: None,
            initial_batch: None,
        })
        .await
        .unwrap()
}

async fn category_id(db: &Database) -> String {
    db.categories().list().await.unwrap()[0].id.clone()
}

pub async fn restock(
    db: &Database,
    product_id: &str,
    quantity: &str,
    expiration_date: Option<NaiveDate>,
) -> Batch {
    db.batches()
        .create(&NewBatch {
            product_id: product_id.to_string(),
            quantity: dec(quantity),
            supplier: None,
            purchase_price_cents: None,
            expiration_date,
        })
        .await
        .unwrap()
}

/// A file-backed database in the temp dir; concurrency tests need more than
/// the single in-memory connection.
pub async fn file_database(max_connections: u32) -> (Database, PathBuf) {
    let path = std::env::temp_dir().join(format!("tally-{}.db", uuid::Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path).max_connections(max_connections))
        .await
        .unwrap();
    (db, path)
}

pub async fn remove_database(db: Database, path: PathBuf) {
    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}
