//! # Database Migrations
//!
//! The schema ships inside the binary (`sqlx::migrate!`) and is applied on
//! connect. sqlx records applied versions in `_sqlx_migrations`, so
//! re-running is a no-op.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   units, categories, products, stocks,
//!                              batches, customers, transactions,
//!                              transaction_items, transaction_history
//! ```
//!
//! New schema changes go in a new `NNN_description.sql`; applied files are
//! never edited, sqlx checksums them.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    info!("Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
