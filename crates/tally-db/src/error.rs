//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (tally-core rules)        │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────── DbError::Domain                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in tally-api) ← Serialized for clients                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use tally_core::CoreError;
use thiserror::Error;

/// Errors from tally-db. Any error returned from a unit of work means it
/// was rolled back and no stock, batch or customer row changed.
#[derive(Debug, Error)]
pub enum DbError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index refused the row (barcode, phone, unit code,
    /// category name).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A stored value could not be decoded, e.g. a malformed decimal in a
    /// quantity column.
    #[error("Corrupt data in {column}: {value}")]
    CorruptData { column: String, value: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn corrupt(column: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::CorruptData {
            column: column.into(),
            value: value.into(),
        }
    }

    /// True when stored data contradicts itself; these are bugs, not
    /// user errors.
    pub fn is_integrity_fault(&self) -> bool {
        match self {
            DbError::Domain(err) => err.is_integrity_fault(),
            DbError::CorruptData { .. } => true,
            _ => false,
        }
    }

    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<tally_core::ValidationError> for DbError {
    fn from(err: tally_core::ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Maps sqlx failures by kind. Constraint violations keep the offending
/// `table.column` from SQLite's message so callers can report it.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    DbError::duplicate(constraint_target(db_err.message()), "unknown")
                }
                ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                    message: db_err.message().to_string(),
                },
                _ => DbError::QueryFailed(db_err.message().to_string()),
            },

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::corrupt(index, source.to_string())
            }

            other => DbError::Internal(other.to_string()),
        }
    }
}

/// `"UNIQUE constraint failed: products.barcode"` → `"products.barcode"`.
fn constraint_target(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, target)| target.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_domain_errors_pass_through() {
        let err: DbError = CoreError::CustomerRequiredForDebt.into();
        assert_eq!(err.to_string(), "A customer is required for debt payments");
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::CustomerRequiredForDebt)
        ));
        assert!(!err.is_integrity_fault());
    }

    #[test]
    fn test_integrity_faults() {
        let ledger: DbError = CoreError::LedgerInconsistency {
            product_id: "p".into(),
            expected: Decimal::ONE,
            found: Decimal::ZERO,
        }
        .into();
        assert!(ledger.is_integrity_fault());
        assert!(DbError::corrupt("batches.quantity", "abc").is_integrity_fault());
        assert!(!DbError::not_found("Product", "x").is_integrity_fault());
    }

    #[test]
    fn test_constraint_target() {
        assert_eq!(
            constraint_target("UNIQUE constraint failed: products.barcode"),
            "products.barcode"
        );
        assert_eq!(constraint_target("no colon here"), "unknown");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
