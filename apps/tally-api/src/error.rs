//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally POS                              │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──► DbError ──► ApiError ──► HTTP        │
//! │                                                                         │
//! │  User errors      → status 4xx, message names the offending values     │
//! │  Faults           → logged with error!, generic message, status 500    │
//! │                     (LedgerInconsistency, corrupt rows, SQLite errors) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure body has the same shape:
//! ```json
//! { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for ..." }
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::CoreError;
use tally_db::DbError;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Requested quantity exceeds stock (409)
    InsufficientStock,

    /// Business rule refused the operation (422)
    BusinessLogic,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InsufficientStock => StatusCode::CONFLICT,
            ErrorCode::BusinessLogic => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::ProductNotFound(_)
            | CoreError::BatchNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::TransactionNotFound(_)
            | CoreError::CategoryNotFound(_)
            | CoreError::UnitNotFound(_) => ApiError::new(ErrorCode::NotFound, err.to_string()),

            CoreError::InvalidQuantity { .. }
            | CoreError::FractionalQuantityNotAllowed { .. }
            | CoreError::IncompatibleUnits { .. }
            | CoreError::ExpirationInPast { .. }
            | CoreError::EmptyTransaction
            | CoreError::TooManyLines { .. }
            | CoreError::AmountOutOfRange { .. } => ApiError::validation(err.to_string()),

            CoreError::Validation(inner) => ApiError::validation(inner.to_string()),

            CoreError::InsufficientStock { .. } | CoreError::InsufficientBatchStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }

            CoreError::CustomerRequiredForDebt | CoreError::AlreadyProcessed { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }

            CoreError::LedgerInconsistency { .. } => {
                error!(error = %err, "Stock ledger fault");
                ApiError::internal("Stock records are inconsistent; the operation was not applied")
            }
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ApiError::validation(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CorruptData { column, value } => {
                error!(column = %column, value = %value, "Corrupt stored value");
                ApiError::internal("Stored data could not be read")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_codes_and_statuses() {
        let oversell: ApiError = DbError::Domain(CoreError::InsufficientStock {
            product_id: "p".to_string(),
            available: Decimal::new(3, 0),
            requested: Decimal::new(5, 0),
        })
        .into();
        assert_eq!(oversell.code, ErrorCode::InsufficientStock);
        assert_eq!(oversell.code.status(), StatusCode::CONFLICT);
        assert!(oversell.message.contains("available 3"));

        let debt: ApiError = CoreError::CustomerRequiredForDebt.into();
        assert_eq!(debt.code, ErrorCode::BusinessLogic);

        let fault: ApiError = CoreError::LedgerInconsistency {
            product_id: "p".to_string(),
            expected: Decimal::new(5, 0),
            found: Decimal::ZERO,
        }
        .into();
        assert_eq!(fault.code, ErrorCode::Internal);
        assert!(!fault.message.contains("batches hold"));

        let overflow: ApiError = CoreError::AmountOutOfRange {
            field: "total_amount".to_string(),
            max: tally_core::MAX_AMOUNT_CENTS,
        }
        .into();
        assert_eq!(overflow.code, ErrorCode::ValidationError);

        let dup: ApiError = DbError::duplicate("barcode", "123").into();
        assert_eq!(dup.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_serialized_shape() {
        let body = serde_json::to_value(ApiError::not_found("Product", "abc")).unwrap();
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["message"], "Product not found: abc");
    }
}
