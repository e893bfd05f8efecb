//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Stock, ledger and sale rule violations          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  tally-api errors (app)                                                │
//! │  └── ApiError         - What clients see (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include the offending values in messages (available, requested, ...)
//! 3. Errors are enum variants, never String
//! 4. Integrity faults are distinguishable from user input errors

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Unit of measure not found: {0}")]
    UnitNotFound(String),

    /// Quantity is zero or negative after normalization.
    #[error("Quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: Decimal },

    /// A fractional quantity was given for a unit with zero decimal places.
    #[error("Quantity {quantity} must be a whole number for this unit")]
    FractionalQuantityNotAllowed { quantity: Decimal },

    /// Requested quantity exceeds the product's cached stock.
    ///
    /// ## User Workflow
    /// ```text
    /// sell(product, 5)
    ///      │
    ///      ▼
    /// Check stock: available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Client shows: "Only 3 in stock"
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Requested consumption exceeds a single batch's quantity.
    #[error("Insufficient stock in batch {batch_id}: available {available}, requested {requested}")]
    InsufficientBatchStock {
        batch_id: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("A customer is required for debt payments")]
    CustomerRequiredForDebt,

    /// `process_sale` called on a transaction that is no longer pending.
    #[error("Transaction {transaction_id} is already {status}")]
    AlreadyProcessed {
        transaction_id: String,
        status: String,
    },

    #[error("Cannot convert from '{from}' to '{to}'")]
    IncompatibleUnits { from: String, to: String },

    #[error("Expiration date {date} is in the past")]
    ExpirationInPast { date: NaiveDate },

    #[error("Transaction must contain at least one item")]
    EmptyTransaction,

    #[error("Transaction cannot have more than {max} items")]
    TooManyLines { max: usize },

    /// A computed amount (line total, sale total, customer balance) does
    /// not fit the supported money range.
    #[error("{field} is out of range (limit {max} minor units)")]
    AmountOutOfRange { field: String, max: i64 },

    /// The cached stock aggregate disagrees with the batch ledger.
    ///
    /// This signals a bug or out-of-band data edit, never bad input.
    #[error("Ledger inconsistency for product {product_id}: stock shows {expected}, batches hold {found}")]
    LedgerInconsistency {
        product_id: String,
        expected: Decimal,
        found: Decimal,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for internal-consistency faults that must be logged as bugs
    /// and surfaced as a generic failure.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, CoreError::LedgerInconsistency { .. })
    }

    /// True when the error means a referenced entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::BatchNotFound(_)
                | CoreError::CustomerNotFound(_)
                | CoreError::TransactionNotFound(_)
                | CoreError::CategoryNotFound(_)
                | CoreError::UnitNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., non-numeric barcode, unparsable decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_carries_values() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: Decimal::new(3, 0),
            requested: Decimal::new(55, 1),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: available 3, requested 5.5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 100,
        };
        assert_eq!(err.to_string(), "barcode must be at most 100 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "phone".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_fault_classification() {
        let fault = CoreError::LedgerInconsistency {
            product_id: "p".to_string(),
            expected: Decimal::ONE,
            found: Decimal::ZERO,
        };
        assert!(fault.is_integrity_fault());
        assert!(!fault.is_not_found());
        assert!(CoreError::BatchNotFound("b".into()).is_not_found());
        assert!(!CoreError::CustomerRequiredForDebt.is_integrity_fault());
    }
}
