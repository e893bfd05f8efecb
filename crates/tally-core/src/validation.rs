//! # Validation Module
//!
//! Input validation utilities for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP boundary (tally-api)                                    │
//! │  └── Type validation (deserialization, decimal strings)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, formats, ranges                                          │
//! │  └── Dates relative to a caller-supplied "today"                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (barcode, phone, unit code)                    │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_barcode, validate_product_name};
//!
//! validate_product_name("Cable NYM 3x2.5").unwrap();
//! validate_barcode("460123456789").unwrap();
//! ```

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_AMOUNT_CENTS, MAX_DECIMAL_PLACES, MAX_TRANSACTION_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required_with_max(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 255 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Sugar").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required_with_max("name", name, 255)
}

pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    required_with_max("name", name, 255)
}

/// Validates an optional size label (at most 50 characters).
pub fn validate_size_label(label: &str) -> ValidationResult<()> {
    if label.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "size_label".to_string(),
            max: 50,
        });
    }
    Ok(())
}

/// Validates a barcode.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
/// - Digits only
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_barcode;
///
/// assert!(validate_barcode("4601234567890").is_ok());
/// assert!(validate_barcode("46-01").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    required_with_max("barcode", barcode, 100)?;

    if !barcode.trim().chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit-of-measure code: 1-10 lowercase ASCII letters.
pub fn validate_unit_code(code: &str) -> ValidationResult<()> {
    required_with_max("code", code, 10)?;

    if !code.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only lowercase letters".to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - At most 20 characters
/// - Optional leading `+`, then digits, spaces or hyphens
/// - At least one digit
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    required_with_max("phone", phone, 20)?;

    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let well_formed = body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
        && body.chars().any(|c| c.is_ascii_digit());

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, hyphens and an optional leading +"
                .to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in minor units: `0..=MAX_AMOUNT_CENTS`.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(i64::MAX).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a unit's precision (0 to `MAX_DECIMAL_PLACES`).
pub fn validate_decimal_places(dp: u32) -> ValidationResult<()> {
    if dp > MAX_DECIMAL_PLACES {
        return Err(ValidationError::OutOfRange {
            field: "decimal_places".to_string(),
            min: 0,
            max: MAX_DECIMAL_PLACES as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Business Validators
// =============================================================================

/// A transaction must have between 1 and `MAX_TRANSACTION_LINES` lines.
pub fn validate_line_count(lines: usize) -> CoreResult<()> {
    if lines == 0 {
        return Err(CoreError::EmptyTransaction);
    }
    if lines > MAX_TRANSACTION_LINES {
        return Err(CoreError::TooManyLines {
            max: MAX_TRANSACTION_LINES,
        });
    }
    Ok(())
}

/// Rejects expiration dates before `today`. Today itself is allowed.
///
/// `today` is passed in so the rule stays free of clock access.
pub fn validate_expiration_date(date: Option<NaiveDate>, today: NaiveDate) -> CoreResult<()> {
    match date {
        Some(date) if date < today => Err(CoreError::ExpirationInPast { date }),
        _ => Ok(()),
    }
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
