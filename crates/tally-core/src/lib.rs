//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate is the **heart** of Tally POS. It contains all stock and sale
//! rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tally-api (HTTP boundary)                    │   │
//! │  │    POST /sell ──► POST /batches ──► POST /transactions          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ quantity  │  │  ledger   │  │   sale    │  │ validation│  │   │
//! │  │   │ normalize │  │ FIFO plan │  │ pricing   │  │   rules   │  │   │
//! │  │   │ convert   │  │ consume   │  │ loyalty   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │        SQLite, migrations, stock engine, sale orchestrator      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Batch, Stock, Transaction, ...)
//! - [`quantity`] - Per-unit precision and the central `normalize` rule
//! - [`units`] - Unit-of-measure conversion table
//! - [`ledger`] - Batch ordering and FIFO consumption planning
//! - [`money`] - Money type with integer minor units (no floating point!)
//! - [`sale`] - Line pricing and customer bookkeeping rules
//! - [`barcode`] - Barcode candidate generation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::quantity::normalize_positive;
//!
//! // 1.23456 kg on a 3-decimal unit rounds half-up to 1.235
//! let qty = normalize_positive(Decimal::new(123456, 5), 3).unwrap();
//! assert_eq!(qty.to_string(), "1.235");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod barcode;
pub mod error;
pub mod ledger;
pub mod money;
pub mod quantity;
pub mod sale;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Highest precision any unit of measure may declare.
///
/// Batch and stock quantities are persisted at this scale, so every unit's
/// precision must fit inside it.
pub const MAX_DECIMAL_PLACES: u32 = 4;

/// Maximum lines allowed in a single sale transaction.
pub const MAX_TRANSACTION_LINES: usize = 100;

/// One loyalty point is earned per this many minor currency units spent
/// (1 point per 10 major units).
pub const LOYALTY_POINT_CENTS: i64 = 1_000;

/// Largest amount, in minor units, a price, line, sale total or customer
/// balance may hold.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Attempts at a random barcode before falling back to a UUID-derived one.
pub const BARCODE_MAX_ATTEMPTS: usize = 100;
