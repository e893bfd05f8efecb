//! # Repository Module
//!
//! Database repositories for Tally POS.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Units of Work                       │
//! │                                                                         │
//! │  HTTP handler / seed binary                                            │
//! │       │                                                                 │
//! │       │  db.stock().sell(&product_id, qty)                             │
//! │       ▼                                                                 │
//! │  StockRepository ──┐                                                    │
//! │  BatchRepository ──┼── pool.begin() ── *_in(&mut conn, ..) helpers      │
//! │  TransactionRepo ──┘        │              (shared across repos so one │
//! │                             │               sale is one transaction)   │
//! │                             ▼                                           │
//! │                        SQLite Database                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UnitRepository`] - Units of measure (create/read only)
//! - [`CategoryRepository`] - Product categories
//! - [`ProductRepository`] - Products, barcode generation, empty stock row
//! - [`BatchRepository`] - Batch ledger, restocking
//! - [`StockRepository`] - Stock aggregate: `sell`, `update_quantity`
//! - [`CustomerRepository`] - Customers
//! - [`TransactionRepository`] - Sale orchestrator: `checkout`, `process_sale`

pub mod batch;
pub mod category;
pub mod customer;
pub mod product;
pub(crate) mod rows;
pub mod stock;
pub mod transaction;
pub mod unit;

pub use batch::BatchRepository;
pub use category::CategoryRepository;
pub use customer::CustomerRepository;
pub use product::ProductRepository;
pub use stock::StockRepository;
pub use transaction::TransactionRepository;
pub use unit::UnitRepository;
