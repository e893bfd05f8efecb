//! # Tally API
//!
//! HTTP request boundary for Tally POS.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Tally API Routes                              │
//! │                                                                         │
//! │  ┌────────────────────┐  ┌─────────────────────┐  ┌──────────────────┐ │
//! │  │  Catalog           │  │  Inventory          │  │  Sales           │ │
//! │  │                    │  │                     │  │                  │ │
//! │  │ • /api/units       │  │ • POST .../sell     │  │ • POST checkout  │ │
//! │  │ • /api/categories  │  │ • POST /api/batches │  │ • POST pending   │ │
//! │  │ • /api/products    │  │ • .../stock         │  │ • POST .../      │ │
//! │  │                    │  │ • .../recompute     │  │   process        │ │
//! │  └────────────────────┘  └─────────────────────┘  └──────────────────┘ │
//! │                                                                         │
//! │  ┌────────────────────┐  ┌─────────────────────┐                       │
//! │  │  Customers         │  │  Health             │                       │
//! │  │ • /api/customers   │  │ • GET /health       │                       │
//! │  └────────────────────┘  └─────────────────────┘                       │
//! │                                                                         │
//! │  Every handler: JSON in → one tally-db operation → JSON out            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `TALLY_HTTP_ADDR` - bind address (default: 127.0.0.1:8080)
//! - `TALLY_DATABASE_PATH` - SQLite file (default: ./tally.db)
//! - `TALLY_DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `TALLY_CASHIER_ID` - cashier for sales that name none (default: system)
//! - `RUST_LOG` - tracing filter (default: info)

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tally_db::Database;
use tracing_subscriber::EnvFilter;

// Re-exports
pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}

/// Initializes the global tracing subscriber; `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    use handlers::{catalog, customers, health, inventory, sales};

    let api = Router::new()
        // Catalog
        .route("/units", get(catalog::list_units).post(catalog::create_unit))
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route("/products/receive", post(catalog::receive_product))
        .route("/products/{id}", get(catalog::get_product))
        // Inventory
        .route("/products/{id}/sell", post(inventory::sell))
        .route("/products/{id}/stock", get(inventory::get_stock))
        .route("/products/{id}/stock/recompute", post(inventory::recompute_stock))
        .route("/products/{id}/batches", get(inventory::list_batches))
        .route("/batches", post(inventory::create_batch))
        .route("/batches/{id}", get(inventory::get_batch))
        // Sales
        .route(
            "/transactions",
            get(sales::list_transactions).post(sales::checkout),
        )
        .route("/transactions/pending", post(sales::create_pending))
        .route("/transactions/{id}", get(sales::get_transaction))
        .route("/transactions/{id}/process", post(sales::process_sale))
        .route("/transactions/{id}/history", get(sales::get_history))
        // Customers
        .route(
            "/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route("/customers/{id}", get(customers::get_customer));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .with_state(state)
}

// =============================================================================
// Router Tests
// =============================================================================
