//! # Inventory Handlers
//!
//! Selling against the Stock aggregate and restocking the batch ledger.
//! Quantities arrive as decimal strings and are parsed before anything
//! touches the database.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiResult;
use crate::AppState;
use tally_core::quantity::parse_quantity;
use tally_core::{Batch, CoreError, NewBatch, SellOutcome, Stock};

/// Body of `POST /api/products/{id}/sell`.
#[derive(Debug, Deserialize)]
pub struct SellRequest {
    /// Decimal string in the product's base unit, e.g. `"2.5"`.
    pub quantity: String,
}

pub async fn sell(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    payload: Result<Json<SellRequest>, JsonRejection>,
) -> ApiResult<Json<SellOutcome>> {
    let Json(body) = payload?;
    let quantity = parse_quantity("quantity", &body.quantity).map_err(CoreError::from)?;

    debug!(product_id = %product_id, quantity = %quantity, "sell");
    Ok(Json(state.db.stock().sell(&product_id, quantity).await?))
}

pub async fn get_stock(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Stock>> {
    Ok(Json(state.db.stock().get(&product_id).await?))
}

/// Rebuilds the stock total from the batch ledger.
pub async fn recompute_stock(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Stock>> {
    Ok(Json(state.db.stock().update_quantity(&product_id).await?))
}

/// Batches in the order they will be sold from.
pub async fn list_batches(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Vec<Batch>>> {
    Ok(Json(state.db.batches().list_for_product(&product_id).await?))
}

pub async fn create_batch(
    State(state): State<AppState>,
    payload: Result<Json<NewBatch>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Batch>)> {
    let Json(input) = payload?;
    let batch = state.db.batches().create(&input).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Batch>> {
    Ok(Json(state.db.batches().get(&id).await?))
}
