//! # Sale Handlers
//!
//! `POST /api/transactions` records and completes a sale in one step.
//! Two-phase clients call `POST /api/transactions/pending` and later
//! `POST /api/transactions/{id}/process`.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::debug;

use super::Page;
use crate::error::ApiResult;
use crate::AppState;
use tally_core::{
    CheckoutRequest, LineRequest, NewCustomer, PaymentMethod, Transaction, TransactionDetail,
    TransactionHistoryEntry,
};

/// Sale request body. `cashier_id` falls back to the configured cashier.
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    #[serde(default)]
    pub cashier_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub new_customer: Option<NewCustomer>,
    pub payment_method: PaymentMethod,
    pub items: Vec<LineRequest>,
}

impl CheckoutBody {
    fn into_request(self, default_cashier: &str) -> CheckoutRequest {
        CheckoutRequest {
            cashier_id: self
                .cashier_id
                .unwrap_or_else(|| default_cashier.to_string()),
            customer_id: self.customer_id,
            new_customer: self.new_customer,
            payment_method: self.payment_method,
            items: self.items,
        }
    }
}

pub async fn checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TransactionDetail>)> {
    let Json(body) = payload?;
    let request = body.into_request(&state.config.cashier_id);
    debug!(lines = request.items.len(), payment_method = %request.payment_method, "checkout");

    let detail = state.db.transactions().checkout(&request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn create_pending(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TransactionDetail>)> {
    let Json(body) = payload?;
    let request = body.into_request(&state.config.cashier_id);

    let detail = state.db.transactions().create_pending(&request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn process_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TransactionDetail>> {
    Ok(Json(state.db.transactions().process_sale(&id).await?))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    page: Result<Query<Page>, QueryRejection>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let Query(page) = page?;
    Ok(Json(state.db.transactions().list(page.limit(), page.offset()).await?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TransactionDetail>> {
    Ok(Json(state.db.transactions().get(&id).await?))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<TransactionHistoryEntry>>> {
    Ok(Json(state.db.transactions().history(&id).await?))
}
