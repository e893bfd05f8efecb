//! Units, categories and products.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use super::Page;
use crate::error::ApiResult;
use crate::AppState;
use tally_core::{
    Category, NewCategory, NewProduct, NewUnit, Product, ProductReceipt, UnitOfMeasure,
};

pub async fn list_units(State(state): State<AppState>) -> ApiResult<Json<Vec<UnitOfMeasure>>> {
    Ok(Json(state.db.units().list().await?))
}

pub async fn create_unit(
    State(state): State<AppState>,
    payload: Result<Json<NewUnit>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UnitOfMeasure>)> {
    let Json(input) = payload?;
    let unit = state.db.units().create(&input).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.categories().list().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let Json(input) = payload?;
    let category = state.db.categories().create(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_products(
    State(state): State<AppState>,
    page: Result<Query<Page>, QueryRejection>,
) -> ApiResult<Json<Vec<Product>>> {
    let Query(page) = page?;
    Ok(Json(state.db.products().list(page.limit(), page.offset()).await?))
}

/// Creates a product together with its empty stock. A missing barcode
/// is generated.
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let Json(input) = payload?;
    debug!(name = %input.name, "create_product");
    let product = state.db.products().create(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Scanner intake: 201 when the barcode was new, 200 when the goods were
/// appended to the product that already carries it.
pub async fn receive_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductReceipt>)> {
    let Json(input) = payload?;
    debug!(barcode = ?input.barcode, "receive_product");
    let receipt = state.db.products().receive(&input).await?;
    let status = if receipt.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(receipt)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().get(&id).await?))
}
