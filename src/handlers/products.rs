//! Product endpoints and the bulk export toggle.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{deleted, found};
use crate::batch;
use crate::error::AppResult;
use crate::models::{BatchReport, BulkExportRequest, DeleteResponse, ListParams, ListResponse, Product};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
}

/// GET /api/v1/products?category=shoes&page=1&per_page=20
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProductFilter>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ListResponse<Product>>> {
    let (items, total) = state
        .db
        .products()
        .list(filter.category.as_deref(), &params)
        .await?;
    Ok(Json(ListResponse::new(items, total, &params)))
}

/// GET /api/v1/products/:id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let product = state.db.products().get_by_id(&id).await?;
    Ok(Json(found(product, "Product", &id)?))
}

/// POST /api/v1/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(product): Json<Product>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let created = state.db.products().create(&product).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/products/:id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(product): Json<Product>,
) -> AppResult<Json<Product>> {
    let updated = state.db.products().update(&Product { id, ..product }).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let outcome = state.db.products().delete(&id).await?;
    Ok(deleted(id, outcome))
}

/// Set or clear the export flag on many products. Each product succeeds or
/// fails on its own.
///
/// POST /api/v1/products/export
///
/// # Request Body
/// ```json
/// { "product_ids": ["1", "2", "3"], "exported": true }
/// ```
pub async fn bulk_export(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkExportRequest>,
) -> Json<BatchReport> {
    let exported = request.exported;
    let report = batch::fan_out("product_export", request.product_ids, |id| {
        let db = state.db.clone();
        async move { db.products().set_exported(&id, exported).await }
    })
    .await;

    tracing::info!(
        exported,
        succeeded = report.succeeded_count,
        failed = report.failed_count,
        "Product export flags updated"
    );
    Json(report)
}
