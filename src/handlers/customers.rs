//! Customer endpoints and RFM segmentation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use super::{deleted, found};
use crate::error::AppResult;
use crate::models::{Customer, DeleteResponse, ListParams, ListResponse};
use crate::segmentation::{self, RfmScore};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    pub customer_id: String,
    #[serde(flatten)]
    pub score: RfmScore,
}

/// GET /api/v1/customers?page=1&per_page=20
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ListResponse<Customer>>> {
    let (items, total) = state.db.customers().list(&params).await?;
    Ok(Json(ListResponse::new(items, total, &params)))
}

/// GET /api/v1/customers/:id
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Customer>> {
    let customer = state.db.customers().get_by_id(&id).await?;
    Ok(Json(found(customer, "Customer", &id)?))
}

/// POST /api/v1/customers
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(customer): Json<Customer>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let created = state.db.customers().create(&customer).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/customers/:id
pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(customer): Json<Customer>,
) -> AppResult<Json<Customer>> {
    let updated = state
        .db
        .customers()
        .update(&Customer { id, ..customer })
        .await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/customers/:id
pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let outcome = state.db.customers().delete(&id).await?;
    Ok(deleted(id, outcome))
}

/// Recency/frequency/monetary scores and the resulting segment, as of now.
/// Cancelled orders are not counted.
///
/// GET /api/v1/customers/:id/segment
pub async fn get_segment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<SegmentResponse>> {
    let customer = state.db.customers().get_by_id(&id).await?;
    let customer = found(customer, "Customer", &id)?;

    let orders = state.db.orders().summaries_for_customer(&customer.id).await?;
    let score = segmentation::score(&orders, Utc::now());

    tracing::debug!(
        customer_id = %customer.id,
        orders = orders.len(),
        segment = ?score.segment,
        "Customer scored"
    );
    Ok(Json(SegmentResponse {
        customer_id: customer.id,
        score,
    }))
}
