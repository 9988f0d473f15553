//! Order endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{deleted, found};
use crate::error::AppResult;
use crate::models::{DeleteResponse, ListParams, ListResponse, Order, UpdatePaymentRequest};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub customer_id: Option<String>,
}

/// GET /api/v1/orders?customer_id=7&page=1
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<OrderFilter>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ListResponse<Order>>> {
    let (items, total) = state
        .db
        .orders()
        .list(filter.customer_id.as_deref(), &params)
        .await?;
    Ok(Json(ListResponse::new(items, total, &params)))
}

/// GET /api/v1/orders/:id
pub async fn get_order(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> AppResult<Json<Order>> {
    let order = state.db.orders().get_by_id(&id).await?;
    Ok(Json(found(order, "Order", &id)?))
}

/// Create an order with its line items; totals are computed here, not
/// taken from the body.
///
/// POST /api/v1/orders
///
/// # Request Body
/// ```json
/// {
///   "customer_id": "7",
///   "shipping_cost": "15.00",
///   "items": [{ "product_id": "3", "quantity": 2, "unit_price": "49.90" }]
/// }
/// ```
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(order): Json<Order>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let created = state.db.orders().create(&order).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/orders/:id
pub async fn update_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(order): Json<Order>,
) -> AppResult<Json<Order>> {
    let updated = state.db.orders().update(&Order { id, ..order }).await?;
    Ok(Json(updated))
}

/// PUT /api/v1/orders/:id/payment
pub async fn update_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePaymentRequest>,
) -> AppResult<Json<Order>> {
    let updated = state.db.orders().update_payment(&id, &request).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/orders/:id
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let outcome = state.db.orders().delete(&id).await?;
    Ok(deleted(id, outcome))
}
