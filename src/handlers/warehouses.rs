//! Warehouse, stock and inventory transaction endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::{deleted, found};
use crate::auth::AuthContext;
use crate::batch;
use crate::error::AppResult;
use crate::models::{
    BatchReport, BulkStockItem, BulkStockRequest, DeleteResponse, InventoryTransaction,
    RecordTransactionRequest, Stock, Warehouse,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub transaction: InventoryTransaction,
    pub stock: Stock,
}

/// GET /api/v1/warehouses
pub async fn list_warehouses(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Warehouse>>> {
    Ok(Json(state.db.warehouses().list().await?))
}

/// GET /api/v1/warehouses/:id
pub async fn get_warehouse(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Warehouse>> {
    let warehouse = state.db.warehouses().get_by_id(&id).await?;
    Ok(Json(found(warehouse, "Warehouse", &id)?))
}

/// POST /api/v1/warehouses
pub async fn create_warehouse(
    State(state): State<Arc<AppState>>,
    Json(warehouse): Json<Warehouse>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    let created = state.db.warehouses().create(&warehouse).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/warehouses/:id
pub async fn update_warehouse(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(warehouse): Json<Warehouse>,
) -> AppResult<Json<Warehouse>> {
    let updated = state
        .db
        .warehouses()
        .update(&Warehouse { id, ..warehouse })
        .await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/warehouses/:id
pub async fn delete_warehouse(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let outcome = state.db.warehouses().delete(&id).await?;
    Ok(deleted(id, outcome))
}

// =============================================================================
// STOCK
// =============================================================================

/// GET /api/v1/warehouses/:id/stock
pub async fn list_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Stock>>> {
    Ok(Json(state.db.warehouses().list_stock(&id).await?))
}

/// Receive stock for many products at once. Every product is its own IN
/// transaction attributed to the caller; the report lists which landed.
///
/// POST /api/v1/warehouses/:id/stock/bulk
///
/// # Request Body
/// ```json
/// { "items": [{ "product_id": "3", "quantity": 10 }, { "product_id": "4", "quantity": 5 }] }
/// ```
pub async fn bulk_add_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: AuthContext,
    Json(request): Json<BulkStockRequest>,
) -> Json<BatchReport> {
    let (product_ids, quantities) = merge_items(request.items);

    let report = batch::fan_out("stock_entry", product_ids, |product_id| {
        let db = state.db.clone();
        let warehouse_id = id.clone();
        let user_id = auth.user_id.clone();
        let quantity = quantities.get(&product_id).copied().unwrap_or_default();
        async move {
            db.warehouses()
                .add_stock(&warehouse_id, &user_id, &product_id, quantity)
                .await
        }
    })
    .await;

    Json(report)
}

/// Collapse repeated products into one entry, summing quantities. The id
/// list keeps first-seen order.
fn merge_items(items: Vec<BulkStockItem>) -> (Vec<String>, HashMap<String, i32>) {
    let mut order = Vec::new();
    let mut quantities: HashMap<String, i32> = HashMap::new();

    for item in items {
        let product_id = item.product_id.trim().to_string();
        match quantities.get_mut(&product_id) {
            Some(total) => *total = total.saturating_add(item.quantity),
            None => {
                order.push(product_id.clone());
                quantities.insert(product_id, item.quantity);
            }
        }
    }
    (order, quantities)
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// GET /api/v1/warehouses/:id/transactions?limit=50
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<Vec<InventoryTransaction>>> {
    let transactions = state
        .db
        .warehouses()
        .list_transactions(&id, query.limit)
        .await?;
    Ok(Json(transactions))
}

/// Record a single IN or OUT movement. An OUT larger than the stock on hand
/// is rejected with 409.
///
/// POST /api/v1/warehouses/:id/transactions
pub async fn record_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: AuthContext,
    Json(request): Json<RecordTransactionRequest>,
) -> AppResult<(StatusCode, Json<TransactionResponse>)> {
    let (transaction, stock) = state
        .db
        .warehouses()
        .record_transaction(&id, &auth.user_id, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(TransactionResponse { transaction, stock })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, quantity: i32) -> BulkStockItem {
        BulkStockItem {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_merge_items_sums_duplicates() {
        let (ids, quantities) = merge_items(vec![item("3", 10), item("4", 5), item(" 3 ", 2)]);

        assert_eq!(ids, vec!["3".to_string(), "4".to_string()]);
        assert_eq!(quantities["3"], 12);
        assert_eq!(quantities["4"], 5);
    }

    #[test]
    fn test_merge_items_empty() {
        let (ids, quantities) = merge_items(Vec::new());
        assert!(ids.is_empty());
        assert!(quantities.is_empty());
    }
}
