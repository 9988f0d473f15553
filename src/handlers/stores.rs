//! Store endpoints, including template application.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{deleted, found};
use crate::error::AppResult;
use crate::models::{DeleteResponse, ListParams, ListResponse, Store, StorePage, TemplateApplication};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StoreFilter {
    /// Only stores owned by this user
    pub user_id: Option<String>,
}

/// GET /api/v1/stores?user_id=...&page=1&per_page=20
pub async fn list_stores(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<StoreFilter>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ListResponse<Store>>> {
    let (items, total) = state
        .db
        .stores()
        .list(filter.user_id.as_deref(), &params)
        .await?;
    Ok(Json(ListResponse::new(items, total, &params)))
}

/// GET /api/v1/stores/:id
pub async fn get_store(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> AppResult<Json<Store>> {
    let store = state.db.stores().get_by_id(&id).await?;
    Ok(Json(found(store, "Store", &id)?))
}

/// POST /api/v1/stores
pub async fn create_store(
    State(state): State<Arc<AppState>>,
    Json(store): Json<Store>,
) -> AppResult<(StatusCode, Json<Store>)> {
    let created = state.db.stores().create(&store).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/stores/:id
pub async fn update_store(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(store): Json<Store>,
) -> AppResult<Json<Store>> {
    let updated = state.db.stores().update(&Store { id, ..store }).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/stores/:id
pub async fn delete_store(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let outcome = state.db.stores().delete(&id).await?;
    tracing::info!(store_id = %id, outcome = ?outcome, "Store deleted");
    Ok(deleted(id, outcome))
}

/// Pages of a store, homepage first
///
/// GET /api/v1/stores/:id/pages
pub async fn list_store_pages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<StorePage>>> {
    Ok(Json(state.db.pages().list_by_store(&id).await?))
}

/// Create the template's default pages on the store
///
/// POST /api/v1/stores/:id/apply-template/:template_id
pub async fn apply_template(
    State(state): State<Arc<AppState>>,
    Path((id, template_id)): Path<(String, String)>,
) -> AppResult<(StatusCode, Json<TemplateApplication>)> {
    let application = state.composer.apply_template(&id, &template_id).await?;
    Ok((StatusCode::CREATED, Json(application)))
}
