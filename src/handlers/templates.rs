//! Store template endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{deleted, found};
use crate::error::AppResult;
use crate::models::{DeleteResponse, StoreTemplate};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TemplateListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/v1/templates?include_inactive=true
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TemplateListQuery>,
) -> AppResult<Json<Vec<StoreTemplate>>> {
    Ok(Json(state.db.templates().list(query.include_inactive).await?))
}

/// GET /api/v1/templates/:id
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<StoreTemplate>> {
    let template = state.db.templates().get_by_id(&id).await?;
    Ok(Json(found(template, "Store template", &id)?))
}

/// POST /api/v1/templates
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(template): Json<StoreTemplate>,
) -> AppResult<(StatusCode, Json<StoreTemplate>)> {
    let created = state.db.templates().create(&template).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/templates/:id
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(template): Json<StoreTemplate>,
) -> AppResult<Json<StoreTemplate>> {
    let updated = state
        .db
        .templates()
        .update(&StoreTemplate { id, ..template })
        .await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/templates/:id
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let outcome = state.db.templates().delete(&id).await?;
    Ok(deleted(id, outcome))
}
