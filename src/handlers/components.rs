//! Component catalog and version endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{deleted, found};
use crate::error::AppResult;
use crate::models::{
    Component, ComponentVersion, ComponentWithVersion, CreateComponentRequest, DeleteResponse,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ComponentFilter {
    pub category: Option<String>,
    /// Hide deactivated components (the "add section" picker)
    #[serde(default)]
    pub active_only: bool,
}

/// GET /api/v1/components?category=hero&active_only=true
pub async fn list_components(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ComponentFilter>,
) -> AppResult<Json<Vec<Component>>> {
    let components = state
        .db
        .components()
        .list(filter.category.as_deref(), filter.active_only)
        .await?;
    Ok(Json(components))
}

/// Create a component, optionally with its first version
///
/// POST /api/v1/components
///
/// # Request Body
/// ```json
/// {
///   "component": { "name": "Hero", "category": "hero", "is_active": true },
///   "first_version": { "version": "1.0.0", "template_code": "<section>...</section>", "schema": {} }
/// }
/// ```
pub async fn create_component(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateComponentRequest>,
) -> AppResult<(StatusCode, Json<ComponentWithVersion>)> {
    let created = state
        .db
        .components()
        .create(&request.component, request.first_version.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/components/:id
pub async fn get_component(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Component>> {
    let component = state.db.components().get_by_id(&id).await?;
    Ok(Json(found(component, "Component", &id)?))
}

/// PUT /api/v1/components/:id
pub async fn update_component(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(component): Json<Component>,
) -> AppResult<Json<Component>> {
    let updated = state
        .db
        .components()
        .update(&Component { id, ..component })
        .await?;
    Ok(Json(updated))
}

/// Delete a component with its versions. Sections that used them render as
/// placeholders; cached composed pages expire on their own TTL.
///
/// DELETE /api/v1/components/:id
pub async fn delete_component(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let outcome = state.db.components().delete(&id).await?;
    Ok(deleted(id, outcome))
}

/// Versions of a component, newest first
///
/// GET /api/v1/components/:id/versions
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<ComponentVersion>>> {
    Ok(Json(state.db.components().list_versions(&id).await?))
}

/// POST /api/v1/components/:id/versions
pub async fn create_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(version): Json<ComponentVersion>,
) -> AppResult<(StatusCode, Json<ComponentVersion>)> {
    let created = state.db.components().create_version(&id, &version).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/versions/:id
pub async fn get_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ComponentVersion>> {
    let version = state.db.components().get_version(&id).await?;
    Ok(Json(found(version, "Component version", &id)?))
}
