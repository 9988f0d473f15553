//! Page endpoints and the page-level composition operations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{deleted, found};
use crate::error::AppResult;
use crate::ids::canonical_id;
use crate::models::{
    AddSectionRequest, ComposedPage, DeleteResponse, PageSection, ReorderSectionsRequest, StorePage,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ComposedQuery {
    /// The editor asks for hidden sections too; the storefront doesn't
    #[serde(default)]
    pub include_hidden: bool,
}

/// POST /api/v1/pages
pub async fn create_page(
    State(state): State<Arc<AppState>>,
    Json(page): Json<StorePage>,
) -> AppResult<(StatusCode, Json<StorePage>)> {
    let created = state.db.pages().create(&page).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/pages/:id
pub async fn get_page(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> AppResult<Json<StorePage>> {
    let page = state.db.pages().get_by_id(&id).await?;
    Ok(Json(found(page, "Page", &id)?))
}

/// PUT /api/v1/pages/:id
pub async fn update_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(page): Json<StorePage>,
) -> AppResult<Json<StorePage>> {
    let id = canonical_id(&id)?;
    let updated = state.db.pages().update(&StorePage { id, ..page }).await?;
    state.cache.invalidate(&updated.id).await;
    Ok(Json(updated))
}

/// Delete a page with all of its sections
///
/// DELETE /api/v1/pages/:id
pub async fn delete_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let id = canonical_id(&id)?;
    let outcome = state.db.pages().delete(&id).await?;
    state.cache.invalidate(&id).await;
    Ok(deleted(id, outcome))
}

// -----------------------------------------------------------------------------
// COMPOSITION
// -----------------------------------------------------------------------------

/// Page with its ordered sections resolved to components and versions
///
/// GET /api/v1/pages/:id/composed?include_hidden=true
pub async fn get_composed_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ComposedQuery>,
) -> AppResult<Json<ComposedPage>> {
    // Cache keys use the canonical id so every spelling hits the same entry
    let id = canonical_id(&id)?;
    if let Some(cached) = state.cache.get(&id, query.include_hidden).await {
        return Ok(Json(cached));
    }

    let composed = state.composer.load_page(&id, query.include_hidden).await?;
    let composed = found(composed, "Page", &id)?;
    state.cache.put(&id, query.include_hidden, &composed).await;
    Ok(Json(composed))
}

/// Persist a new section order. The body must list every section of the
/// page exactly once; the result is the full, renumbered list.
///
/// PUT /api/v1/pages/:id/sections/order
///
/// # Request Body
/// ```json
/// { "section_ids": ["14", "12", "13"] }
/// ```
pub async fn reorder_sections(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ReorderSectionsRequest>,
) -> AppResult<Json<Vec<PageSection>>> {
    let id = canonical_id(&id)?;
    let sections = state.composer.reorder(&id, &request.section_ids).await?;
    state.cache.invalidate(&id).await;
    Ok(Json(sections))
}

/// Append a section for a component's latest version
///
/// POST /api/v1/pages/:id/sections
pub async fn add_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AddSectionRequest>,
) -> AppResult<(StatusCode, Json<PageSection>)> {
    let id = canonical_id(&id)?;
    let section = state
        .composer
        .add_section(&id, &request.component_id, request.name.as_deref())
        .await?;
    state.cache.invalidate(&id).await;
    Ok((StatusCode::CREATED, Json(section)))
}
