//! Section endpoints: property edits, visibility, removal and the
//! generated property form.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::{deleted, found};
use crate::composition::SectionForm;
use crate::error::AppResult;
use crate::models::{
    DeleteOutcome, DeleteResponse, EditPropertyRequest, PageSection, ToggleVisibilityRequest,
    UpdateSectionRequest,
};
use crate::AppState;

/// GET /api/v1/sections/:id
pub async fn get_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<PageSection>> {
    let section = state.db.sections().get_by_id(&id).await?;
    Ok(Json(found(section, "Section", &id)?))
}

/// Replace name and/or properties. Properties are validated against the
/// section's component version schema; `expected_version` rejects stale
/// writes with 409.
///
/// PUT /api/v1/sections/:id
pub async fn update_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSectionRequest>,
) -> AppResult<Json<PageSection>> {
    let section = state
        .composer
        .update_section_properties(
            &id,
            request.name.as_deref(),
            request.props.as_ref(),
            request.expected_version,
        )
        .await?;
    state.cache.invalidate(&section.page_id).await;
    Ok(Json(section))
}

/// POST /api/v1/sections/:id/visibility
pub async fn toggle_visibility(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Option<Json<ToggleVisibilityRequest>>,
) -> AppResult<Json<PageSection>> {
    let Json(request) = request.unwrap_or_default();
    let section = state
        .composer
        .toggle_visibility(&id, request.expected_version)
        .await?;
    state.cache.invalidate(&section.page_id).await;
    Ok(Json(section))
}

/// Remove a section; the remaining ones are renumbered 1..N
///
/// DELETE /api/v1/sections/:id
pub async fn delete_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let page_id = state.db.sections().get_by_id(&id).await?.map(|s| s.page_id);
    let outcome = state.composer.delete_section(&id).await?;

    if let (Some(page_id), DeleteOutcome::Deleted) = (page_id, outcome) {
        state.cache.invalidate(&page_id).await;
    }
    Ok(deleted(id, outcome))
}

/// Editor form generated from the section's version schema
///
/// GET /api/v1/sections/:id/form
pub async fn get_section_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<SectionForm>> {
    let form = state.composer.section_form(&id).await?;
    Ok(Json(found(form, "Section", &id)?))
}

/// Set a single property through its widget
///
/// PATCH /api/v1/sections/:id/properties/:key
///
/// # Request Body
/// ```json
/// { "value": "#ff6600", "expected_version": 3 }
/// ```
pub async fn edit_property(
    State(state): State<Arc<AppState>>,
    Path((id, key)): Path<(String, String)>,
    Json(request): Json<EditPropertyRequest>,
) -> AppResult<Json<PageSection>> {
    let section = state
        .composer
        .edit_property(&id, &key, request.value, request.expected_version)
        .await?;
    state.cache.invalidate(&section.page_id).await;
    Ok(Json(section))
}
