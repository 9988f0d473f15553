//! Login and logout.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{keys_match, AuthContext, LoginRequest, LoginResponse};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Exchange the admin key for a session token
///
/// POST /api/v1/auth/login
///
/// # Request Body
/// ```json
/// { "api_key": "...", "user_id": "operator@example.com" }
/// ```
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::BadRequest("user_id is required".into()));
    }
    if !keys_match(&state.config.admin_api_key, &request.api_key) {
        tracing::warn!(user_id, "Rejected login with invalid API key");
        return Err(AppError::Unauthorized("invalid credentials".into()));
    }

    let token = state.sessions.create(user_id).await?;
    Ok(Json(LoginResponse {
        token,
        user_id: user_id.to_string(),
        expires_in: state.sessions.ttl_secs(),
    }))
}

/// POST /api/v1/auth/logout
pub async fn logout(State(state): State<Arc<AppState>>, auth: AuthContext) -> AppResult<Json<Value>> {
    let revoked = state.sessions.revoke(&auth.token).await?;
    tracing::info!(user_id = %auth.user_id, "Session closed");
    Ok(Json(json!({ "logged_out": revoked })))
}
