// =============================================================================
// HANDLERS MODULE
// =============================================================================
// HTTP request handlers (controller layer), one submodule per resource.
//
// Handlers stay thin: extract, call a repository or the composition
// service, translate an absent record into 404, serialize.
// =============================================================================

pub mod auth;
pub mod components;
pub mod customers;
pub mod orders;
pub mod pages;
pub mod products;
pub mod sections;
pub mod stores;
pub mod templates;
pub mod warehouses;

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{DeleteOutcome, DeleteResponse, HealthResponse, ReadinessChecks, ReadinessResponse};
use crate::AppState;

// =============================================================================
// HEALTH CHECK ENDPOINTS
// =============================================================================

/// Liveness probe
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "store-builder-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe: database and Redis must both answer.
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let db_healthy = state.db.health_check().await;

    let redis_healthy = redis::cmd("PING")
        .query_async::<_, String>(&mut state.redis.clone())
        .await
        .is_ok();

    let all_healthy = db_healthy && redis_healthy;
    let status = if all_healthy { "ready" } else { "not_ready" };

    let response = ReadinessResponse {
        status: status.to_string(),
        checks: ReadinessChecks {
            database: db_healthy,
            redis: redis_healthy,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        tracing::warn!(database = db_healthy, redis = redis_healthy, "Readiness check failed");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

// =============================================================================
// METRICS
// =============================================================================

/// Prometheus metrics in text exposition format
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

/// Count and time every routed request, labelled by its route template
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    metrics::record_http_request(
        &method,
        &endpoint,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Turn an absent lookup result into a 404
pub(crate) fn found<T>(value: Option<T>, what: &str, id: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::NotFound(format!("{what} not found: {id}")))
}

pub(crate) fn deleted(id: String, outcome: DeleteOutcome) -> Json<DeleteResponse> {
    Json(DeleteResponse { id, outcome })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.service, "store-builder-service");
    }

    #[test]
    fn test_found() {
        assert_eq!(found(Some(3), "Store", "1").unwrap(), 3);
        let err = found::<i32>(None, "Store", "9").unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Store not found: 9"));
    }
}
