//! Session authentication for the admin API.
//!
//! An operator exchanges the shared admin key for an opaque bearer token.
//! Sessions live in Redis under `session:{token}` and expire on their own.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::AppState;

// =============================================================================
// TYPES
// =============================================================================

/// Stored session payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub api_key: String,
    /// Name the operator's changes are attributed to
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub expires_in: u64,
}

pub fn session_key(token: &str) -> String {
    format!("session:{token}")
}

/// Extract bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Compare keys without short-circuiting on the first differing byte
pub fn keys_match(expected: &str, supplied: &str) -> bool {
    let (a, b) = (expected.as_bytes(), supplied.as_bytes());
    if a.len() != b.len() || a.is_empty() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn unavailable(err: redis::RedisError) -> AppError {
    AppError::DependencyUnavailable(format!("session store: {err}"))
}

// =============================================================================
// SESSION STORE
// =============================================================================
#[derive(Clone)]
pub struct SessionStore {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl SessionStore {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Open a session for `user_id` and return its token
    pub async fn create(&self, user_id: &str) -> AppResult<String> {
        let token = Uuid::new_v4().simple().to_string();
        let session = Session {
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        let payload = serde_json::to_string(&session)
            .map_err(|e| AppError::Internal(format!("session encoding: {e}")))?;

        let started = Instant::now();
        redis::cmd("SET")
            .arg(session_key(&token))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut self.redis.clone())
            .await
            .map_err(unavailable)?;
        metrics::record_redis_operation("set", started.elapsed().as_secs_f64());

        tracing::info!(user_id, "Session opened");
        Ok(token)
    }

    pub async fn get(&self, token: &str) -> AppResult<Option<Session>> {
        let started = Instant::now();
        let payload: Option<String> = self
            .redis
            .clone()
            .get(session_key(token))
            .await
            .map_err(unavailable)?;
        metrics::record_redis_operation("get", started.elapsed().as_secs_f64());

        // An unreadable payload is treated as no session
        Ok(payload.and_then(|p| serde_json::from_str(&p).ok()))
    }

    /// Returns whether a session was removed
    pub async fn revoke(&self, token: &str) -> AppResult<bool> {
        let started = Instant::now();
        let removed: u64 = self
            .redis
            .clone()
            .del(session_key(token))
            .await
            .map_err(unavailable)?;
        metrics::record_redis_operation("delete", started.elapsed().as_secs_f64());
        Ok(removed > 0)
    }
}

// =============================================================================
// EXTRACTOR
// =============================================================================
/// Authenticated operator, required by every mutating admin route.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        // Already resolved by `require_session`
        if let Some(auth) = parts.extensions.get::<AuthContext>() {
            return Ok(auth.clone());
        }

        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

        let session = state
            .sessions
            .get(&token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("session expired or unknown".into()))?;

        Ok(Self {
            user_id: session.user_id,
            token,
        })
    }
}

/// Middleware guarding the admin API: rejects requests without a live
/// session and hands the resolved `AuthContext` on to handlers.
pub async fn require_session(auth: AuthContext, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match("s3cret", "s3cret"));
        assert!(!keys_match("s3cret", "s3cres"));
        assert!(!keys_match("s3cret", "s3cret-longer"));
        assert!(!keys_match("", ""));
    }

    #[test]
    fn test_session_key_and_payload() {
        assert_eq!(session_key("t1"), "session:t1");

        let session = Session {
            user_id: "operator".into(),
            created_at: Utc::now(),
        };
        let encoded = serde_json::to_string(&session).unwrap();
        let decoded: Session = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, session);
    }
}
