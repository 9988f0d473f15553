// =============================================================================
// MODELS MODULE
// =============================================================================
// Domain objects exposed by the repositories and the HTTP API.
//
// All identifiers are opaque strings at this boundary even though storage
// uses 64-bit integers; the db module translates between the two.
// =============================================================================

pub mod commerce;
pub mod component;
pub mod store;

pub use commerce::*;
pub use component::*;
pub use store::*;

use serde::{Deserialize, Serialize};

/// Serde default for activation flags: records are active unless the body
/// says otherwise, matching the column defaults.
pub(crate) fn default_true() -> bool {
    true
}

// =============================================================================
// SHARED API STRUCTURES
// =============================================================================

/// Pagination query parameters
///
/// # Example
/// GET /api/v1/products?page=2&per_page=20
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: i64,

    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}
fn default_per_page() -> i64 {
    20
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl ListParams {
    /// Clamp to sane bounds and return (limit, offset)
    pub fn limit_offset(&self) -> (i64, i64) {
        let page = self.page.max(1);
        let per_page = self.per_page.clamp(1, 100);
        (per_page, (page - 1) * per_page)
    }
}

/// Paginated list response
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> ListResponse<T> {
    /// Page of results echoing the effective (clamped) pagination
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        let (per_page, _) = params.limit_offset();
        Self {
            items,
            total,
            page: params.page.max(1),
            per_page,
        }
    }
}

// -----------------------------------------------------------------------------
// DELETE OUTCOME
// -----------------------------------------------------------------------------
/// Result of a delete. Removing an already-absent record is a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

impl DeleteOutcome {
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows > 0 {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::AlreadyAbsent
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: String,
    pub outcome: DeleteOutcome,
}

// -----------------------------------------------------------------------------
// BATCH REPORT
// -----------------------------------------------------------------------------
/// Outcome of a bulk operation where every item succeeds or fails on its own
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<BatchFailure>,
    pub succeeded_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub id: String,
    pub error: String,
}

// =============================================================================
// HEALTH CHECK RESPONSES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: bool,
    pub redis: bool,
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset_clamps() {
        let params = ListParams { page: 0, per_page: 500 };
        assert_eq!(params.limit_offset(), (100, 0));

        let params = ListParams { page: 3, per_page: 20 };
        assert_eq!(params.limit_offset(), (20, 40));
    }

    #[test]
    fn test_records_are_active_unless_told_otherwise() {
        let body = serde_json::json!({ "name": "Demo" });
        assert!(serde_json::from_value::<Store>(body.clone()).unwrap().is_active);
        assert!(serde_json::from_value::<StoreTemplate>(body.clone()).unwrap().is_active);
        assert!(serde_json::from_value::<Product>(body.clone()).unwrap().is_active);
        assert!(serde_json::from_value::<Warehouse>(body).unwrap().is_active);

        let off = serde_json::json!({ "name": "Demo", "is_active": false });
        assert!(!serde_json::from_value::<Store>(off).unwrap().is_active);
    }

    #[test]
    fn test_delete_outcome() {
        assert_eq!(DeleteOutcome::from_rows_affected(1), DeleteOutcome::Deleted);
        assert_eq!(DeleteOutcome::from_rows_affected(0), DeleteOutcome::AlreadyAbsent);
    }
}
