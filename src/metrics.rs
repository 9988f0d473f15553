// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the store builder service, scraped from /metrics.
//
// Besides the usual HTTP/database/Redis latencies, the page builder exports
// counters for the things operators ask about: how often sections move,
// how often property edits are rejected by a schema, and how bulk
// operations split between succeeded and failed items.
// =============================================================================

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// METRIC NAMES
// =============================================================================

/// HTTP request counter
/// Labels: method, endpoint (matched route), status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// HTTP request duration histogram
/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Database query duration histogram
/// Labels: operation (select/insert/update)
pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";

/// Redis operation duration histogram
/// Labels: operation (get/set/delete)
pub const REDIS_OPERATION_DURATION_SECONDS: &str = "redis_operation_duration_seconds";

/// Sections whose position changed in a reorder
pub const SECTIONS_REORDERED_TOTAL: &str = "page_sections_reordered_total";

/// Property values rejected by a component version schema
pub const SCHEMA_VIOLATIONS_TOTAL: &str = "schema_violations_total";

/// Bulk operation items
/// Labels: operation, outcome (succeeded/failed)
pub const BATCH_ITEMS_TOTAL: &str = "batch_items_total";

/// Stock level after the latest movement
/// Labels: warehouse, product
pub const STOCK_LEVEL: &str = "inventory_stock_level";

// =============================================================================
// SETUP FUNCTION
// =============================================================================
/// Install the global Prometheus recorder
///
/// # Returns
/// * `PrometheusHandle` - renders the current metrics in text format
pub fn setup_metrics() -> Result<PrometheusHandle> {
    // 1ms .. 10s, shared by all latency histograms
    let latency_buckets = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(DB_QUERY_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(REDIS_OPERATION_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_histogram!(DB_QUERY_DURATION_SECONDS, "Database query latency in seconds");
    describe_histogram!(REDIS_OPERATION_DURATION_SECONDS, "Redis operation latency in seconds");
    describe_counter!(SECTIONS_REORDERED_TOTAL, "Page sections moved by reorder requests");
    describe_counter!(SCHEMA_VIOLATIONS_TOTAL, "Section property values rejected by their schema");
    describe_counter!(BATCH_ITEMS_TOTAL, "Items processed by bulk operations");
    describe_gauge!(STOCK_LEVEL, "Current stock level per warehouse and product");

    Ok(handle)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Record an HTTP request
///
/// # Arguments
/// * `method` - HTTP method (GET, POST, etc.)
/// * `endpoint` - Matched route (/api/v1/pages/:id), not the raw path
/// * `status` - Response status code
/// * `duration_secs` - Request duration in seconds
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

pub fn record_db_query(operation: &str, duration_secs: f64) {
    histogram!(
        DB_QUERY_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

pub fn record_redis_operation(operation: &str, duration_secs: f64) {
    histogram!(
        REDIS_OPERATION_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Count the sections a reorder actually moved
pub fn record_reorder(moved: usize) {
    counter!(SECTIONS_REORDERED_TOTAL).increment(moved as u64);
}

pub fn record_schema_violations(count: usize) {
    counter!(SCHEMA_VIOLATIONS_TOTAL).increment(count as u64);
}

/// Record one item of a bulk operation
///
/// # Arguments
/// * `operation` - Bulk operation name (product_export, stock_entry)
/// * `success` - Whether the item went through
pub fn record_batch_item(operation: &str, success: bool) {
    let outcome = if success { "succeeded" } else { "failed" };
    counter!(
        BATCH_ITEMS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn set_stock_level(warehouse: &str, product: &str, level: i32) {
    gauge!(
        STOCK_LEVEL,
        "warehouse" => warehouse.to_string(),
        "product" => product.to_string()
    )
    .set(level as f64);
}
