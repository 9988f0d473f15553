// =============================================================================
// STORE BUILDER SERVICE - Library Root
// =============================================================================
// Back-office service for an e-commerce site:
// - Stores built from templates, pages composed of component sections
// - A component catalog with versioned templates and property schemas
// - Product, order, warehouse and customer administration
// - RFM customer segmentation
//
// The binary in main.rs only wires configuration and connections; everything
// routable lives here so integration tests can build the same router.
// =============================================================================

pub mod auth;
pub mod batch;
pub mod cache;
pub mod composition;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod metrics;
pub mod models;
pub mod retry;
pub mod schema;
pub mod seed;
pub mod segmentation;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::SessionStore;
use crate::cache::PageCache;
use crate::composition::PageComposer;
use crate::config::Config;
use crate::db::Database;

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
/// Shared by every handler through `State<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,

    /// Raw connection for readiness probes; sessions and the page cache
    /// hold their own clones
    pub redis: redis::aio::ConnectionManager,

    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,

    pub config: Config,

    pub sessions: SessionStore,

    pub cache: PageCache,

    pub composer: PageComposer,
}

impl AppState {
    pub fn new(
        db: Database,
        redis: redis::aio::ConnectionManager,
        metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
        config: Config,
    ) -> Self {
        let sessions = SessionStore::new(redis.clone(), config.session_ttl_secs);
        let cache = PageCache::new(redis.clone(), config.page_cache_ttl_secs);
        let composer = PageComposer::new(db.clone(), config.retry_policy());
        Self {
            db,
            redis,
            metrics_handle,
            config,
            sessions,
            cache,
            composer,
        }
    }
}

// -----------------------------------------------------------------------------
// ROUTES
// -----------------------------------------------------------------------------

/// Build the full HTTP surface.
///
/// Probes, metrics and login are public; everything else under `/api/v1`
/// requires a session token.
pub fn build_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/v1/auth/login", post(handlers::auth::login));

    let api = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        // ----- Stores & templates -----
        .route(
            "/stores",
            get(handlers::stores::list_stores).post(handlers::stores::create_store),
        )
        .route(
            "/stores/:id",
            get(handlers::stores::get_store)
                .put(handlers::stores::update_store)
                .delete(handlers::stores::delete_store),
        )
        .route("/stores/:id/pages", get(handlers::stores::list_store_pages))
        .route(
            "/stores/:id/apply-template/:template_id",
            post(handlers::stores::apply_template),
        )
        .route(
            "/templates",
            get(handlers::templates::list_templates).post(handlers::templates::create_template),
        )
        .route(
            "/templates/:id",
            get(handlers::templates::get_template)
                .put(handlers::templates::update_template)
                .delete(handlers::templates::delete_template),
        )
        // ----- Pages & sections -----
        .route("/pages", post(handlers::pages::create_page))
        .route(
            "/pages/:id",
            get(handlers::pages::get_page)
                .put(handlers::pages::update_page)
                .delete(handlers::pages::delete_page),
        )
        .route("/pages/:id/composed", get(handlers::pages::get_composed_page))
        .route("/pages/:id/sections", post(handlers::pages::add_section))
        .route("/pages/:id/sections/order", put(handlers::pages::reorder_sections))
        .route(
            "/sections/:id",
            get(handlers::sections::get_section)
                .put(handlers::sections::update_section)
                .delete(handlers::sections::delete_section),
        )
        .route("/sections/:id/visibility", post(handlers::sections::toggle_visibility))
        .route("/sections/:id/form", get(handlers::sections::get_section_form))
        .route(
            "/sections/:id/properties/:key",
            patch(handlers::sections::edit_property),
        )
        // ----- Component catalog -----
        .route(
            "/components",
            get(handlers::components::list_components).post(handlers::components::create_component),
        )
        .route(
            "/components/:id",
            get(handlers::components::get_component)
                .put(handlers::components::update_component)
                .delete(handlers::components::delete_component),
        )
        .route(
            "/components/:id/versions",
            get(handlers::components::list_versions).post(handlers::components::create_version),
        )
        .route("/versions/:id", get(handlers::components::get_version))
        // ----- Commerce -----
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route("/products/export", post(handlers::products::bulk_export))
        .route(
            "/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/orders/:id",
            get(handlers::orders::get_order)
                .put(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        .route("/orders/:id/payment", put(handlers::orders::update_payment))
        .route(
            "/warehouses",
            get(handlers::warehouses::list_warehouses).post(handlers::warehouses::create_warehouse),
        )
        .route(
            "/warehouses/:id",
            get(handlers::warehouses::get_warehouse)
                .put(handlers::warehouses::update_warehouse)
                .delete(handlers::warehouses::delete_warehouse),
        )
        .route("/warehouses/:id/stock", get(handlers::warehouses::list_stock))
        .route("/warehouses/:id/stock/bulk", post(handlers::warehouses::bulk_add_stock))
        .route(
            "/warehouses/:id/transactions",
            get(handlers::warehouses::list_transactions).post(handlers::warehouses::record_transaction),
        )
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/:id",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route("/customers/:id/segment", get(handlers::customers::get_segment))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session));

    Router::new()
        .merge(public)
        .nest("/api/v1", api)
        .route_layer(middleware::from_fn(handlers::track_metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
