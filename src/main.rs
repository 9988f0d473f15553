// =============================================================================
// STORE BUILDER SERVICE - Main Entry Point
// =============================================================================
// Loads configuration, connects PostgreSQL and Redis, optionally seeds the
// sample component catalog, then serves the HTTP API.
// =============================================================================

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use store_builder_service::config::Config;
use store_builder_service::db::Database;
use store_builder_service::metrics::setup_metrics;
use store_builder_service::{build_router, seed, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Load environment variables
    // -------------------------------------------------------------------------
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // -------------------------------------------------------------------------
    // STEP 2: Initialize logging/tracing
    // -------------------------------------------------------------------------
    // Example: RUST_LOG=info,store_builder_service=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,store_builder_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Store Builder Service...");

    // -------------------------------------------------------------------------
    // STEP 3: Load configuration
    // -------------------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        port = config.port,
        request_timeout_ms = config.request_timeout_ms,
        retry_max_attempts = config.retry_max_attempts,
        "Configuration loaded"
    );

    // -------------------------------------------------------------------------
    // STEP 4: Set up Prometheus metrics
    // -------------------------------------------------------------------------
    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    // -------------------------------------------------------------------------
    // STEP 5: Connect to PostgreSQL database
    // -------------------------------------------------------------------------
    let db = Database::connect(&config.database_url).await?;
    info!("Connected to PostgreSQL");

    db.run_migrations().await?;
    info!("Database migrations completed");

    if config.seed_sample_data {
        let inserted = seed::seed_sample_data(&db).await?;
        info!(inserted, "Sample catalog seeded");
    }

    // -------------------------------------------------------------------------
    // STEP 6: Connect to Redis
    // -------------------------------------------------------------------------
    // ConnectionManager reconnects on its own
    let redis_client = redis::Client::open(config.redis_url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    info!("Connected to Redis");

    // -------------------------------------------------------------------------
    // STEP 7: Create application state and routes
    // -------------------------------------------------------------------------
    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(db, redis_conn, metrics_handle, config));
    let app = build_router(state);

    // -------------------------------------------------------------------------
    // STEP 8: Start the HTTP server
    // -------------------------------------------------------------------------
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Store Builder Service is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
