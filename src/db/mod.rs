// =============================================================================
// DATABASE MODULE
// =============================================================================
// PostgreSQL access. `Database` owns the pool; each aggregate has a
// repository borrowing it, and each repository pairs a row type (numeric
// keys, nullable columns) with the domain type (string identifiers).
//
// Every repository offers the same five operations:
//   get_by_id -> Option<T>   (absent, not an error, when nothing matches)
//   list      -> Vec<T>
//   create    -> T           (client-supplied id ignored)
//   update    -> T           (NotFound when the id doesn't exist)
//   delete    -> DeleteOutcome
// =============================================================================

pub mod components;
pub mod customers;
pub mod orders;
pub mod pages;
pub mod products;
pub mod sections;
pub mod stores;
pub mod templates;
pub mod warehouses;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::{Duration, Instant};

use crate::error::{AppError, AppResult};

pub use components::ComponentRepository;
pub use customers::CustomerRepository;
pub use orders::OrderRepository;
pub use pages::PageRepository;
pub use products::ProductRepository;
pub use sections::SectionRepository;
pub use stores::StoreRepository;
pub use templates::TemplateRepository;
pub use warehouses::WarehouseRepository;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    // -------------------------------------------------------------------------
    // CONNECTION
    // -------------------------------------------------------------------------
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by integration tests)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -------------------------------------------------------------------------
    // MIGRATIONS
    // -------------------------------------------------------------------------
    /// Apply the versioned migrations under ./migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // REPOSITORIES
    // -------------------------------------------------------------------------
    pub fn stores(&self) -> StoreRepository<'_> {
        StoreRepository::new(&self.pool)
    }

    pub fn templates(&self) -> TemplateRepository<'_> {
        TemplateRepository::new(&self.pool)
    }

    pub fn pages(&self) -> PageRepository<'_> {
        PageRepository::new(&self.pool)
    }

    pub fn components(&self) -> ComponentRepository<'_> {
        ComponentRepository::new(&self.pool)
    }

    pub fn sections(&self) -> SectionRepository<'_> {
        SectionRepository::new(&self.pool)
    }

    pub fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.pool)
    }

    pub fn orders(&self) -> OrderRepository<'_> {
        OrderRepository::new(&self.pool)
    }

    pub fn warehouses(&self) -> WarehouseRepository<'_> {
        WarehouseRepository::new(&self.pool)
    }

    pub fn customers(&self) -> CustomerRepository<'_> {
        CustomerRepository::new(&self.pool)
    }

    // -------------------------------------------------------------------------
    // HEALTH CHECK
    // -------------------------------------------------------------------------
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Reject blank required fields before they reach the database
pub(crate) fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationFailure(format!("{field} is required")));
    }
    Ok(())
}

/// Record the duration of a query under `operation`
pub(crate) fn observe(operation: &'static str, started: Instant) {
    crate::metrics::record_db_query(operation, started.elapsed().as_secs_f64());
}
