//! Store repository.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use std::time::Instant;

use super::{observe, require};
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_optional_id};
use crate::models::{DeleteOutcome, ListParams, Store};

const STORE_COLUMNS: &str = "id, user_id, name, description, logo, favicon, subdomain, \
     custom_domain, template_id, customization, settings, is_active, is_published, \
     created_at, updated_at";

// =============================================================================
// ROW TYPE
// =============================================================================
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StoreRecord {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub favicon: Option<String>,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
    pub template_id: Option<i64>,
    pub customization: Value,
    pub settings: Value,
    pub is_active: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoreRecord> for Store {
    fn from(row: StoreRecord) -> Self {
        Self {
            id: format_id(row.id),
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            logo: row.logo,
            favicon: row.favicon,
            subdomain: row.subdomain,
            custom_domain: row.custom_domain,
            template_id: row.template_id.map(format_id),
            customization: row.customization,
            settings: row.settings,
            is_active: row.is_active,
            is_published: row.is_published,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

impl StoreRecord {
    /// Storage representation of a store. An empty id maps to 0 (unassigned).
    pub fn from_domain(store: &Store) -> AppResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: parse_optional_id(Some(&store.id))?.unwrap_or(0),
            user_id: store.user_id.clone(),
            name: store.name.clone(),
            description: store.description.clone(),
            logo: store.logo.clone(),
            favicon: store.favicon.clone(),
            subdomain: store.subdomain.clone(),
            custom_domain: store.custom_domain.clone(),
            template_id: parse_optional_id(store.template_id.as_deref())?,
            customization: object_or_empty(&store.customization),
            settings: object_or_empty(&store.settings),
            is_active: store.is_active,
            is_published: store.is_published,
            created_at: store.created_at.unwrap_or(now),
            updated_at: store.updated_at.unwrap_or(now),
        })
    }
}

/// JSONB blob columns default to an empty object rather than JSON null
pub(crate) fn object_or_empty(value: &Value) -> Value {
    if value.is_null() {
        Value::Object(Default::default())
    } else {
        value.clone()
    }
}

// =============================================================================
// REPOSITORY
// =============================================================================
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Store>> {
        let id = parse_id(id)?;
        let started = Instant::now();
        let row = sqlx::query_as::<_, StoreRecord>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        observe("select", started);

        Ok(row.map(Store::from))
    }

    /// List stores, optionally only those owned by `user_id`
    pub async fn list(&self, user_id: Option<&str>, params: &ListParams) -> AppResult<(Vec<Store>, i64)> {
        let (limit, offset) = params.limit_offset();
        let started = Instant::now();

        let rows = sqlx::query_as::<_, StoreRecord>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores
             WHERE ($1::text IS NULL OR user_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stores WHERE ($1::text IS NULL OR user_id = $1)")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;
        observe("select", started);

        Ok((rows.into_iter().map(Store::from).collect(), total.0))
    }

    pub async fn create(&self, store: &Store) -> AppResult<Store> {
        require("name", &store.name)?;
        require("user_id", &store.user_id)?;
        let record = StoreRecord::from_domain(&Store { id: String::new(), ..store.clone() })?;
        let started = Instant::now();

        let row = sqlx::query_as::<_, StoreRecord>(&format!(
            "INSERT INTO stores (user_id, name, description, logo, favicon, subdomain,
                                 custom_domain, template_id, customization, settings,
                                 is_active, is_published)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(&record.user_id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.logo)
        .bind(&record.favicon)
        .bind(&record.subdomain)
        .bind(&record.custom_domain)
        .bind(record.template_id)
        .bind(&record.customization)
        .bind(&record.settings)
        .bind(record.is_active)
        .bind(record.is_published)
        .fetch_one(self.pool)
        .await?;
        observe("insert", started);

        tracing::info!(store_id = row.id, name = %row.name, "Store created");
        Ok(row.into())
    }

    pub async fn update(&self, store: &Store) -> AppResult<Store> {
        require("name", &store.name)?;
        let id = parse_id(&store.id)?;
        let record = StoreRecord::from_domain(store)?;
        let started = Instant::now();

        let row = sqlx::query_as::<_, StoreRecord>(&format!(
            "UPDATE stores
             SET name = $2, description = $3, logo = $4, favicon = $5, subdomain = $6,
                 custom_domain = $7, template_id = $8, customization = $9, settings = $10,
                 is_active = $11, is_published = $12, updated_at = NOW()
             WHERE id = $1
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.logo)
        .bind(&record.favicon)
        .bind(&record.subdomain)
        .bind(&record.custom_domain)
        .bind(record.template_id)
        .bind(&record.customization)
        .bind(&record.settings)
        .bind(record.is_active)
        .bind(record.is_published)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Store not found: {id}")))?;
        observe("update", started);

        Ok(row.into())
    }

    /// Delete a store; its pages and their sections cascade.
    pub async fn delete(&self, id: &str) -> AppResult<DeleteOutcome> {
        let id = parse_id(id)?;
        let result = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(DeleteOutcome::from_rows_affected(result.rows_affected()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Store {
        let now = Utc::now();
        Store {
            id: "7".into(),
            user_id: "user-1".into(),
            name: "Demo".into(),
            description: Some("A demo shop".into()),
            logo: Some("/logo.png".into()),
            favicon: None,
            subdomain: Some("demo".into()),
            custom_domain: None,
            template_id: Some("3".into()),
            customization: json!({"primaryColor": "#ff0000"}),
            settings: json!({"currency": "TRY"}),
            is_active: true,
            is_published: false,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let store = sample();
        let back = Store::from(StoreRecord::from_domain(&store).unwrap());
        assert_eq!(back, store);
    }

    #[test]
    fn test_unassigned_id_and_null_blobs() {
        let store = Store {
            id: String::new(),
            customization: Value::Null,
            ..sample()
        };
        let record = StoreRecord::from_domain(&store).unwrap();
        assert_eq!(record.id, 0);
        assert_eq!(record.customization, json!({}));
    }

    #[test]
    fn test_bad_template_id_is_invalid_identifier() {
        let store = Store {
            template_id: Some("tmpl-x".into()),
            ..sample()
        };
        assert!(matches!(
            StoreRecord::from_domain(&store),
            Err(AppError::InvalidIdentifier(_))
        ));
    }
}
