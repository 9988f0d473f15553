//! Component and component version repository.
//!
//! Versions are immutable once written. The version new sections resolve to
//! is the one flagged `is_latest`; creating a version moves the flag inside
//! the same transaction.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgConnection, PgPool};

use super::{require, stores::object_or_empty};
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_optional_id};
use crate::models::{Component, ComponentVersion, ComponentWithVersion, DeleteOutcome};
use crate::schema::PropertySchema;

const COMPONENT_COLUMNS: &str = "id, name, description, category, tags, is_global, is_active, \
     default_props, created_at, updated_at";

const VERSION_COLUMNS: &str = "id, component_id, version, template_code, schema, preview_image, \
     is_active, is_latest, created_at";

/// Newest first: explicit latest flag, then creation order
const VERSION_ORDER: &str = "is_latest DESC, created_at DESC, id DESC";

// =============================================================================
// ROW TYPES
// =============================================================================
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ComponentRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_global: bool,
    pub is_active: bool,
    pub default_props: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ComponentRecord> for Component {
    fn from(row: ComponentRecord) -> Self {
        Self {
            id: format_id(row.id),
            name: row.name,
            description: row.description,
            category: row.category,
            tags: row.tags,
            is_global: row.is_global,
            is_active: row.is_active,
            default_props: row.default_props,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

impl ComponentRecord {
    pub fn from_domain(component: &Component) -> AppResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: parse_optional_id(Some(&component.id))?.unwrap_or(0),
            name: component.name.trim().to_string(),
            description: component.description.clone(),
            category: component.category.clone(),
            tags: component.tags.clone(),
            is_global: component.is_global,
            is_active: component.is_active,
            default_props: object_or_empty(&component.default_props),
            created_at: component.created_at.unwrap_or(now),
            updated_at: component.updated_at.unwrap_or(now),
        })
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct VersionRecord {
    pub id: i64,
    pub component_id: i64,
    pub version: String,
    pub template_code: String,
    pub schema: Value,
    pub preview_image: Option<String>,
    pub is_active: bool,
    pub is_latest: bool,
    pub created_at: DateTime<Utc>,
}

impl From<VersionRecord> for ComponentVersion {
    fn from(row: VersionRecord) -> Self {
        Self {
            id: format_id(row.id),
            component_id: format_id(row.component_id),
            version: row.version,
            template_code: row.template_code,
            schema: row.schema,
            preview_image: row.preview_image,
            is_active: row.is_active,
            is_latest: row.is_latest,
            created_at: Some(row.created_at),
        }
    }
}

impl VersionRecord {
    pub fn from_domain(version: &ComponentVersion) -> AppResult<Self> {
        Ok(Self {
            id: parse_optional_id(Some(&version.id))?.unwrap_or(0),
            component_id: parse_optional_id(Some(&version.component_id))?.unwrap_or(0),
            version: version.version.trim().to_string(),
            template_code: version.template_code.clone(),
            schema: object_or_empty(&version.schema),
            preview_image: version.preview_image.clone(),
            is_active: version.is_active,
            is_latest: version.is_latest,
            created_at: version.created_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Reject versions whose schema can't drive the property editor
fn validate_version(version: &ComponentVersion) -> AppResult<()> {
    require("version", &version.version)?;
    require("template_code", &version.template_code)?;
    PropertySchema::from_value(&version.schema)
        .map(|_| ())
        .map_err(|reason| AppError::ValidationFailure(format!("invalid schema: {reason}")))
}

// =============================================================================
// CONNECTION-LEVEL QUERIES
// =============================================================================

pub(crate) async fn find_component(conn: &mut PgConnection, id: i64) -> AppResult<Option<ComponentRecord>> {
    let row = sqlx::query_as::<_, ComponentRecord>(&format!(
        "SELECT {COMPONENT_COLUMNS} FROM components WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(crate) async fn find_component_by_name(
    conn: &mut PgConnection,
    name: &str,
) -> AppResult<Option<ComponentRecord>> {
    let row = sqlx::query_as::<_, ComponentRecord>(&format!(
        "SELECT {COMPONENT_COLUMNS} FROM components WHERE LOWER(name) = LOWER($1)"
    ))
    .bind(name.trim())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(crate) async fn find_components(conn: &mut PgConnection, ids: &[i64]) -> AppResult<Vec<ComponentRecord>> {
    let rows = sqlx::query_as::<_, ComponentRecord>(&format!(
        "SELECT {COMPONENT_COLUMNS} FROM components WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub(crate) async fn find_versions(conn: &mut PgConnection, ids: &[i64]) -> AppResult<Vec<VersionRecord>> {
    let rows = sqlx::query_as::<_, VersionRecord>(&format!(
        "SELECT {VERSION_COLUMNS} FROM component_versions WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Version a new section of `component_id` resolves to, if any
pub(crate) async fn latest_version(conn: &mut PgConnection, component_id: i64) -> AppResult<Option<VersionRecord>> {
    let row = sqlx::query_as::<_, VersionRecord>(&format!(
        "SELECT {VERSION_COLUMNS} FROM component_versions
         WHERE component_id = $1 AND is_active
         ORDER BY {VERSION_ORDER}
         LIMIT 1"
    ))
    .bind(component_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

async fn insert_version(
    conn: &mut PgConnection,
    component_id: i64,
    record: &VersionRecord,
) -> AppResult<VersionRecord> {
    // Clear first: a partial unique index allows one latest per component
    sqlx::query(
        "UPDATE component_versions SET is_latest = FALSE
         WHERE component_id = $1 AND is_latest",
    )
    .bind(component_id)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query_as::<_, VersionRecord>(&format!(
        "INSERT INTO component_versions (component_id, version, template_code, schema,
                                         preview_image, is_active, is_latest)
         VALUES ($1, $2, $3, $4, $5, $6, TRUE)
         RETURNING {VERSION_COLUMNS}"
    ))
    .bind(component_id)
    .bind(&record.version)
    .bind(&record.template_code)
    .bind(&record.schema)
    .bind(&record.preview_image)
    .bind(record.is_active)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

// =============================================================================
// REPOSITORY
// =============================================================================
pub struct ComponentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ComponentRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -------------------------------------------------------------------------
    // COMPONENTS
    // -------------------------------------------------------------------------

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Component>> {
        let id = parse_id(id)?;
        let mut conn = self.pool.acquire().await?;
        Ok(find_component(&mut conn, id).await?.map(Component::from))
    }

    pub async fn get_by_name(&self, name: &str) -> AppResult<Option<Component>> {
        let mut conn = self.pool.acquire().await?;
        Ok(find_component_by_name(&mut conn, name).await?.map(Component::from))
    }

    /// Catalog of components, optionally filtered by category
    pub async fn list(&self, category: Option<&str>, active_only: bool) -> AppResult<Vec<Component>> {
        let rows = sqlx::query_as::<_, ComponentRecord>(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM components
             WHERE ($1::text IS NULL OR category = $1) AND (is_active OR NOT $2)
             ORDER BY name ASC"
        ))
        .bind(category)
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Component::from).collect())
    }

    /// Create a component, and its first version when given, atomically.
    pub async fn create(
        &self,
        component: &Component,
        first_version: Option<&ComponentVersion>,
    ) -> AppResult<ComponentWithVersion> {
        require("name", &component.name)?;
        if let Some(version) = first_version {
            validate_version(version)?;
        }
        let record = ComponentRecord::from_domain(&Component {
            id: String::new(),
            ..component.clone()
        })?;

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, ComponentRecord>(&format!(
            "INSERT INTO components (name, description, category, tags, is_global,
                                     is_active, default_props)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COMPONENT_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.category)
        .bind(&record.tags)
        .bind(record.is_global)
        .bind(record.is_active)
        .bind(&record.default_props)
        .fetch_one(&mut *tx)
        .await?;

        let version = match first_version {
            Some(version) => {
                let version_record = VersionRecord::from_domain(version)?;
                Some(insert_version(&mut tx, row.id, &version_record).await?)
            }
            None => None,
        };
        tx.commit().await?;

        tracing::info!(
            component_id = row.id,
            name = %row.name,
            with_version = version.is_some(),
            "Component created"
        );
        Ok(ComponentWithVersion {
            component: row.into(),
            version: version.map(ComponentVersion::from),
        })
    }

    pub async fn update(&self, component: &Component) -> AppResult<Component> {
        require("name", &component.name)?;
        let id = parse_id(&component.id)?;
        let record = ComponentRecord::from_domain(component)?;

        let row = sqlx::query_as::<_, ComponentRecord>(&format!(
            "UPDATE components
             SET name = $2, description = $3, category = $4, tags = $5, is_global = $6,
                 is_active = $7, default_props = $8, updated_at = NOW()
             WHERE id = $1
             RETURNING {COMPONENT_COLUMNS}"
        ))
        .bind(id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.category)
        .bind(&record.tags)
        .bind(record.is_global)
        .bind(record.is_active)
        .bind(&record.default_props)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Component not found: {id}")))?;

        Ok(row.into())
    }

    /// Delete a component and its versions. Sections that used them stay
    /// and render as placeholders.
    pub async fn delete(&self, id: &str) -> AppResult<DeleteOutcome> {
        let id = parse_id(id)?;
        let result = sqlx::query("DELETE FROM components WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(DeleteOutcome::from_rows_affected(result.rows_affected()))
    }

    // -------------------------------------------------------------------------
    // VERSIONS
    // -------------------------------------------------------------------------

    pub async fn get_version(&self, id: &str) -> AppResult<Option<ComponentVersion>> {
        let id = parse_id(id)?;
        let row = sqlx::query_as::<_, VersionRecord>(&format!(
            "SELECT {VERSION_COLUMNS} FROM component_versions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ComponentVersion::from))
    }

    /// Versions of a component, latest first
    pub async fn list_versions(&self, component_id: &str) -> AppResult<Vec<ComponentVersion>> {
        let component_id = parse_id(component_id)?;
        let rows = sqlx::query_as::<_, VersionRecord>(&format!(
            "SELECT {VERSION_COLUMNS} FROM component_versions
             WHERE component_id = $1
             ORDER BY {VERSION_ORDER}"
        ))
        .bind(component_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ComponentVersion::from).collect())
    }

    pub async fn latest_version(&self, component_id: &str) -> AppResult<Option<ComponentVersion>> {
        let component_id = parse_id(component_id)?;
        let mut conn = self.pool.acquire().await?;
        Ok(latest_version(&mut conn, component_id)
            .await?
            .map(ComponentVersion::from))
    }

    /// Publish a new version; it becomes the latest.
    pub async fn create_version(
        &self,
        component_id: &str,
        version: &ComponentVersion,
    ) -> AppResult<ComponentVersion> {
        let component_id = parse_id(component_id)?;
        validate_version(version)?;
        let record = VersionRecord::from_domain(version)?;

        let mut tx = self.pool.begin().await?;
        if find_component(&mut tx, component_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Component not found: {component_id}")));
        }
        let row = insert_version(&mut tx, component_id, &record).await?;
        tx.commit().await?;

        tracing::info!(
            component_id,
            version_id = row.id,
            version = %row.version,
            "Component version published"
        );
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_component_round_trip() {
        let now = Utc::now();
        let component = Component {
            id: "5".into(),
            name: "Hero".into(),
            description: Some("Full-width banner".into()),
            category: Some("content".into()),
            tags: vec!["banner".into(), "header".into()],
            is_global: false,
            is_active: true,
            default_props: json!({"title": "Welcome"}),
            created_at: Some(now),
            updated_at: Some(now),
        };
        let back = Component::from(ComponentRecord::from_domain(&component).unwrap());
        assert_eq!(back, component);
    }

    #[test]
    fn test_version_round_trip() {
        let version = ComponentVersion {
            id: "9".into(),
            component_id: "5".into(),
            version: "1.0.0".into(),
            template_code: "<section>{{title}}</section>".into(),
            schema: json!({"title": {"type": "string"}}),
            preview_image: None,
            is_active: true,
            is_latest: true,
            created_at: Some(Utc::now()),
        };
        let back = ComponentVersion::from(VersionRecord::from_domain(&version).unwrap());
        assert_eq!(back, version);
    }

    #[test]
    fn test_version_with_bad_schema_is_rejected() {
        let version = ComponentVersion {
            version: "1.0.0".into(),
            template_code: "<div></div>".into(),
            schema: json!({"properties": "nope"}),
            ..ComponentVersion::default()
        };
        assert!(matches!(
            validate_version(&version),
            Err(AppError::ValidationFailure(_))
        ));
    }
}
