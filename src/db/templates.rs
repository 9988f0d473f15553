//! Store template repository.

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};

use super::require;
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_optional_id};
use crate::models::{DeleteOutcome, StoreTemplate, TemplatePage};

const TEMPLATE_COLUMNS: &str = "id, name, description, thumbnail, template_type, default_pages, \
     components, is_active, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TemplateRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub template_type: String,
    pub default_pages: Json<Vec<TemplatePage>>,
    pub components: Json<Vec<String>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TemplateRecord> for StoreTemplate {
    fn from(row: TemplateRecord) -> Self {
        Self {
            id: format_id(row.id),
            name: row.name,
            description: row.description,
            thumbnail: row.thumbnail,
            template_type: row.template_type,
            default_pages: row.default_pages.0,
            components: row.components.0,
            is_active: row.is_active,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

impl TemplateRecord {
    pub fn from_domain(template: &StoreTemplate) -> AppResult<Self> {
        let now = Utc::now();
        let template_type = if template.template_type.trim().is_empty() {
            "default".to_string()
        } else {
            template.template_type.clone()
        };
        Ok(Self {
            id: parse_optional_id(Some(&template.id))?.unwrap_or(0),
            name: template.name.clone(),
            description: template.description.clone(),
            thumbnail: template.thumbnail.clone(),
            template_type,
            default_pages: Json(template.default_pages.clone()),
            components: Json(template.components.clone()),
            is_active: template.is_active,
            created_at: template.created_at.unwrap_or(now),
            updated_at: template.updated_at.unwrap_or(now),
        })
    }
}

pub struct TemplateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TemplateRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<StoreTemplate>> {
        let id = parse_id(id)?;
        let row = sqlx::query_as::<_, TemplateRecord>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM store_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(StoreTemplate::from))
    }

    pub async fn get_by_name(&self, name: &str) -> AppResult<Option<StoreTemplate>> {
        let row = sqlx::query_as::<_, TemplateRecord>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM store_templates WHERE name = $1 ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(StoreTemplate::from))
    }

    /// Templates, active ones only unless `include_inactive`
    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<StoreTemplate>> {
        let rows = sqlx::query_as::<_, TemplateRecord>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM store_templates
             WHERE is_active OR $1
             ORDER BY name ASC"
        ))
        .bind(include_inactive)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(StoreTemplate::from).collect())
    }

    pub async fn create(&self, template: &StoreTemplate) -> AppResult<StoreTemplate> {
        require("name", &template.name)?;
        let record = TemplateRecord::from_domain(&StoreTemplate {
            id: String::new(),
            ..template.clone()
        })?;

        let row = sqlx::query_as::<_, TemplateRecord>(&format!(
            "INSERT INTO store_templates (name, description, thumbnail, template_type,
                                          default_pages, components, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.thumbnail)
        .bind(&record.template_type)
        .bind(&record.default_pages)
        .bind(&record.components)
        .bind(record.is_active)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(template_id = row.id, name = %row.name, "Store template created");
        Ok(row.into())
    }

    pub async fn update(&self, template: &StoreTemplate) -> AppResult<StoreTemplate> {
        require("name", &template.name)?;
        let id = parse_id(&template.id)?;
        let record = TemplateRecord::from_domain(template)?;

        let row = sqlx::query_as::<_, TemplateRecord>(&format!(
            "UPDATE store_templates
             SET name = $2, description = $3, thumbnail = $4, template_type = $5,
                 default_pages = $6, components = $7, is_active = $8, updated_at = NOW()
             WHERE id = $1
             RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.thumbnail)
        .bind(&record.template_type)
        .bind(&record.default_pages)
        .bind(&record.components)
        .bind(record.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Store template not found: {id}")))?;

        Ok(row.into())
    }

    pub async fn delete(&self, id: &str) -> AppResult<DeleteOutcome> {
        let id = parse_id(id)?;
        let result = sqlx::query("DELETE FROM store_templates WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(DeleteOutcome::from_rows_affected(result.rows_affected()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_fields() {
        let now = Utc::now();
        let template = StoreTemplate {
            id: "2".into(),
            name: "Starter".into(),
            description: None,
            thumbnail: Some("/thumbs/starter.png".into()),
            template_type: "ecommerce".into(),
            default_pages: vec![TemplatePage {
                title: "Ana Sayfa".into(),
                slug: "home".into(),
                is_homepage: true,
                components: vec!["Navbar".into(), "Hero".into()],
            }],
            components: vec!["Navbar".into(), "Hero".into()],
            is_active: true,
            created_at: Some(now),
            updated_at: Some(now),
        };

        let back = StoreTemplate::from(TemplateRecord::from_domain(&template).unwrap());
        assert_eq!(back, template);
    }
}
