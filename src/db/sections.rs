//! Page section repository.
//!
//! `sort_order` values of a page's sections form the dense sequence 1..N.
//! Structural edits (add, delete, reorder) lock the parent page row so two
//! concurrent edits can't hand out the same position.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgConnection, PgPool};

use super::stores::object_or_empty;
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_optional_id};
use crate::models::{PageSection, PropertyBag};

pub(crate) const SECTION_COLUMNS: &str = "id, page_id, component_version_id, name, props, sort_order, \
     parent_section_id, container_styles, style_overrides, is_visible, version, created_at, updated_at";

// =============================================================================
// ROW TYPE
// =============================================================================
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SectionRecord {
    pub id: i64,
    pub page_id: i64,
    pub component_version_id: i64,
    pub name: String,
    pub props: Json<PropertyBag>,
    pub sort_order: i32,
    pub parent_section_id: Option<i64>,
    pub container_styles: Value,
    pub style_overrides: Value,
    pub is_visible: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SectionRecord> for PageSection {
    fn from(row: SectionRecord) -> Self {
        Self {
            id: format_id(row.id),
            page_id: format_id(row.page_id),
            component_version_id: format_id(row.component_version_id),
            name: row.name,
            props: row.props.0,
            order: row.sort_order,
            parent_section_id: row.parent_section_id.map(format_id),
            container_styles: row.container_styles,
            style_overrides: row.style_overrides,
            is_visible: row.is_visible,
            version: row.version,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

impl SectionRecord {
    pub fn from_domain(section: &PageSection) -> AppResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: parse_optional_id(Some(&section.id))?.unwrap_or(0),
            page_id: parse_id(&section.page_id)?,
            component_version_id: parse_id(&section.component_version_id)?,
            name: section.name.clone(),
            props: Json(section.props.clone()),
            sort_order: section.order,
            parent_section_id: parse_optional_id(section.parent_section_id.as_deref())?,
            container_styles: object_or_empty(&section.container_styles),
            style_overrides: object_or_empty(&section.style_overrides),
            is_visible: section.is_visible,
            version: section.version.max(1),
            created_at: section.created_at.unwrap_or(now),
            updated_at: section.updated_at.unwrap_or(now),
        })
    }
}

// =============================================================================
// CONNECTION-LEVEL QUERIES
// =============================================================================

pub(crate) async fn find_section(conn: &mut PgConnection, id: i64) -> AppResult<Option<SectionRecord>> {
    let row = sqlx::query_as::<_, SectionRecord>(&format!(
        "SELECT {SECTION_COLUMNS} FROM page_sections WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Sections of a page in display order
pub(crate) async fn sections_for_page(conn: &mut PgConnection, page_id: i64) -> AppResult<Vec<SectionRecord>> {
    let rows = sqlx::query_as::<_, SectionRecord>(&format!(
        "SELECT {SECTION_COLUMNS} FROM page_sections
         WHERE page_id = $1
         ORDER BY sort_order ASC, id ASC"
    ))
    .bind(page_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Lock the page row for a structural edit. Returns false if the page
/// doesn't exist.
pub(crate) async fn lock_page(conn: &mut PgConnection, page_id: i64) -> AppResult<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM store_pages WHERE id = $1 FOR UPDATE")
        .bind(page_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

pub(crate) async fn insert_section(conn: &mut PgConnection, record: &SectionRecord) -> AppResult<SectionRecord> {
    let row = sqlx::query_as::<_, SectionRecord>(&format!(
        "INSERT INTO page_sections (page_id, component_version_id, name, props, sort_order,
                                    parent_section_id, container_styles, style_overrides,
                                    is_visible)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {SECTION_COLUMNS}"
    ))
    .bind(record.page_id)
    .bind(record.component_version_id)
    .bind(&record.name)
    .bind(&record.props)
    .bind(record.sort_order)
    .bind(record.parent_section_id)
    .bind(&record.container_styles)
    .bind(&record.style_overrides)
    .bind(record.is_visible)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Write name, props and visibility, bumping the row version.
///
/// With `expected_version`, the write only applies if the row is still at
/// that version; otherwise `Conflict` (or `NotFound` if the row is gone).
pub(crate) async fn update_section_content(
    conn: &mut PgConnection,
    id: i64,
    name: &str,
    props: &PropertyBag,
    is_visible: bool,
    expected_version: Option<i32>,
) -> AppResult<SectionRecord> {
    let row = sqlx::query_as::<_, SectionRecord>(&format!(
        "UPDATE page_sections
         SET name = $2, props = $3, is_visible = $4, version = version + 1, updated_at = NOW()
         WHERE id = $1 AND ($5::int IS NULL OR version = $5)
         RETURNING {SECTION_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(Json(props))
    .bind(is_visible)
    .bind(expected_version)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(row),
        None => match find_section(conn, id).await? {
            Some(current) => Err(AppError::Conflict(format!(
                "Section {id} was modified (version {} is newer than {})",
                current.version,
                expected_version.unwrap_or_default()
            ))),
            None => Err(AppError::NotFound(format!("Section not found: {id}"))),
        },
    }
}

/// Apply new positions; each changed row also gets a version bump.
pub(crate) async fn write_positions(conn: &mut PgConnection, assignments: &[(i64, i32)]) -> AppResult<()> {
    for (id, order) in assignments {
        sqlx::query(
            "UPDATE page_sections
             SET sort_order = $2, version = version + 1, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(order)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub(crate) async fn delete_section_row(conn: &mut PgConnection, id: i64) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM page_sections WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

// =============================================================================
// REPOSITORY
// =============================================================================
// Read-only access. Every write goes through the composition service so the
// order stays dense.
pub struct SectionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SectionRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<PageSection>> {
        let id = parse_id(id)?;
        let mut conn = self.pool.acquire().await?;
        Ok(find_section(&mut conn, id).await?.map(PageSection::from))
    }

    pub async fn list_by_page(&self, page_id: &str) -> AppResult<Vec<PageSection>> {
        let page_id = parse_id(page_id)?;
        let mut conn = self.pool.acquire().await?;
        Ok(sections_for_page(&mut conn, page_id)
            .await?
            .into_iter()
            .map(PageSection::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_preserves_fields() {
        let now = Utc::now();
        let section = PageSection {
            id: "21".into(),
            page_id: "11".into(),
            component_version_id: "9".into(),
            name: "Hero".into(),
            props: json!({"title": "Ana Başlık", "showButton": true})
                .as_object()
                .cloned()
                .unwrap(),
            order: 2,
            parent_section_id: Some("20".into()),
            container_styles: json!({"padding": "2rem"}),
            style_overrides: json!({}),
            is_visible: true,
            version: 3,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let back = PageSection::from(SectionRecord::from_domain(&section).unwrap());
        assert_eq!(back, section);
    }

    #[test]
    fn test_missing_version_reference_is_invalid() {
        let section = PageSection {
            page_id: "1".into(),
            component_version_id: "".into(),
            ..PageSection::default()
        };
        assert!(matches!(
            SectionRecord::from_domain(&section),
            Err(AppError::InvalidIdentifier(_))
        ));
    }
}
