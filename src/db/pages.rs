//! Store page repository.
//!
//! Setting `is_homepage` on a page clears it on the store's other pages in
//! the same transaction, so a store has at most one homepage.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use std::time::Instant;

use super::{observe, require};
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_optional_id};
use crate::models::{DeleteOutcome, StorePage};

pub(crate) const PAGE_COLUMNS: &str = "id, store_id, title, slug, meta_title, meta_description, \
     is_homepage, is_published, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PageRecord {
    pub id: i64,
    pub store_id: i64,
    pub title: String,
    pub slug: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_homepage: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PageRecord> for StorePage {
    fn from(row: PageRecord) -> Self {
        Self {
            id: format_id(row.id),
            store_id: format_id(row.store_id),
            title: row.title,
            slug: row.slug,
            meta_title: row.meta_title,
            meta_description: row.meta_description,
            is_homepage: row.is_homepage,
            is_published: row.is_published,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

impl PageRecord {
    pub fn from_domain(page: &StorePage) -> AppResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: parse_optional_id(Some(&page.id))?.unwrap_or(0),
            store_id: parse_id(&page.store_id)?,
            title: page.title.clone(),
            slug: normalize_slug(&page.slug),
            meta_title: page.meta_title.clone(),
            meta_description: page.meta_description.clone(),
            is_homepage: page.is_homepage,
            is_published: page.is_published,
            created_at: page.created_at.unwrap_or(now),
            updated_at: page.updated_at.unwrap_or(now),
        })
    }
}

/// Slugs are stored trimmed and without surrounding slashes, case kept
pub fn normalize_slug(slug: &str) -> String {
    slug.trim().trim_matches('/').trim().to_string()
}

/// Normalized slug, rejecting one that is empty once normalized ("/", " ")
pub fn checked_slug(slug: &str) -> AppResult<String> {
    let normalized = normalize_slug(slug);
    if normalized.is_empty() {
        return Err(AppError::ValidationFailure("slug is required".into()));
    }
    Ok(normalized)
}

// =============================================================================
// CONNECTION-LEVEL QUERIES
// =============================================================================
// Shared by the repository and by multi-step transactions (template
// application).

pub(crate) async fn insert_page(conn: &mut PgConnection, record: &PageRecord) -> AppResult<PageRecord> {
    if record.is_homepage {
        clear_homepage(conn, record.store_id, None).await?;
    }

    let row = sqlx::query_as::<_, PageRecord>(&format!(
        "INSERT INTO store_pages (store_id, title, slug, meta_title, meta_description,
                                  is_homepage, is_published)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {PAGE_COLUMNS}"
    ))
    .bind(record.store_id)
    .bind(&record.title)
    .bind(&record.slug)
    .bind(&record.meta_title)
    .bind(&record.meta_description)
    .bind(record.is_homepage)
    .bind(record.is_published)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

pub(crate) async fn find_page(conn: &mut PgConnection, id: i64) -> AppResult<Option<PageRecord>> {
    let row = sqlx::query_as::<_, PageRecord>(&format!(
        "SELECT {PAGE_COLUMNS} FROM store_pages WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(crate) async fn slug_exists(conn: &mut PgConnection, store_id: i64, slug: &str) -> AppResult<bool> {
    let exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM store_pages WHERE store_id = $1 AND slug = $2)",
    )
    .bind(store_id)
    .bind(slug)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists.0)
}

async fn clear_homepage(conn: &mut PgConnection, store_id: i64, except: Option<i64>) -> AppResult<()> {
    sqlx::query(
        "UPDATE store_pages SET is_homepage = FALSE, updated_at = NOW()
         WHERE store_id = $1 AND is_homepage AND ($2::bigint IS NULL OR id <> $2)",
    )
    .bind(store_id)
    .bind(except)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// The page as submitted, pinned to the store it already belongs to
fn with_store_of(page: &StorePage, existing: &PageRecord) -> StorePage {
    StorePage {
        store_id: format_id(existing.store_id),
        ..page.clone()
    }
}

// =============================================================================
// REPOSITORY
// =============================================================================
pub struct PageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PageRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<StorePage>> {
        let id = parse_id(id)?;
        let mut conn = self.pool.acquire().await?;
        Ok(find_page(&mut conn, id).await?.map(StorePage::from))
    }

    /// Pages of a store, homepage first, then by title
    pub async fn list_by_store(&self, store_id: &str) -> AppResult<Vec<StorePage>> {
        let store_id = parse_id(store_id)?;
        let started = Instant::now();
        let rows = sqlx::query_as::<_, PageRecord>(&format!(
            "SELECT {PAGE_COLUMNS} FROM store_pages
             WHERE store_id = $1
             ORDER BY is_homepage DESC, title ASC, id ASC"
        ))
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;
        observe("select", started);

        Ok(rows.into_iter().map(StorePage::from).collect())
    }

    pub async fn create(&self, page: &StorePage) -> AppResult<StorePage> {
        require("title", &page.title)?;
        checked_slug(&page.slug)?;
        let record = PageRecord::from_domain(&StorePage {
            id: String::new(),
            ..page.clone()
        })?;

        let mut tx = self.pool.begin().await?;
        let row = insert_page(&mut tx, &record).await?;
        tx.commit().await?;

        tracing::info!(page_id = row.id, store_id = row.store_id, slug = %row.slug, "Page created");
        Ok(row.into())
    }

    pub async fn update(&self, page: &StorePage) -> AppResult<StorePage> {
        require("title", &page.title)?;
        checked_slug(&page.slug)?;
        let id = parse_id(&page.id)?;

        let mut tx = self.pool.begin().await?;
        let existing = find_page(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Page not found: {id}")))?;
        let record = PageRecord::from_domain(&with_store_of(page, &existing))?;

        if record.is_homepage {
            clear_homepage(&mut tx, existing.store_id, Some(id)).await?;
        }

        // store_id is not editable: a page never moves between stores
        let row = sqlx::query_as::<_, PageRecord>(&format!(
            "UPDATE store_pages
             SET title = $2, slug = $3, meta_title = $4, meta_description = $5,
                 is_homepage = $6, is_published = $7, updated_at = NOW()
             WHERE id = $1
             RETURNING {PAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.meta_title)
        .bind(&record.meta_description)
        .bind(record.is_homepage)
        .bind(record.is_published)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row.into())
    }

    /// Delete a page together with all of its sections.
    pub async fn delete(&self, id: &str) -> AppResult<DeleteOutcome> {
        let id = parse_id(id)?;
        let mut tx = self.pool.begin().await?;

        let sections = sqlx::query("DELETE FROM page_sections WHERE page_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM store_pages WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let outcome = DeleteOutcome::from_rows_affected(result.rows_affected());
        tracing::info!(
            page_id = id,
            sections_removed = sections.rows_affected(),
            outcome = ?outcome,
            "Page deleted"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_fields() {
        let now = Utc::now();
        let page = StorePage {
            id: "11".into(),
            store_id: "4".into(),
            title: "Hakkımızda".into(),
            slug: "about".into(),
            meta_title: Some("About us".into()),
            meta_description: None,
            is_homepage: false,
            is_published: true,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let back = StorePage::from(PageRecord::from_domain(&page).unwrap());
        assert_eq!(back, page);
    }

    #[test]
    fn test_store_id_is_required() {
        let page = StorePage {
            title: "Home".into(),
            slug: "home".into(),
            ..StorePage::default()
        };
        assert!(matches!(
            PageRecord::from_domain(&page),
            Err(AppError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_normalize_slug() {
        assert_eq!(normalize_slug(" /About-Us/ "), "About-Us");
        assert_eq!(normalize_slug("home"), "home");
    }

    #[test]
    fn test_slug_keeps_case_through_mapping() {
        let page = StorePage {
            store_id: "4".into(),
            title: "About".into(),
            slug: "About".into(),
            ..StorePage::default()
        };
        let back = StorePage::from(PageRecord::from_domain(&page).unwrap());
        assert_eq!(back.slug, "About");
    }

    #[test]
    fn test_blank_slug_is_rejected() {
        assert!(matches!(checked_slug("/"), Err(AppError::ValidationFailure(_))));
        assert!(matches!(checked_slug("  "), Err(AppError::ValidationFailure(_))));
        assert_eq!(checked_slug("/about/").unwrap(), "about");
    }

    #[test]
    fn test_update_body_without_store_id_maps() {
        let existing = PageRecord::from_domain(&StorePage {
            id: "5".into(),
            store_id: "4".into(),
            title: "Home".into(),
            slug: "home".into(),
            ..StorePage::default()
        })
        .unwrap();
        let body = StorePage {
            id: "5".into(),
            title: "Ana Sayfa".into(),
            slug: "home".into(),
            ..StorePage::default()
        };

        let record = PageRecord::from_domain(&with_store_of(&body, &existing)).unwrap();
        assert_eq!(record.store_id, 4);
        assert_eq!(record.title, "Ana Sayfa");
    }
}
