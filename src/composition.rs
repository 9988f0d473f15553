// =============================================================================
// PAGE COMPOSITION SERVICE
// =============================================================================
// Assembles pages from their sections and performs structural edits.
//
// INVARIANT: after any add, delete or reorder, the sort_order values of a
// page's sections are exactly 1..N in display order. Every structural edit
// runs in one transaction holding a lock on the page row.
//
// Each public operation runs under the configured timeout and is retried
// only for transient dependency failures (see retry.rs).
// =============================================================================

use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::db::components::{
    find_component, find_component_by_name, find_components, find_versions, latest_version,
    ComponentRecord, VersionRecord,
};
use crate::db::pages::{find_page, insert_page, normalize_slug, slug_exists, PageRecord};
use crate::db::sections::{
    delete_section_row, find_section, insert_section, lock_page, sections_for_page,
    update_section_content, write_positions, SectionRecord,
};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_ids};
use crate::metrics;
use crate::models::{
    Component, ComponentVersion, ComposedPage, ComposedSection, DeleteOutcome, PageSection,
    PropertyBag, StorePage, TemplateApplication,
};
use crate::retry::RetryPolicy;
use crate::schema::{merge_property, FormField, PropertySchema, Widget};

/// Generated editor form for one section
#[derive(Debug, Clone, Serialize)]
pub struct SectionForm {
    pub section_id: String,
    pub component_version_id: String,
    /// True when the section's version no longer exists
    pub placeholder: bool,
    pub fields: Vec<FormField>,
}

#[derive(Clone)]
pub struct PageComposer {
    db: Database,
    policy: RetryPolicy,
}

impl PageComposer {
    pub fn new(db: Database, policy: RetryPolicy) -> Self {
        Self { db, policy }
    }

    // -------------------------------------------------------------------------
    // LOAD PAGE
    // -------------------------------------------------------------------------
    /// Page with its sections sorted by order, each resolved to its
    /// component and version. A missing version yields a placeholder
    /// section instead of failing the load.
    pub async fn load_page(&self, page_id: &str, include_hidden: bool) -> AppResult<Option<ComposedPage>> {
        let page_id = parse_id(page_id)?;
        self.policy
            .run("load_page", || self.load_page_once(page_id, include_hidden))
            .await
    }

    async fn load_page_once(&self, page_id: i64, include_hidden: bool) -> AppResult<Option<ComposedPage>> {
        let mut conn = self.db.pool().acquire().await?;

        let Some(page) = find_page(&mut conn, page_id).await? else {
            return Ok(None);
        };
        let sections = sections_for_page(&mut conn, page_id).await?;

        let version_ids: Vec<i64> = unique(sections.iter().map(|s| s.component_version_id));
        let versions = find_versions(&mut conn, &version_ids).await?;
        let component_ids: Vec<i64> = unique(versions.iter().map(|v| v.component_id));
        let components = find_components(&mut conn, &component_ids).await?;

        Ok(Some(compose(page, sections, versions, components, include_hidden)))
    }

    // -------------------------------------------------------------------------
    // REORDER
    // -------------------------------------------------------------------------
    /// Give the page's sections the positions 1..N in the order of
    /// `section_ids`, which must list every section of the page exactly once.
    ///
    /// All rows change or none do. On failure, callers should reload the
    /// page rather than keep an optimistic local order.
    pub async fn reorder(&self, page_id: &str, section_ids: &[String]) -> AppResult<Vec<PageSection>> {
        let page_id = parse_id(page_id)?;
        let requested = parse_ids(section_ids)?;
        self.policy
            .run("reorder", || self.reorder_once(page_id, &requested))
            .await
    }

    async fn reorder_once(&self, page_id: i64, requested: &[i64]) -> AppResult<Vec<PageSection>> {
        let mut tx = self.db.pool().begin().await?;
        if !lock_page(&mut tx, page_id).await? {
            return Err(AppError::NotFound(format!("Page not found: {page_id}")));
        }

        let current = sections_for_page(&mut tx, page_id).await?;
        let positions: Vec<(i64, i32)> = current.iter().map(|s| (s.id, s.sort_order)).collect();
        let changes = plan_reorder(&positions, requested)?;
        write_positions(&mut tx, &changes).await?;

        let updated = sections_for_page(&mut tx, page_id).await?;
        tx.commit().await?;

        metrics::record_reorder(changes.len());
        tracing::info!(page_id, sections = updated.len(), moved = changes.len(), "Sections reordered");
        Ok(updated.into_iter().map(PageSection::from).collect())
    }

    // -------------------------------------------------------------------------
    // ADD SECTION
    // -------------------------------------------------------------------------
    /// Append a section for the component's latest version, with properties
    /// seeded from the version schema's defaults.
    pub async fn add_section(
        &self,
        page_id: &str,
        component_id: &str,
        name: Option<&str>,
    ) -> AppResult<PageSection> {
        let page_id = parse_id(page_id)?;
        let component_id = parse_id(component_id)?;
        self.policy
            .run("add_section", || self.add_section_once(page_id, component_id, name))
            .await
    }

    async fn add_section_once(&self, page_id: i64, component_id: i64, name: Option<&str>) -> AppResult<PageSection> {
        let mut tx = self.db.pool().begin().await?;
        if !lock_page(&mut tx, page_id).await? {
            return Err(AppError::NotFound(format!("Page not found: {page_id}")));
        }

        let component = find_component(&mut tx, component_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Component not found: {component_id}")))?;
        let version = latest_version(&mut tx, component_id)
            .await?
            .ok_or_else(|| AppError::NoVersionAvailable(format_id(component_id)))?;

        let existing = sections_for_page(&mut tx, page_id).await?;
        let record = new_section_record(
            page_id,
            &component,
            &version,
            name,
            next_order(existing.len()),
        )?;
        let row = insert_section(&mut tx, &record).await?;
        tx.commit().await?;

        tracing::info!(
            page_id,
            section_id = row.id,
            component = %component.name,
            version = %version.version,
            order = row.sort_order,
            "Section added"
        );
        Ok(row.into())
    }

    // -------------------------------------------------------------------------
    // UPDATE SECTION PROPERTIES
    // -------------------------------------------------------------------------
    /// Replace a section's name and/or property bag after validating the bag
    /// against the version schema.
    pub async fn update_section_properties(
        &self,
        section_id: &str,
        name: Option<&str>,
        props: Option<&PropertyBag>,
        expected_version: Option<i32>,
    ) -> AppResult<PageSection> {
        let section_id = parse_id(section_id)?;
        self.policy
            .run("update_section_properties", || {
                self.update_properties_once(section_id, name, props, expected_version)
            })
            .await
    }

    async fn update_properties_once(
        &self,
        section_id: i64,
        name: Option<&str>,
        props: Option<&PropertyBag>,
        expected_version: Option<i32>,
    ) -> AppResult<PageSection> {
        let mut conn = self.db.pool().acquire().await?;
        let current = find_section(&mut conn, section_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Section not found: {section_id}")))?;

        let props = props.cloned().unwrap_or_else(|| current.props.0.clone());
        if let Some(schema) = section_schema(&mut conn, &current).await? {
            schema.validate(&props)?;
        }

        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(&current.name);
        let row = update_section_content(
            &mut conn,
            section_id,
            name,
            &props,
            current.is_visible,
            expected_version,
        )
        .await?;

        tracing::info!(section_id, version = row.version, "Section properties updated");
        Ok(row.into())
    }

    /// Edit one property through its widget, leaving the others untouched.
    pub async fn edit_property(
        &self,
        section_id: &str,
        key: &str,
        input: Value,
        expected_version: Option<i32>,
    ) -> AppResult<PageSection> {
        let section_id = parse_id(section_id)?;
        self.policy
            .run("edit_property", || {
                self.edit_property_once(section_id, key, input.clone(), expected_version)
            })
            .await
    }

    async fn edit_property_once(
        &self,
        section_id: i64,
        key: &str,
        input: Value,
        expected_version: Option<i32>,
    ) -> AppResult<PageSection> {
        let mut conn = self.db.pool().acquire().await?;
        let current = find_section(&mut conn, section_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Section not found: {section_id}")))?;

        let schema = section_schema(&mut conn, &current).await?;
        let value = match schema.as_ref().and_then(|s| s.properties.get(key)) {
            Some(prop) => Widget::for_property(prop).coerce_input(input),
            None => Widget::Raw.coerce_input(input),
        };

        let merged = merge_property(&current.props.0, key, value);
        if let Some(schema) = &schema {
            schema.validate(&merged)?;
        }

        let row = update_section_content(
            &mut conn,
            section_id,
            &current.name,
            &merged,
            current.is_visible,
            expected_version.or(Some(current.version)),
        )
        .await?;

        tracing::debug!(section_id, key, version = row.version, "Section property edited");
        Ok(row.into())
    }

    /// Editor form for a section, `None` if the section doesn't exist.
    pub async fn section_form(&self, section_id: &str) -> AppResult<Option<SectionForm>> {
        let section_id = parse_id(section_id)?;
        self.policy
            .run("section_form", || self.section_form_once(section_id))
            .await
    }

    async fn section_form_once(&self, section_id: i64) -> AppResult<Option<SectionForm>> {
        let mut conn = self.db.pool().acquire().await?;
        let Some(section) = find_section(&mut conn, section_id).await? else {
            return Ok(None);
        };

        let schema = section_schema(&mut conn, &section).await?;
        Ok(Some(SectionForm {
            section_id: format_id(section.id),
            component_version_id: format_id(section.component_version_id),
            placeholder: schema.is_none(),
            fields: schema.map(|s| s.form(&section.props.0)).unwrap_or_default(),
        }))
    }

    // -------------------------------------------------------------------------
    // VISIBILITY
    // -------------------------------------------------------------------------
    pub async fn toggle_visibility(&self, section_id: &str, expected_version: Option<i32>) -> AppResult<PageSection> {
        let section_id = parse_id(section_id)?;
        self.policy
            .run("toggle_visibility", || self.toggle_visibility_once(section_id, expected_version))
            .await
    }

    async fn toggle_visibility_once(&self, section_id: i64, expected_version: Option<i32>) -> AppResult<PageSection> {
        let mut conn = self.db.pool().acquire().await?;
        let current = find_section(&mut conn, section_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Section not found: {section_id}")))?;

        // Pin the version we read so a concurrent toggle isn't silently undone
        let row = update_section_content(
            &mut conn,
            section_id,
            &current.name,
            &current.props.0,
            !current.is_visible,
            expected_version.or(Some(current.version)),
        )
        .await?;

        tracing::info!(section_id, visible = row.is_visible, "Section visibility toggled");
        Ok(row.into())
    }

    // -------------------------------------------------------------------------
    // DELETE SECTION
    // -------------------------------------------------------------------------
    /// Remove a section and renumber the remaining ones to 1..N.
    pub async fn delete_section(&self, section_id: &str) -> AppResult<DeleteOutcome> {
        let section_id = parse_id(section_id)?;
        self.policy
            .run("delete_section", || self.delete_section_once(section_id))
            .await
    }

    async fn delete_section_once(&self, section_id: i64) -> AppResult<DeleteOutcome> {
        let mut tx = self.db.pool().begin().await?;
        let Some(section) = find_section(&mut tx, section_id).await? else {
            return Ok(DeleteOutcome::AlreadyAbsent);
        };
        lock_page(&mut tx, section.page_id).await?;

        let removed = delete_section_row(&mut tx, section_id).await?;
        let remaining = sections_for_page(&mut tx, section.page_id).await?;
        let positions: Vec<(i64, i32)> = remaining.iter().map(|s| (s.id, s.sort_order)).collect();
        write_positions(&mut tx, &plan_renumber(&positions)).await?;
        tx.commit().await?;

        tracing::info!(section_id, page_id = section.page_id, remaining = remaining.len(), "Section deleted");
        Ok(DeleteOutcome::from_rows_affected(removed))
    }

    // -------------------------------------------------------------------------
    // TEMPLATE APPLICATION
    // -------------------------------------------------------------------------
    /// Create the template's default pages on a store, skipping slugs the
    /// store already has, and record the template on the store.
    pub async fn apply_template(&self, store_id: &str, template_id: &str) -> AppResult<TemplateApplication> {
        let store_id = parse_id(store_id)?;
        let template_id = parse_id(template_id)?;
        self.policy
            .run("apply_template", || self.apply_template_once(store_id, template_id))
            .await
    }

    async fn apply_template_once(&self, store_id: i64, template_id: i64) -> AppResult<TemplateApplication> {
        let template = self
            .db
            .templates()
            .get_by_id(&format_id(template_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Store template not found: {template_id}")))?;

        let mut tx = self.db.pool().begin().await?;
        let store: Option<(i64,)> = sqlx::query_as("SELECT id FROM stores WHERE id = $1 FOR UPDATE")
            .bind(store_id)
            .fetch_optional(&mut *tx)
            .await?;
        if store.is_none() {
            return Err(AppError::NotFound(format!("Store not found: {store_id}")));
        }

        let mut application = TemplateApplication {
            store_id: format_id(store_id),
            template_id: format_id(template_id),
            ..TemplateApplication::default()
        };
        let mut resolved: HashMap<String, Option<(ComponentRecord, VersionRecord)>> = HashMap::new();

        for template_page in &template.default_pages {
            let slug = normalize_slug(&template_page.slug);
            if slug.is_empty() || slug_exists(&mut tx, store_id, &slug).await? {
                application.skipped_pages.push(slug);
                continue;
            }

            let page = insert_page(
                &mut tx,
                &PageRecord::from_domain(&StorePage {
                    store_id: format_id(store_id),
                    title: template_page.title.clone(),
                    slug,
                    is_homepage: template_page.is_homepage,
                    ..StorePage::default()
                })?,
            )
            .await?;

            let mut order = 0;
            for component_name in &template_page.components {
                let key = component_name.trim().to_lowercase();
                if !resolved.contains_key(&key) {
                    let found = match find_component_by_name(&mut tx, component_name).await? {
                        Some(component) => latest_version(&mut tx, component.id)
                            .await?
                            .map(|version| (component, version)),
                        None => None,
                    };
                    resolved.insert(key.clone(), found);
                }

                match resolved.get(&key).and_then(Option::as_ref) {
                    Some((component, version)) => {
                        order += 1;
                        let record = new_section_record(page.id, component, version, None, order)?;
                        insert_section(&mut tx, &record).await?;
                    }
                    None => {
                        if !application.missing_components.contains(component_name) {
                            application.missing_components.push(component_name.clone());
                        }
                    }
                }
            }

            application.created_pages.push(page.into());
        }

        sqlx::query("UPDATE stores SET template_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(store_id)
            .bind(template_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            store_id,
            template_id,
            created = application.created_pages.len(),
            skipped = application.skipped_pages.len(),
            missing_components = application.missing_components.len(),
            "Template applied"
        );
        Ok(application)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Parsed schema of the section's version, `None` if the version is gone.
async fn section_schema(
    conn: &mut sqlx::PgConnection,
    section: &SectionRecord,
) -> AppResult<Option<PropertySchema>> {
    let versions = find_versions(conn, &[section.component_version_id]).await?;
    match versions.into_iter().next() {
        Some(version) => PropertySchema::from_value(&version.schema)
            .map(Some)
            .map_err(|reason| AppError::ValidationFailure(format!("invalid stored schema: {reason}"))),
        None => {
            tracing::warn!(
                section_id = section.id,
                version_id = section.component_version_id,
                "Section references a missing component version"
            );
            Ok(None)
        }
    }
}

fn new_section_record(
    page_id: i64,
    component: &ComponentRecord,
    version: &VersionRecord,
    name: Option<&str>,
    order: i32,
) -> AppResult<SectionRecord> {
    let schema = PropertySchema::from_value(&version.schema)
        .map_err(|reason| AppError::ValidationFailure(format!("invalid stored schema: {reason}")))?;
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&component.name);

    SectionRecord::from_domain(&PageSection {
        page_id: format_id(page_id),
        component_version_id: format_id(version.id),
        name: name.to_string(),
        props: schema.seed_defaults(),
        order,
        is_visible: true,
        ..PageSection::default()
    })
}

fn unique(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

/// Position of a section appended to a page with `existing` sections
pub fn next_order(existing: usize) -> i32 {
    existing as i32 + 1
}

/// Assign positions 1..N following `requested`, returning only the rows
/// whose position changes.
///
/// `current` holds (section id, current position). `requested` must contain
/// every section id exactly once.
pub fn plan_reorder(current: &[(i64, i32)], requested: &[i64]) -> AppResult<Vec<(i64, i32)>> {
    let existing: HashMap<i64, i32> = current.iter().copied().collect();

    let mut seen = HashSet::new();
    for id in requested {
        if !existing.contains_key(id) {
            return Err(AppError::BadRequest(format!("Section {id} does not belong to this page")));
        }
        if !seen.insert(*id) {
            return Err(AppError::BadRequest(format!("Section {id} listed more than once")));
        }
    }
    if requested.len() != existing.len() {
        return Err(AppError::BadRequest(format!(
            "Expected all {} sections of the page, got {}",
            existing.len(),
            requested.len()
        )));
    }

    Ok(requested
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as i32 + 1))
        .filter(|(id, order)| existing.get(id) != Some(order))
        .collect())
}

/// Compact positions of sections already in display order to 1..N.
pub fn plan_renumber(current: &[(i64, i32)]) -> Vec<(i64, i32)> {
    current
        .iter()
        .enumerate()
        .map(|(index, (id, order))| (*id, *order, index as i32 + 1))
        .filter(|(_, old, new)| old != new)
        .map(|(id, _, new)| (id, new))
        .collect()
}

/// Resolve sections against their versions and components.
fn compose(
    page: PageRecord,
    mut sections: Vec<SectionRecord>,
    versions: Vec<VersionRecord>,
    components: Vec<ComponentRecord>,
    include_hidden: bool,
) -> ComposedPage {
    let versions: HashMap<i64, VersionRecord> = versions.into_iter().map(|v| (v.id, v)).collect();
    let components: HashMap<i64, ComponentRecord> = components.into_iter().map(|c| (c.id, c)).collect();

    sections.sort_by_key(|s| (s.sort_order, s.id));

    let sections = sections
        .into_iter()
        .filter(|s| include_hidden || s.is_visible)
        .map(|section| {
            let version = versions.get(&section.component_version_id).cloned();
            let component = version
                .as_ref()
                .and_then(|v| components.get(&v.component_id))
                .cloned();
            ComposedSection {
                placeholder: version.is_none(),
                section: section.into(),
                component: component.map(Component::from),
                version: version.map(ComponentVersion::from),
            }
        })
        .collect();

    ComposedPage {
        page: page.into(),
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use sqlx::types::Json;

    fn section(id: i64, order: i32, version_id: i64, visible: bool) -> SectionRecord {
        let now = Utc::now();
        SectionRecord {
            id,
            page_id: 1,
            component_version_id: version_id,
            name: format!("Section {id}"),
            props: Json(PropertyBag::new()),
            sort_order: order,
            parent_section_id: None,
            container_styles: json!({}),
            style_overrides: json!({}),
            is_visible: visible,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn page() -> PageRecord {
        let now = Utc::now();
        PageRecord {
            id: 1,
            store_id: 1,
            title: "Home".into(),
            slug: "home".into(),
            meta_title: None,
            meta_description: None,
            is_homepage: true,
            is_published: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn version(id: i64, component_id: i64) -> VersionRecord {
        VersionRecord {
            id,
            component_id,
            version: "1.0.0".into(),
            template_code: "<div></div>".into(),
            schema: json!({"title": {"type": "string", "default": "Ana Başlık"}}),
            preview_image: None,
            is_active: true,
            is_latest: true,
            created_at: Utc::now(),
        }
    }

    fn component(id: i64, name: &str) -> ComponentRecord {
        let now = Utc::now();
        ComponentRecord {
            id,
            name: name.into(),
            description: None,
            category: None,
            tags: vec![],
            is_global: false,
            is_active: true,
            default_props: json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a plan to `current` and return the resulting positions by id
    fn apply(current: &[(i64, i32)], plan: &[(i64, i32)]) -> HashMap<i64, i32> {
        let mut positions: HashMap<i64, i32> = current.iter().copied().collect();
        positions.extend(plan.iter().copied());
        positions
    }

    #[test]
    fn test_reorder_yields_dense_sequence_for_every_permutation() {
        let current = [(10, 1), (20, 2), (30, 3), (40, 4)];
        let ids = [10, 20, 30, 40];

        // All 24 permutations of four sections
        let mut permutations = vec![vec![]];
        for _ in 0..ids.len() {
            permutations = permutations
                .into_iter()
                .flat_map(|prefix: Vec<i64>| {
                    ids.iter()
                        .filter(|id| !prefix.contains(id))
                        .map(|id| {
                            let mut next = prefix.clone();
                            next.push(*id);
                            next
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
        }
        assert_eq!(permutations.len(), 24);

        for requested in permutations {
            let plan = plan_reorder(&current, &requested).unwrap();
            let result = apply(&current, &plan);

            let mut orders: Vec<i32> = result.values().copied().collect();
            orders.sort();
            assert_eq!(orders, vec![1, 2, 3, 4]);

            for (index, id) in requested.iter().enumerate() {
                assert_eq!(result[id], index as i32 + 1);
            }
        }
    }

    #[test]
    fn test_reorder_swap_touches_only_moved_rows() {
        let current = [(1, 1), (2, 2), (3, 3)];
        let plan = plan_reorder(&current, &[1, 3, 2]).unwrap();
        assert_eq!(plan, vec![(3, 2), (2, 3)]);
    }

    #[test]
    fn test_reorder_repairs_gaps() {
        let current = [(1, 2), (2, 5), (3, 9)];
        let plan = plan_reorder(&current, &[1, 2, 3]).unwrap();
        assert_eq!(plan, vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_reorder_rejects_non_permutations() {
        let current = [(1, 1), (2, 2), (3, 3)];
        assert!(matches!(plan_reorder(&current, &[1, 2]), Err(AppError::BadRequest(_))));
        assert!(matches!(plan_reorder(&current, &[1, 2, 2]), Err(AppError::BadRequest(_))));
        assert!(matches!(plan_reorder(&current, &[1, 2, 4]), Err(AppError::BadRequest(_))));
        assert!(plan_reorder(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_renumber_after_delete() {
        // Section at position 2 was removed
        let remaining = [(1, 1), (3, 3), (4, 4)];
        assert_eq!(plan_renumber(&remaining), vec![(3, 2), (4, 3)]);
        assert!(plan_renumber(&[(1, 1), (2, 2)]).is_empty());
    }

    #[test]
    fn test_next_order() {
        assert_eq!(next_order(0), 1);
        assert_eq!(next_order(3), 4);
    }

    #[test]
    fn test_compose_sorts_and_tolerates_missing_versions() {
        let sections = vec![section(3, 3, 99, true), section(1, 1, 7, true), section(2, 2, 7, false)];
        let composed = compose(page(), sections, vec![version(7, 5)], vec![component(5, "Hero")], true);

        let ids: Vec<&str> = composed.sections.iter().map(|s| s.section.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        assert!(!composed.sections[0].placeholder);
        assert_eq!(composed.sections[0].component.as_ref().unwrap().name, "Hero");
        assert!(composed.sections[2].placeholder);
        assert!(composed.sections[2].component.is_none());
    }

    #[test]
    fn test_compose_filters_hidden_sections() {
        let sections = vec![section(1, 1, 7, true), section(2, 2, 7, false)];
        let composed = compose(page(), sections, vec![version(7, 5)], vec![component(5, "Hero")], false);
        assert_eq!(composed.sections.len(), 1);
        assert_eq!(composed.sections[0].section.id, "1");
    }

    #[test]
    fn test_new_section_seeds_schema_defaults() {
        let record = new_section_record(1, &component(5, "Hero"), &version(7, 5), None, 4).unwrap();
        assert_eq!(record.name, "Hero");
        assert_eq!(record.sort_order, 4);
        assert_eq!(record.component_version_id, 7);
        assert_eq!(record.props.0.len(), 1);
        assert_eq!(record.props.0["title"], json!("Ana Başlık"));

        let named = new_section_record(1, &component(5, "Hero"), &version(7, 5), Some("Kampanya"), 1).unwrap();
        assert_eq!(named.name, "Kampanya");
    }
}
