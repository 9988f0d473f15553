//! Page-builder model: components, their versions, and page sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::store::StorePage;

/// Property bag of a section: key -> value, shaped by the version schema
pub type PropertyBag = Map<String, Value>;

// =============================================================================
// COMPONENT
// =============================================================================
/// A reusable page-building block ("Hero", "Navbar", "Footer", ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_global: bool,
    #[serde(default = "super::default_true")]
    pub is_active: bool,
    pub default_props: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// COMPONENT VERSION
// =============================================================================
/// Immutable template + schema snapshot of a component.
///
/// `is_latest` marks the version new sections resolve to; creating a version
/// moves the flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentVersion {
    pub id: String,
    pub component_id: String,
    /// Semantic version string, e.g. "1.2.0"
    pub version: String,
    /// HTML/templating markup, optionally with style and script blocks
    pub template_code: String,
    /// JSON Schema of the editable properties
    pub schema: Value,
    pub preview_image: Option<String>,
    #[serde(default = "super::default_true")]
    pub is_active: bool,
    pub is_latest: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Create a component together with its first version
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComponentRequest {
    pub component: Component,
    pub first_version: Option<ComponentVersion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentWithVersion {
    pub component: Component,
    pub version: Option<ComponentVersion>,
}

// =============================================================================
// PAGE SECTION
// =============================================================================
/// Placement of one component version on one page.
///
/// `order` is dense and 1-based within a page. `version` is the row version
/// used to reject stale writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSection {
    pub id: String,
    pub page_id: String,
    pub component_version_id: String,
    pub name: String,
    pub props: PropertyBag,
    pub order: i32,
    pub parent_section_id: Option<String>,
    pub container_styles: Value,
    pub style_overrides: Value,
    pub is_visible: bool,
    pub version: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// -----------------------------------------------------------------------------
// COMPOSED PAGE
// -----------------------------------------------------------------------------
/// A page with its sections sorted by order, each resolved to its component
/// and version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposedPage {
    pub page: StorePage,
    pub sections: Vec<ComposedSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposedSection {
    pub section: PageSection,
    pub component: Option<Component>,
    pub version: Option<ComponentVersion>,
    /// True when the referenced version no longer exists
    pub placeholder: bool,
}

// -----------------------------------------------------------------------------
// SECTION REQUESTS
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderSectionsRequest {
    /// Every section id of the page, in the desired display order
    pub section_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddSectionRequest {
    pub component_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSectionRequest {
    pub name: Option<String>,
    pub props: Option<PropertyBag>,
    /// Row version the client last saw; stale writes are rejected
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToggleVisibilityRequest {
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditPropertyRequest {
    /// Raw value as entered in the editor
    pub value: Value,
    pub expected_version: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_omitted_activation_flags_default_to_active() {
        let request: CreateComponentRequest = serde_json::from_value(json!({
            "component": { "name": "Hero", "category": "hero" },
            "first_version": {
                "version": "1.0.0",
                "template_code": "<section>...</section>",
                "schema": {}
            }
        }))
        .unwrap();

        assert!(request.component.is_active);
        assert!(request.first_version.unwrap().is_active);

        let version: ComponentVersion =
            serde_json::from_value(json!({ "version": "1.1.0", "is_active": false })).unwrap();
        assert!(!version.is_active);
    }
}
