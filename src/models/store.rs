//! Stores, store templates and store pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// STORE
// =============================================================================
/// An owner's shop. One store has many pages, at most one of which is the
/// homepage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    /// Assigned by storage; ignored on create
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub favicon: Option<String>,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
    pub template_id: Option<String>,
    /// Free-form theme customization (colors, fonts, ...)
    pub customization: Value,
    pub settings: Value,
    #[serde(default = "super::default_true")]
    pub is_active: bool,
    pub is_published: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// STORE TEMPLATE
// =============================================================================
/// Preset defining a starter set of pages and components for a new store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreTemplate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(rename = "type")]
    pub template_type: String,
    pub default_pages: Vec<TemplatePage>,
    /// Names of the components this template relies on
    pub components: Vec<String>,
    #[serde(default = "super::default_true")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One page a template creates when applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatePage {
    pub title: String,
    pub slug: String,
    pub is_homepage: bool,
    /// Component names, in section order
    pub components: Vec<String>,
}

/// Result of applying a template to a store
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateApplication {
    pub store_id: String,
    pub template_id: String,
    pub created_pages: Vec<StorePage>,
    /// Slugs that already existed on the store
    pub skipped_pages: Vec<String>,
    /// Component names that did not resolve to a versioned component
    pub missing_components: Vec<String>,
}

// =============================================================================
// STORE PAGE
// =============================================================================
/// A single page of a store. The slug is unique within the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorePage {
    pub id: String,
    pub store_id: String,
    pub title: String,
    pub slug: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_homepage: bool,
    pub is_published: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
