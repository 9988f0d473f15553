// =============================================================================
// SAMPLE DATA
// =============================================================================
// Example components and a starter template so a fresh installation has
// something to build pages from. Every item is skipped if it already exists,
// so seeding on each start-up is harmless.
// =============================================================================

use serde_json::{json, Value};

use crate::db::Database;
use crate::error::AppResult;
use crate::models::{Component, ComponentVersion, StoreTemplate, TemplatePage};

pub const STARTER_TEMPLATE: &str = "Starter";

struct SampleComponent {
    name: &'static str,
    category: &'static str,
    description: &'static str,
    template_code: &'static str,
    schema: fn() -> Value,
}

const SAMPLE_COMPONENTS: [SampleComponent; 3] = [
    SampleComponent {
        name: "Navbar",
        category: "navigation",
        description: "Top navigation bar with brand name and links",
        template_code: "<nav style=\"background:{{backgroundColor}}\"><a href=\"/\">{{brandName}}</a></nav>",
        schema: navbar_schema,
    },
    SampleComponent {
        name: "Hero",
        category: "content",
        description: "Full-width banner with title, subtitle and call to action",
        template_code: "<section class=\"hero hero--{{alignment}}\"><h1>{{title}}</h1><p>{{subtitle}}</p></section>",
        schema: hero_schema,
    },
    SampleComponent {
        name: "Footer",
        category: "navigation",
        description: "Page footer with copyright line",
        template_code: "<footer style=\"color:{{textColor}}\">{{copyright}}</footer>",
        schema: footer_schema,
    },
];

fn navbar_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "brandName": {"type": "string", "title": "Marka Adı", "default": "Mağazam"},
            "backgroundColor": {"type": "string", "format": "color", "title": "Arka Plan", "default": "#ffffff"},
            "links": {"type": "array", "title": "Bağlantılar", "default": []},
            "sticky": {"type": "boolean", "title": "Sabit", "default": true}
        },
        "required": ["brandName"]
    })
}

fn hero_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string", "title": "Başlık", "default": "Ana Başlık", "maxLength": 80},
            "subtitle": {"type": "string", "title": "Alt Başlık", "maxLength": 300},
            "backgroundImage": {"type": "string", "format": "image", "title": "Arka Plan Görseli"},
            "buttonText": {"type": "string", "title": "Buton Metni", "default": "Alışverişe Başla"},
            "buttonUrl": {"type": "string", "format": "url", "title": "Buton Bağlantısı", "default": "/products"},
            "showButton": {"type": "boolean", "title": "Butonu Göster", "default": true},
            "alignment": {"type": "string", "title": "Hizalama", "enum": ["left", "center", "right"], "default": "center"}
        },
        "required": ["title"]
    })
}

fn footer_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "copyright": {"type": "string", "title": "Telif Metni", "default": "© Mağazam"},
            "textColor": {"type": "string", "format": "color", "title": "Yazı Rengi", "default": "#333333"},
            "columns": {"type": "integer", "title": "Sütun Sayısı", "minimum": 1, "maximum": 4, "default": 3}
        }
    })
}

fn starter_template() -> StoreTemplate {
    StoreTemplate {
        name: STARTER_TEMPLATE.to_string(),
        description: Some("Home and about pages with navigation and footer".into()),
        template_type: "default".into(),
        default_pages: vec![
            TemplatePage {
                title: "Ana Sayfa".into(),
                slug: "home".into(),
                is_homepage: true,
                components: vec!["Navbar".into(), "Hero".into(), "Footer".into()],
            },
            TemplatePage {
                title: "Hakkımızda".into(),
                slug: "about".into(),
                is_homepage: false,
                components: vec!["Navbar".into(), "Footer".into()],
            },
        ],
        components: SAMPLE_COMPONENTS.iter().map(|c| c.name.to_string()).collect(),
        is_active: true,
        ..StoreTemplate::default()
    }
}

/// Insert whatever sample data is missing. Returns the number of items created.
pub async fn seed_sample_data(db: &Database) -> AppResult<usize> {
    let mut created = 0;

    for sample in &SAMPLE_COMPONENTS {
        if db.components().get_by_name(sample.name).await?.is_some() {
            tracing::debug!(component = sample.name, "Sample component exists, skipping");
            continue;
        }

        let component = Component {
            name: sample.name.to_string(),
            description: Some(sample.description.to_string()),
            category: Some(sample.category.to_string()),
            is_global: true,
            is_active: true,
            ..Component::default()
        };
        let version = ComponentVersion {
            version: "1.0.0".into(),
            template_code: sample.template_code.to_string(),
            schema: (sample.schema)(),
            is_active: true,
            ..ComponentVersion::default()
        };
        db.components().create(&component, Some(&version)).await?;
        created += 1;
    }

    if db.templates().get_by_name(STARTER_TEMPLATE).await?.is_none() {
        db.templates().create(&starter_template()).await?;
        created += 1;
    }

    tracing::info!(created, "Sample data seeded");
    Ok(created)
}
