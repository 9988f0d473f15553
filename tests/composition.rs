// =============================================================================
// COMPOSITION INTEGRATION TESTS
// =============================================================================
// Run against a real PostgreSQL when DATABASE_URL is set; each test returns
// early otherwise. Every test creates its own store so they can share one
// database.
// =============================================================================

use serde_json::json;
use sqlx::postgres::PgPoolOptions;

use store_builder_service::composition::PageComposer;
use store_builder_service::db::Database;
use store_builder_service::error::AppError;
use store_builder_service::models::{
    Component, ComponentVersion, CreateComponentRequest, DeleteOutcome, Store, StorePage, StoreTemplate,
    TemplatePage,
};
use store_builder_service::retry::RetryPolicy;

async fn database() -> Option<Database> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    let db = Database::from_pool(pool);
    db.run_migrations().await.expect("run migrations");
    Some(db)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

async fn store_fixture(db: &Database) -> Store {
    db.stores()
        .create(&Store {
            user_id: "tester".into(),
            name: unique("store"),
            is_active: true,
            ..Store::default()
        })
        .await
        .expect("create store")
}

async fn page_fixture(db: &Database) -> StorePage {
    let store = store_fixture(db).await;

    db.pages()
        .create(&StorePage {
            store_id: store.id,
            title: "Home".into(),
            slug: "home".into(),
            is_homepage: true,
            ..StorePage::default()
        })
        .await
        .expect("create page")
}

async fn versioned_component(db: &Database) -> Component {
    let created = db
        .components()
        .create(
            &Component {
                name: unique("Hero"),
                is_active: true,
                ..Component::default()
            },
            Some(&ComponentVersion {
                version: "1.0.0".into(),
                template_code: "<section>{{title}}</section>".into(),
                schema: json!({
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "default": "Welcome" }
                    }
                }),
                is_active: true,
                ..ComponentVersion::default()
            }),
        )
        .await
        .expect("create component");
    created.component
}

fn composer(db: &Database) -> PageComposer {
    PageComposer::new(db.clone(), RetryPolicy::default())
}

#[tokio::test]
async fn test_add_section_without_version_leaves_no_row() {
    let Some(db) = database().await else { return };
    let page = page_fixture(&db).await;
    let bare = db
        .components()
        .create(
            &Component {
                name: unique("Bare"),
                is_active: true,
                ..Component::default()
            },
            None,
        )
        .await
        .expect("create component");

    let err = composer(&db)
        .add_section(&page.id, &bare.component.id, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NoVersionAvailable(_)));
    assert!(db.sections().list_by_page(&page.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_section_seeds_defaults_and_appends() {
    let Some(db) = database().await else { return };
    let page = page_fixture(&db).await;
    let component = versioned_component(&db).await;
    let composer = composer(&db);

    let first = composer.add_section(&page.id, &component.id, None).await.unwrap();
    let second = composer.add_section(&page.id, &component.id, Some("Second")).await.unwrap();

    assert_eq!(first.order, 1);
    assert_eq!(second.order, 2);
    assert_eq!(second.name, "Second");
    assert_eq!(first.props["title"], json!("Welcome"));
}

#[tokio::test]
async fn test_reorder_keeps_positions_dense() {
    let Some(db) = database().await else { return };
    let page = page_fixture(&db).await;
    let component = versioned_component(&db).await;
    let composer = composer(&db);

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(composer.add_section(&page.id, &component.id, None).await.unwrap().id);
    }

    let requested = vec![ids[2].clone(), ids[0].clone(), ids[1].clone()];
    let reordered = composer.reorder(&page.id, &requested).await.unwrap();

    let got: Vec<(String, i32)> = reordered.iter().map(|s| (s.id.clone(), s.order)).collect();
    assert_eq!(
        got,
        vec![(ids[2].clone(), 1), (ids[0].clone(), 2), (ids[1].clone(), 3)]
    );

    // Missing one section: rejected, nothing changes
    let err = composer.reorder(&page.id, &ids[..2]).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let after = db.sections().list_by_page(&page.id).await.unwrap();
    assert_eq!(after[0].id, ids[2]);
}

#[tokio::test]
async fn test_delete_section_renumbers_remaining() {
    let Some(db) = database().await else { return };
    let page = page_fixture(&db).await;
    let component = versioned_component(&db).await;
    let composer = composer(&db);

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(composer.add_section(&page.id, &component.id, None).await.unwrap().id);
    }

    assert_eq!(composer.delete_section(&ids[0]).await.unwrap(), DeleteOutcome::Deleted);
    assert_eq!(
        composer.delete_section(&ids[0]).await.unwrap(),
        DeleteOutcome::AlreadyAbsent
    );

    let remaining = db.sections().list_by_page(&page.id).await.unwrap();
    let orders: Vec<i32> = remaining.iter().map(|s| s.order).collect();
    assert_eq!(orders, vec![1, 2]);
    assert_eq!(remaining[0].id, ids[1]);
}

#[tokio::test]
async fn test_stale_write_is_rejected() {
    let Some(db) = database().await else { return };
    let page = page_fixture(&db).await;
    let component = versioned_component(&db).await;
    let composer = composer(&db);

    let section = composer.add_section(&page.id, &component.id, None).await.unwrap();
    let toggled = composer
        .toggle_visibility(&section.id, Some(section.version))
        .await
        .unwrap();
    assert!(!toggled.is_visible);

    let err = composer
        .toggle_visibility(&section.id, Some(section.version))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_page_delete_cascades_to_sections() {
    let Some(db) = database().await else { return };
    let page = page_fixture(&db).await;
    let component = versioned_component(&db).await;
    let section = composer(&db)
        .add_section(&page.id, &component.id, None)
        .await
        .unwrap();

    assert_eq!(db.pages().delete(&page.id).await.unwrap(), DeleteOutcome::Deleted);
    assert!(db.sections().get_by_id(&section.id).await.unwrap().is_none());
    assert!(composer(&db).load_page(&page.id, true).await.unwrap().is_none());
}

#[tokio::test]
async fn test_component_created_from_documented_body_is_placeable() {
    let Some(db) = database().await else { return };
    let page = page_fixture(&db).await;

    // Body as documented on POST /api/v1/components: no activation flags
    let request: CreateComponentRequest = serde_json::from_value(json!({
        "component": { "name": unique("Banner"), "category": "hero" },
        "first_version": {
            "version": "1.0.0",
            "template_code": "<section>{{headline}}</section>",
            "schema": {
                "type": "object",
                "properties": { "headline": { "type": "string" } }
            }
        }
    }))
    .unwrap();

    let created = db
        .components()
        .create(&request.component, request.first_version.as_ref())
        .await
        .unwrap();
    assert!(created.component.is_active);

    let section = composer(&db)
        .add_section(&page.id, &created.component.id, None)
        .await
        .unwrap();
    assert_eq!(section.order, 1);
    assert_eq!(section.props["headline"], json!(""));
}

#[tokio::test]
async fn test_property_writes_are_checked_against_the_version_schema() {
    let Some(db) = database().await else { return };
    let page = page_fixture(&db).await;
    let created = db
        .components()
        .create(
            &Component {
                name: unique("Banner"),
                is_active: true,
                ..Component::default()
            },
            Some(&ComponentVersion {
                version: "1.0.0".into(),
                template_code: "<section>{{title}}</section>".into(),
                schema: json!({
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "title": { "type": "string", "default": "Hi" },
                        "align": { "type": "string", "enum": ["left", "center"] },
                        "background": { "type": "string", "format": "color" }
                    }
                }),
                is_active: true,
                ..ComponentVersion::default()
            }),
        )
        .await
        .unwrap();
    let composer = composer(&db);

    // Choices and colors without a default start out unset and still validate
    let section = composer
        .add_section(&page.id, &created.component.id, None)
        .await
        .unwrap();
    assert_eq!(section.props["align"], json!(null));
    assert_eq!(section.props["background"], json!(null));

    let err = composer
        .edit_property(&section.id, "align", json!("diagonal"), None)
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::SchemaViolation { keys, .. } if keys == &vec!["align".to_string()]));

    let edited = composer
        .edit_property(&section.id, "align", json!("center"), None)
        .await
        .unwrap();
    assert_eq!(edited.props["align"], json!("center"));
    assert_eq!(edited.props["title"], json!("Hi"));

    let mut bag = edited.props.clone();
    bag.insert("subtitle".into(), json!("not declared"));
    bag.insert("background".into(), json!("blue-ish"));
    let err = composer
        .update_section_properties(&section.id, None, Some(&bag), Some(edited.version))
        .await
        .unwrap_err();
    match err {
        AppError::SchemaViolation { keys, .. } => {
            assert_eq!(keys, vec!["background".to_string(), "subtitle".to_string()]);
        }
        other => panic!("expected a schema violation, got {other:?}"),
    }

    let mut bag = edited.props.clone();
    bag.insert("background".into(), json!("#112233"));
    let saved = composer
        .update_section_properties(&section.id, Some("Banner top"), Some(&bag), Some(edited.version))
        .await
        .unwrap();
    assert_eq!(saved.name, "Banner top");
    assert_eq!(saved.props["background"], json!("#112233"));
    assert_eq!(saved.version, edited.version + 1);
}

#[tokio::test]
async fn test_apply_template_creates_missing_pages_only() {
    let Some(db) = database().await else { return };
    let store = store_fixture(&db).await;
    let component = versioned_component(&db).await;
    let missing = unique("Missing");

    let about = db
        .pages()
        .create(&StorePage {
            store_id: store.id.clone(),
            title: "About us".into(),
            slug: "about".into(),
            is_homepage: true,
            ..StorePage::default()
        })
        .await
        .unwrap();

    let template = db
        .templates()
        .create(&StoreTemplate {
            name: unique("Starter"),
            template_type: "general".into(),
            default_pages: vec![
                TemplatePage {
                    title: "Home".into(),
                    slug: "home".into(),
                    is_homepage: true,
                    components: vec![component.name.clone(), missing.clone()],
                },
                TemplatePage {
                    title: "About".into(),
                    slug: "about".into(),
                    is_homepage: false,
                    components: vec![component.name.clone()],
                },
            ],
            is_active: true,
            ..StoreTemplate::default()
        })
        .await
        .unwrap();

    let applied = composer(&db).apply_template(&store.id, &template.id).await.unwrap();

    assert_eq!(applied.created_pages.len(), 1);
    let home = &applied.created_pages[0];
    assert_eq!(home.slug, "home");
    assert!(home.is_homepage);
    assert_eq!(applied.skipped_pages, vec!["about".to_string()]);
    assert_eq!(applied.missing_components, vec![missing]);

    // Only the resolvable component became a section
    let sections = db.sections().list_by_page(&home.id).await.unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].order, 1);

    // The template's homepage takes the flag from the existing page
    let about = db.pages().get_by_id(&about.id).await.unwrap().unwrap();
    assert!(!about.is_homepage);

    let store = db.stores().get_by_id(&store.id).await.unwrap().unwrap();
    assert_eq!(store.template_id, Some(template.id.clone()));

    // Applying again skips everything
    let again = composer(&db).apply_template(&store.id, &template.id).await.unwrap();
    assert!(again.created_pages.is_empty());
    assert_eq!(again.skipped_pages, vec!["home".to_string(), "about".to_string()]);
}
