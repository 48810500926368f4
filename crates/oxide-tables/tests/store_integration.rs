//! Generated migrations written through the filesystem store.

mod common;

use std::fs;

use common::{build, context_with, empty_context, physical, posts_columns};
use oxide_tables::inspector::MemoryInspector;
use oxide_tables::prelude::*;
use oxide_tables::store::MANIFEST_FILE;

#[test]
fn create_then_update_versions_increase() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsMigrationStore::new(dir.path());

    let ctx = empty_context();
    let outcome = TableModel::new(&ctx, "acme_posts")
        .generate_create_or_update_migration(&posts_columns()[..1], "acme", &store)
        .unwrap();
    let created = outcome.artifact().unwrap();
    store.persist(created).unwrap();

    let existing = build("acme_posts", &posts_columns()[..1]);
    let ctx = context_with(vec![physical(&existing)]);
    let outcome = TableModel::load(&ctx, "acme_posts")
        .unwrap()
        .generate_create_or_update_migration(&posts_columns(), "acme", &store)
        .unwrap();
    let updated = outcome.artifact().unwrap();
    store.persist(updated).unwrap();

    assert_eq!(created.version, Version::new(1, 0, 1));
    assert_eq!(updated.version, Version::new(1, 0, 2));

    let manifest = store.manifest().unwrap();
    let descriptions: Vec<&str> = manifest.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec!["Created table acme_posts", "Updated table acme_posts"]
    );

    let code = fs::read_to_string(dir.path().join("table_update_acme_posts.rs")).unwrap();
    assert!(code.contains("impl TableMigration for TableUpdateAcmePosts"));
    assert!(dir.path().join(MANIFEST_FILE).exists());
}

#[test]
fn snapshot_file_feeds_lazy_context() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("schema.json");

    let existing = build("acme_posts", &posts_columns());
    let snapshot = MemoryInspector::from_tables([physical(&existing)]);
    fs::write(&snapshot_path, snapshot.to_json().unwrap()).unwrap();

    let path = snapshot_path.clone();
    let ctx = SchemaContext::new(move || {
        let inspector = MemoryInspector::load(&path)?;
        Ok(std::sync::Arc::new(inspector) as std::sync::Arc<dyn SchemaInspector>)
    });
    assert!(!ctx.is_connected());

    let tables = TableModel::list_tables(&ctx, "acme_").unwrap();
    assert!(tables.contains("acme_posts"));

    let model = TableModel::load(&ctx, "acme_posts").unwrap();
    assert_eq!(model.existing(), Some(&existing));
}
