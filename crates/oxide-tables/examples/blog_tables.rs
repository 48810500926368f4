//! Example: Blog Tables
//!
//! Walks a blog's `acme_posts` table through its life: created from a column
//! list, extended with new columns and a rename, and finally dropped. Each
//! migration is printed instead of written.
//!
//! Run with: cargo run --example blog_tables -p oxide-tables

use std::cell::Cell;
use std::sync::Arc;

use oxide_tables::prelude::*;
use oxide_tables::store::StoreError;

/// Hands out versions without touching the filesystem.
#[derive(Default)]
struct PrintStore {
    last: Cell<Option<Version>>,
}

impl MigrationStore for PrintStore {
    fn next_version(&self) -> std::result::Result<Version, StoreError> {
        let version = self
            .last
            .get()
            .map_or(Ok(Version::INITIAL), Version::next)?;
        self.last.set(Some(version));
        Ok(version)
    }

    fn persist(&self, artifact: &MigrationArtifact) -> std::result::Result<(), StoreError> {
        println!("// {} ({})", artifact.description, artifact.version);
        println!("{}", artifact.code);
        Ok(())
    }
}

fn posts_v1() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "integer")
            .unsigned()
            .auto_increment()
            .primary_key(),
        ColumnDescriptor::new("title", "string").length("191"),
        ColumnDescriptor::new("body", "text").nullable(),
    ]
}

fn posts_v2() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "integer")
            .unsigned()
            .auto_increment()
            .primary_key(),
        ColumnDescriptor::new("headline", "string")
            .id("title")
            .length("191"),
        ColumnDescriptor::new("body", "text").nullable(),
        ColumnDescriptor::new("price", "decimal").length("8,2").default_value("0"),
        ColumnDescriptor::new("published", "boolean").default_value("0"),
    ]
}

/// Context whose database holds `schema`, or nothing.
fn context(schema: Option<&TableSchema>) -> SchemaContext {
    let inspector = schema.map_or_else(MemoryInspector::new, |s| {
        MemoryInspector::new().table(SchemaBuilder::new().to_physical(s))
    });
    SchemaContext::with_inspector(Arc::new(inspector))
}

fn main() -> oxide_tables::Result<()> {
    let store = PrintStore::default();

    println!("=== Create ===\n");
    let ctx = context(None);
    if let MigrationOutcome::Generated(artifact) = TableModel::new(&ctx, "acme_posts")
        .generate_create_or_update_migration(&posts_v1(), "acme", &store)?
    {
        store.persist(&artifact)?;
    }

    println!("=== Update ===\n");
    let v1 = SchemaBuilder::new().build("acme_posts", &posts_v1())?;
    let ctx = context(Some(&v1));
    let model = TableModel::load(&ctx, "acme_posts")?;
    if let MigrationOutcome::Generated(artifact) =
        model.generate_create_or_update_migration(&posts_v2(), "acme", &store)?
    {
        store.persist(&artifact)?;
    }

    println!("=== Rejected ===\n");
    let mut broken = posts_v2();
    broken.push(ColumnDescriptor::new("headline", "text"));
    broken.push(ColumnDescriptor::new("score", "double").unsigned());
    match model.validate(&broken, "acme") {
        Err(TableError::Validation(errors)) => {
            for (field, issue) in errors.all_errors() {
                println!("{field}: [{}] {}", issue.reason, issue.message);
            }
            println!();
        }
        other => println!("Unexpected result: {other:?}\n"),
    }

    println!("=== Drop ===\n");
    let artifact = model.generate_drop_migration(&store)?;
    store.persist(&artifact)?;

    Ok(())
}
