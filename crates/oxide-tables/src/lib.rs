//! Declarative table builder with migration code generation.
//!
//! `oxide-tables` takes a table described as a name plus an ordered list of
//! column descriptors and produces the migration that brings the live table in
//! line with it:
//! - Invalid input is rejected up front, with every violation reported at once
//!   under a stable reason code
//! - Existing tables are read through a [`SchemaInspector`](inspector::SchemaInspector)
//! - The diff is minimal, deterministic and tracks renames through column ids
//! - The result is Rust source implementing [`TableMigration`]
//!
//! No DDL is ever executed.
//!
//! # Architecture
//!
//! - **Types** - Canonical column types and their legal lengths
//! - **Validator** - Table-level rules over column descriptors
//! - **Builder** - Descriptors and introspected tables to canonical schemas
//! - **Diff** - Target vs. existing schema as ordered instructions
//! - **Codegen** - Instructions as migration source
//! - **Model** - The orchestrator tying these together
//! - **Store** - Versioning and persistence of generated migrations
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oxide_tables::prelude::*;
//!
//! let context = SchemaContext::with_inspector(Arc::new(MemoryInspector::new()));
//! let store = FsMigrationStore::new("migrations");
//!
//! let columns = vec![
//!     ColumnDescriptor::new("id", "integer").unsigned().auto_increment().primary_key(),
//!     ColumnDescriptor::new("title", "string").length("191"),
//! ];
//!
//! let model = TableModel::new(&context, "acme_posts");
//! if let MigrationOutcome::Generated(artifact) =
//!     model.generate_create_or_update_migration(&columns, "acme", &store)?
//! {
//!     store.persist(&artifact)?;
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Check a table definition
//! oxide-tables validate acme_posts --columns posts.json --prefix acme
//!
//! # Generate a create or update migration
//! oxide-tables generate acme_posts --columns posts.json --prefix acme
//!
//! # Capture the live schema for offline use
//! oxide-tables snapshot --prefix acme --database mysql://localhost/app > schema.json
//! ```

pub mod builder;
pub mod codegen;
pub mod context;
pub mod diff;
pub mod error;
pub mod inspector;
pub mod model;
pub mod operations;
pub mod schema;
pub mod store;
pub mod types;
pub mod validator;

pub use context::SchemaContext;
pub use error::{Result, TableError};
pub use model::{MigrationOutcome, TableModel};

/// Prelude for convenient imports. Generated migrations import this.
pub mod prelude {
    pub use crate::builder::SchemaBuilder;
    pub use crate::codegen::{CodeGenerator, MigrationCode};
    pub use crate::context::SchemaContext;
    pub use crate::diff::SchemaDiffer;
    pub use crate::error::{Field, ReasonCode, Result, TableError, ValidationErrors};
    pub use crate::inspector::{MemoryInspector, MySqlInspector, SchemaInspector};
    pub use crate::model::{MigrationOutcome, TableModel};
    pub use crate::operations::{ColumnChanges, DiffInstruction};
    pub use crate::schema::{Column, ColumnDescriptor, TableSchema};
    pub use crate::store::{FsMigrationStore, MigrationArtifact, MigrationStore, Version};
    pub use crate::types::{ColumnLength, ColumnType};
    pub use crate::validator::SchemaValidator;
    pub use crate::TableMigration;
}

/// Trait implemented by generated migrations.
pub trait TableMigration {
    /// The table the migration applies to.
    const TABLE: &'static str;

    /// Returns the instructions applying the change.
    fn up() -> Vec<operations::DiffInstruction>;

    /// Returns the instructions reverting the change.
    fn down() -> Vec<operations::DiffInstruction>;

    /// Returns a description of each `up()` instruction.
    fn summary() -> Vec<String> {
        Self::up()
            .iter()
            .map(operations::DiffInstruction::description)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    struct TableCreateAcmeTags;

    impl TableMigration for TableCreateAcmeTags {
        const TABLE: &'static str = "acme_tags";

        fn up() -> Vec<DiffInstruction> {
            vec![DiffInstruction::create_table(
                "acme_tags",
                vec![
                    Column::new("id", ColumnType::Integer)
                        .unsigned()
                        .auto_increment()
                        .primary_key(),
                    Column::new("label", ColumnType::String).length(ColumnLength::Chars(64)),
                ],
            )]
        }

        fn down() -> Vec<DiffInstruction> {
            vec![DiffInstruction::drop_table("acme_tags")]
        }
    }

    #[test]
    fn test_migration_trait() {
        assert_eq!(TableCreateAcmeTags::TABLE, "acme_tags");
        assert_eq!(TableCreateAcmeTags::up().len(), 1);
        assert!(TableCreateAcmeTags::up()
            .iter()
            .chain(TableCreateAcmeTags::down().iter())
            .all(|op| op.table() == TableCreateAcmeTags::TABLE));
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            TableCreateAcmeTags::summary(),
            vec!["Create table 'acme_tags' with 2 column(s)"]
        );
    }
}
