//! Table model.
//!
//! [`TableModel`] is the entry point for callers: it loads an existing table,
//! validates a proposed column list and turns it into a versioned
//! [`MigrationArtifact`]. It never persists anything; handing the artifact to
//! [`MigrationStore::persist`] is left to the caller.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::builder::SchemaBuilder;
use crate::codegen::{CodeGenerator, GeneratedMigration, MigrationCode};
use crate::context::SchemaContext;
use crate::error::{Field, ReasonCode, Result, TableError};
use crate::inspector::InspectorError;
use crate::schema::{ColumnDescriptor, TableSchema};
use crate::store::{MigrationArtifact, MigrationStore};
use crate::validator::{SchemaValidator, RULES};

/// Outcome of generating a create or update migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// A migration was generated.
    Generated(MigrationArtifact),
    /// The table already matches; no version was requested.
    NoChanges,
}

impl MigrationOutcome {
    /// Returns the artifact, if one was generated.
    #[must_use]
    pub fn artifact(&self) -> Option<&MigrationArtifact> {
        match self {
            Self::Generated(artifact) => Some(artifact),
            Self::NoChanges => None,
        }
    }
}

/// A table being created or edited.
#[derive(Debug)]
pub struct TableModel<'ctx> {
    context: &'ctx SchemaContext,
    name: String,
    existing: Option<TableSchema>,
}

impl<'ctx> TableModel<'ctx> {
    /// Starts a model for a table that does not exist yet.
    pub fn new(context: &'ctx SchemaContext, name: impl Into<String>) -> Self {
        Self {
            context,
            name: name.into(),
            existing: None,
        }
    }

    /// Loads an existing table from the database.
    ///
    /// Fails with [`TableError::NotFound`] when the table does not exist.
    pub fn load(context: &'ctx SchemaContext, name: &str) -> Result<Self> {
        let physical = context
            .inspector()?
            .describe_table(name)
            .map_err(|e| match e {
                InspectorError::NotFound(table) => TableError::NotFound(table),
                other => TableError::Inspector(other),
            })?;
        let existing = SchemaBuilder::new().from_introspected(&physical)?;
        debug!(table = name, columns = existing.columns.len(), "loaded table");

        Ok(Self {
            context,
            name: name.to_string(),
            existing: Some(existing),
        })
    }

    /// Lists the tables starting with `prefix`.
    pub fn list_tables(context: &SchemaContext, prefix: &str) -> Result<BTreeSet<String>> {
        Ok(context.inspector()?.list_tables(prefix)?)
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the introspected schema of a loaded table.
    #[must_use]
    pub fn existing(&self) -> Option<&TableSchema> {
        self.existing.as_ref()
    }

    /// Returns true when the table has not been created yet.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.existing.is_none()
    }

    /// Validates the table name and `columns` against every rule.
    ///
    /// A new table also fails when its name is already taken.
    pub fn validate(&self, columns: &[ColumnDescriptor], prefix: &str) -> Result<()> {
        let mut errors = SchemaValidator::new().collect(&self.name, columns, prefix, &RULES)?;
        if self.is_new() && self.context.inspector()?.table_exists(&self.name)? {
            errors.add(
                Field::Name,
                ReasonCode::TableExists,
                format!("Table '{}' already exists", self.name),
            );
        }
        errors.into_result()
    }

    /// Generates the migration bringing the table in line with `columns`.
    ///
    /// Returns [`MigrationOutcome::NoChanges`] without requesting a version
    /// when the table already matches.
    pub fn generate_create_or_update_migration(
        &self,
        columns: &[ColumnDescriptor],
        prefix: &str,
        store: &dyn MigrationStore,
    ) -> Result<MigrationOutcome> {
        self.validate(columns, prefix)?;
        let target = SchemaBuilder::new().build(&self.name, columns)?;

        match CodeGenerator::new().generate(&target, self.existing.as_ref()) {
            MigrationCode::NoChanges => {
                info!(table = %self.name, "table is up to date");
                Ok(MigrationOutcome::NoChanges)
            }
            MigrationCode::Changes(migration) => {
                Ok(MigrationOutcome::Generated(wrap(migration, store)?))
            }
        }
    }

    /// Generates a migration dropping a loaded table.
    pub fn generate_drop_migration(&self, store: &dyn MigrationStore) -> Result<MigrationArtifact> {
        let existing = self
            .existing
            .as_ref()
            .ok_or_else(|| TableError::NotFound(self.name.clone()))?;
        wrap(CodeGenerator::new().generate_drop(existing), store)
    }
}

fn wrap(migration: GeneratedMigration, store: &dyn MigrationStore) -> Result<MigrationArtifact> {
    let version = store.next_version()?;
    let description = migration.kind.describe(&migration.table);
    info!(
        version = %version,
        instructions = migration.up.len(),
        "{description}"
    );

    Ok(MigrationArtifact {
        code: migration.code,
        version,
        description,
        table: migration.table,
        migration_name: migration.migration_name,
    })
}
