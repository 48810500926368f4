#![allow(dead_code)]

use std::cell::Cell;
use std::sync::Arc;

use oxide_tables::inspector::{MemoryInspector, PhysicalTable};
use oxide_tables::prelude::*;
use oxide_tables::store::StoreError;

/// A store that hands out sequential versions and counts the requests.
#[derive(Default)]
pub struct CountingStore {
    pub requests: Cell<u32>,
    pub persisted: Cell<u32>,
}

impl MigrationStore for CountingStore {
    fn next_version(&self) -> std::result::Result<Version, StoreError> {
        let n = self.requests.get() + 1;
        self.requests.set(n);
        Ok(Version::new(1, 0, n))
    }

    fn persist(&self, _artifact: &MigrationArtifact) -> std::result::Result<(), StoreError> {
        self.persisted.set(self.persisted.get() + 1);
        Ok(())
    }
}

pub fn context_with(tables: Vec<PhysicalTable>) -> SchemaContext {
    SchemaContext::with_inspector(Arc::new(MemoryInspector::from_tables(tables)))
}

pub fn empty_context() -> SchemaContext {
    context_with(Vec::new())
}

/// The column list used across scenarios, as a UI would post it.
pub fn posts_columns() -> Vec<ColumnDescriptor> {
    serde_json::from_str(
        r#"[
            {"name": "id", "type": "integer", "primary_key": true, "auto_increment": true, "unsigned": true},
            {"name": "title", "type": "string", "length": 191, "allow_null": false}
        ]"#,
    )
    .unwrap_or_else(|e| panic!("Failed to parse columns: {e}"))
}

/// Physical form of `schema`, as introspection would report it.
pub fn physical(schema: &TableSchema) -> PhysicalTable {
    SchemaBuilder::new().to_physical(schema)
}

pub fn build(name: &str, columns: &[ColumnDescriptor]) -> TableSchema {
    SchemaBuilder::new()
        .build(name, columns)
        .unwrap_or_else(|e| panic!("Failed to build {name}: {e}"))
}

pub fn validation_errors(result: oxide_tables::Result<impl std::fmt::Debug>) -> ValidationErrors {
    match result {
        Err(TableError::Validation(errors)) => errors,
        other => panic!("Expected Validation error, got {other:?}"),
    }
}
