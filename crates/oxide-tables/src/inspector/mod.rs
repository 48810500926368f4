//! Live schema introspection.
//!
//! The core only depends on the [`SchemaInspector`] trait. [`MemoryInspector`]
//! serves a snapshot of physical tables held in memory (loaded from JSON or
//! captured from a live database by [`MySqlInspector`]).

mod mysql;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use mysql::{parse_column_type, MySqlInspector};

/// Errors raised by a schema inspector.
#[derive(Debug, thiserror::Error)]
pub enum InspectorError {
    /// The table does not exist.
    #[error("Table '{0}' not found")]
    NotFound(String),

    /// The database could not be queried.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A snapshot file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file could not be parsed.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// A column as reported by the database, in engine-native terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalColumn {
    /// Column name.
    pub name: String,
    /// Engine-native type name, e.g. `varchar` or `int`.
    pub type_name: String,
    /// Character length, for string types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Numeric precision, for fixed and floating point types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    /// Numeric scale, for fixed and floating point types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
    /// Whether the column accepts NULL.
    #[serde(default)]
    pub nullable: bool,
    /// Whether the column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
    /// Whether the column is unsigned.
    #[serde(default)]
    pub unsigned: bool,
    /// Default value as reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A table as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalTable {
    /// Table name.
    pub name: String,
    /// Columns in ordinal order.
    pub columns: Vec<PhysicalColumn>,
    /// Names of the primary key columns.
    #[serde(default)]
    pub primary_key: Vec<String>,
}

/// Read-only access to the live database schema.
pub trait SchemaInspector: Send + Sync {
    /// Returns the names of the tables starting with `prefix`.
    fn list_tables(&self, prefix: &str) -> Result<BTreeSet<String>, InspectorError>;

    /// Returns whether a table exists.
    fn table_exists(&self, name: &str) -> Result<bool, InspectorError>;

    /// Describes a table, failing with [`InspectorError::NotFound`] when it is
    /// absent.
    fn describe_table(&self, name: &str) -> Result<PhysicalTable, InspectorError>;
}

/// A [`SchemaInspector`] over a fixed set of tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryInspector {
    tables: BTreeMap<String, PhysicalTable>,
}

impl MemoryInspector {
    /// Creates an inspector with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an inspector serving `tables`.
    #[must_use]
    pub fn from_tables(tables: impl IntoIterator<Item = PhysicalTable>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// Adds or replaces a table.
    #[must_use]
    pub fn table(mut self, table: PhysicalTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Loads a JSON snapshot: an array of physical tables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InspectorError> {
        let content = std::fs::read_to_string(path)?;
        let tables: Vec<PhysicalTable> = serde_json::from_str(&content)?;
        Ok(Self::from_tables(tables))
    }

    /// Serializes the snapshot as a JSON array of physical tables.
    pub fn to_json(&self) -> Result<String, InspectorError> {
        let tables: Vec<&PhysicalTable> = self.tables.values().collect();
        Ok(serde_json::to_string_pretty(&tables)?)
    }

    /// Returns the tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = &PhysicalTable> {
        self.tables.values()
    }
}

impl SchemaInspector for MemoryInspector {
    fn list_tables(&self, prefix: &str) -> Result<BTreeSet<String>, InspectorError> {
        Ok(self
            .tables
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn table_exists(&self, name: &str) -> Result<bool, InspectorError> {
        Ok(self.tables.contains_key(name))
    }

    fn describe_table(&self, name: &str) -> Result<PhysicalTable, InspectorError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| InspectorError::NotFound(name.to_string()))
    }
}
