//! Table schema representation types.
//!
//! [`ColumnDescriptor`] is the column as a caller declares it, with raw text
//! for the length and default. [`Column`] is the canonical, typed form that the
//! differ and code generator work on. Both sides of a comparison (the target
//! built from user input and the existing table loaded from introspection) are
//! [`TableSchema`] values.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{ColumnLength, ColumnType};

/// User-specified definition of one table column, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Stable identifier correlating the column across edits. Defaults to
    /// `name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Column name.
    pub name: String,
    /// Canonical type name, e.g. `integer` or `string`.
    #[serde(rename = "type")]
    pub column_type: String,
    /// Raw length parameter, e.g. `191` or `10,2`.
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub length: Option<String>,
    /// Whether the column is unsigned.
    #[serde(default)]
    pub unsigned: bool,
    /// Whether the column accepts NULL.
    #[serde(default)]
    pub allow_null: bool,
    /// Whether the column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
    /// Whether the column is the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Literal default value.
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
}

impl ColumnDescriptor {
    /// Creates a descriptor with every flag off.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            column_type: column_type.into(),
            length: None,
            unsigned: false,
            allow_null: false,
            auto_increment: false,
            primary_key: false,
            default: None,
        }
    }

    /// Sets the stable identifier.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the raw length parameter.
    #[must_use]
    pub fn length(mut self, length: impl Into<String>) -> Self {
        self.length = Some(length.into());
        self
    }

    /// Marks the column unsigned.
    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Lets the column accept NULL.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Marks the column auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the literal default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Returns the identifier, falling back to the name.
    #[must_use]
    pub fn effective_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

/// Canonical, typed column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Stable identifier used to match columns across target and existing.
    pub id: String,
    /// Column name.
    pub name: String,
    /// Canonical type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Parsed length parameter.
    pub length: Option<ColumnLength>,
    /// Whether the column is unsigned.
    pub unsigned: bool,
    /// Whether the column accepts NULL.
    pub allow_null: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Whether the column is the primary key.
    pub primary_key: bool,
    /// Literal default value, compared as text.
    pub default: Option<String>,
}

impl Column {
    /// Creates a NOT NULL column whose id equals its name.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            column_type,
            length: None,
            unsigned: false,
            allow_null: false,
            auto_increment: false,
            primary_key: false,
            default: None,
        }
    }

    /// Sets the stable identifier.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the length parameter.
    #[must_use]
    pub fn length(mut self, length: ColumnLength) -> Self {
        self.length = Some(length);
        self
    }

    /// Marks the column unsigned.
    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Lets the column accept NULL.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Marks the column auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the literal default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A table: a name plus an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Column definitions, in declaration order.
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Creates an empty table schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Gets a column by its stable identifier.
    #[must_use]
    pub fn column_by_id(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Returns the primary key columns, in column order.
    pub fn primary_key(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Returns the names of the primary key columns.
    #[must_use]
    pub fn primary_key_names(&self) -> Vec<String> {
        self.primary_key().map(|c| c.name.clone()).collect()
    }
}

/// Accepts a JSON string, number or boolean and keeps its text form.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}
