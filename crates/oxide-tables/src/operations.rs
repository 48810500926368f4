//! Diff instructions.
//!
//! This module defines the atomic schema changes a table migration is made of.
//! Generated migration code constructs these values through the helper
//! constructors below.

use serde::{Deserialize, Serialize};

use crate::schema::Column;
use crate::types::{ColumnLength, ColumnType};

/// Attributes of an existing column that change.
///
/// Every field is `None` when that attribute is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ColumnChanges {
    /// New name (the column is renamed).
    pub name: Option<String>,
    /// New type.
    pub column_type: Option<ColumnType>,
    /// New length; `Some(None)` removes it.
    pub length: Option<Option<ColumnLength>>,
    /// New unsigned flag.
    pub unsigned: Option<bool>,
    /// New nullability.
    pub allow_null: Option<bool>,
    /// New auto-increment flag.
    pub auto_increment: Option<bool>,
    /// New default; `Some(None)` removes it.
    pub default: Option<Option<String>>,
}

impl ColumnChanges {
    /// Creates empty column changes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the column.
    #[must_use]
    pub fn rename_to(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets a new type.
    #[must_use]
    pub fn set_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    /// Sets a new length.
    #[must_use]
    pub fn set_length(mut self, length: Option<ColumnLength>) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the unsigned flag.
    #[must_use]
    pub fn set_unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = Some(unsigned);
        self
    }

    /// Sets nullability.
    #[must_use]
    pub fn set_nullable(mut self, allow_null: bool) -> Self {
        self.allow_null = Some(allow_null);
        self
    }

    /// Sets the auto-increment flag.
    #[must_use]
    pub fn set_auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = Some(auto_increment);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn set_default(mut self, default: Option<String>) -> Self {
        self.default = Some(default);
        self
    }

    /// Returns true if no changes are specified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.column_type.is_none()
            && self.length.is_none()
            && self.unsigned.is_none()
            && self.allow_null.is_none()
            && self.auto_increment.is_none()
            && self.default.is_none()
    }

    /// Compares two versions of a column, ignoring its id and primary key
    /// membership.
    #[must_use]
    pub fn between(from: &Column, to: &Column) -> Self {
        let mut changes = Self::new();
        if from.name != to.name {
            changes.name = Some(to.name.clone());
        }
        if from.column_type != to.column_type {
            changes.column_type = Some(to.column_type);
        }
        if from.length != to.length {
            changes.length = Some(to.length);
        }
        if from.unsigned != to.unsigned {
            changes.unsigned = Some(to.unsigned);
        }
        if from.allow_null != to.allow_null {
            changes.allow_null = Some(to.allow_null);
        }
        if from.auto_increment != to.auto_increment {
            changes.auto_increment = Some(to.auto_increment);
        }
        // Defaults compare as exact text: `0` and `'0'` differ.
        if from.default != to.default {
            changes.default = Some(to.default.clone());
        }
        changes
    }
}

/// A single atomic schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffInstruction {
    /// Create a table with all of its columns.
    CreateTable {
        /// Table name.
        table: String,
        /// Column definitions, in order.
        columns: Vec<Column>,
    },

    /// Drop a table.
    DropTable {
        /// Table name.
        table: String,
    },

    /// Drop the primary key constraint.
    DropPrimaryKey {
        /// Table name.
        table: String,
        /// Columns the key currently covers.
        columns: Vec<String>,
    },

    /// Add a column. Primary key membership is added separately.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: Column,
    },

    /// Change attributes of an existing column.
    ModifyColumn {
        /// Table name.
        table: String,
        /// Current column name.
        column: String,
        /// Resulting type.
        column_type: ColumnType,
        /// Resulting length.
        length: Option<ColumnLength>,
        /// The attributes that change.
        changes: ColumnChanges,
    },

    /// Drop a column.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Add the primary key constraint.
    AddPrimaryKey {
        /// Table name.
        table: String,
        /// Columns the key covers.
        columns: Vec<String>,
    },
}

impl DiffInstruction {
    /// Creates a CreateTable instruction.
    #[must_use]
    pub fn create_table(table: impl Into<String>, columns: Vec<Column>) -> Self {
        Self::CreateTable {
            table: table.into(),
            columns,
        }
    }

    /// Creates a DropTable instruction.
    #[must_use]
    pub fn drop_table(table: impl Into<String>) -> Self {
        Self::DropTable {
            table: table.into(),
        }
    }

    /// Creates a DropPrimaryKey instruction.
    #[must_use]
    pub fn drop_primary_key(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self::DropPrimaryKey {
            table: table.into(),
            columns,
        }
    }

    /// Creates an AddColumn instruction.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: Column) -> Self {
        Self::AddColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a ModifyColumn instruction.
    #[must_use]
    pub fn modify_column(
        table: impl Into<String>,
        column: impl Into<String>,
        column_type: ColumnType,
        length: Option<ColumnLength>,
        changes: ColumnChanges,
    ) -> Self {
        Self::ModifyColumn {
            table: table.into(),
            column: column.into(),
            column_type,
            length,
            changes,
        }
    }

    /// Creates a DropColumn instruction.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DropColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates an AddPrimaryKey instruction.
    #[must_use]
    pub fn add_primary_key(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self::AddPrimaryKey {
            table: table.into(),
            columns,
        }
    }

    /// Returns the table this instruction applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table, .. }
            | Self::DropTable { table }
            | Self::DropPrimaryKey { table, .. }
            | Self::AddColumn { table, .. }
            | Self::ModifyColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AddPrimaryKey { table, .. } => table,
        }
    }

    /// Returns a human-readable description of this instruction.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table, columns } => {
                format!("Create table '{table}' with {} column(s)", columns.len())
            }
            Self::DropTable { table } => format!("Drop table '{table}'"),
            Self::DropPrimaryKey { table, columns } => format!(
                "Drop primary key ({}) from table '{table}'",
                columns.join(", ")
            ),
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{table}'", column.name)
            }
            Self::ModifyColumn {
                table,
                column,
                changes,
                ..
            } => match &changes.name {
                Some(new_name) => format!(
                    "Modify column '{column}' (renamed to '{new_name}') in table '{table}'"
                ),
                None => format!("Modify column '{column}' in table '{table}'"),
            },
            Self::DropColumn { table, column } => {
                format!("Drop column '{column}' from table '{table}'")
            }
            Self::AddPrimaryKey { table, columns } => format!(
                "Add primary key ({}) to table '{table}'",
                columns.join(", ")
            ),
        }
    }
}
