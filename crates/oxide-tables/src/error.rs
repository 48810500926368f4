//! Error types for table building and migration generation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::inspector::InspectorError;
use crate::store::StoreError;
use crate::types::TypeConstraintError;

/// Errors that can occur while validating, building or generating a table
/// migration.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Required context is missing before the operation can start.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The referenced table does not exist.
    #[error("Table '{0}' does not exist")]
    NotFound(String),

    /// The proposed table violates one or more schema rules.
    #[error("Validation failed:\n{0}")]
    Validation(ValidationErrors),

    /// A column carries a malformed type or length.
    #[error("Column '{column}': {source}")]
    TypeConstraint {
        /// The offending column.
        column: String,
        /// What is wrong with it.
        #[source]
        source: TypeConstraintError,
    },

    /// Introspection reported a type the registry cannot map.
    #[error("Column '{column}' of table '{table}' has unsupported type '{type_name}'")]
    UnsupportedPhysicalType {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Physical type name as reported.
        type_name: String,
    },

    /// The schema inspector failed.
    #[error("Schema inspector error: {0}")]
    Inspector(#[from] InspectorError),

    /// The migration store failed.
    #[error("Migration store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// The input field a validation issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// The table name.
    Name,
    /// The column list.
    Columns,
}

impl Field {
    /// Returns the field name as exposed to callers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Columns => "columns",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable reason codes, so callers can localize messages themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// The column list is empty.
    EmptyColumns,
    /// A column name is not a lowercase identifier.
    InvalidColumnName,
    /// Two columns share a name.
    DuplicateColumn,
    /// Two differently named columns share an id.
    DuplicateColumnId,
    /// A column type is not a canonical type.
    UnknownType,
    /// More than one column is the primary key.
    MultiplePrimaryKeys,
    /// The primary key column accepts NULL.
    NullablePrimaryKey,
    /// More than one column auto-increments.
    MultipleAutoIncrement,
    /// An auto-increment column is not integer typed.
    AutoIncrementNotInteger,
    /// An unsigned column is not integer typed.
    UnsignedNotInteger,
    /// A length is outside its type's legal domain.
    IllegalLength,
    /// The table name is not a lowercase identifier.
    InvalidName,
    /// The table name lacks the required prefix.
    InvalidPrefix,
    /// A table with this name already exists.
    TableExists,
}

impl ReasonCode {
    /// Returns the stable code string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyColumns => "empty_columns",
            Self::InvalidColumnName => "invalid_column_name",
            Self::DuplicateColumn => "duplicate_column",
            Self::DuplicateColumnId => "duplicate_column_id",
            Self::UnknownType => "unknown_type",
            Self::MultiplePrimaryKeys => "multiple_primary_keys",
            Self::NullablePrimaryKey => "nullable_primary_key",
            Self::MultipleAutoIncrement => "multiple_auto_increment",
            Self::AutoIncrementNotInteger => "auto_increment_not_integer",
            Self::UnsignedNotInteger => "unsigned_not_integer",
            Self::IllegalLength => "illegal_length",
            Self::InvalidName => "invalid_name",
            Self::InvalidPrefix => "invalid_prefix",
            Self::TableExists => "table_exists",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Why the input was rejected.
    pub reason: ReasonCode,
    /// Default English rendering.
    pub message: String,
    /// The offending column, if the issue concerns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// The prefix the table name must start with, for prefix issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_prefix: Option<String>,
}

/// Collection of validation issues keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<Field, Vec<ValidationIssue>>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an issue for a field.
    pub fn add(&mut self, field: Field, reason: ReasonCode, message: impl Into<String>) {
        self.push(
            field,
            ValidationIssue {
                reason,
                message: message.into(),
                column: None,
                expected_prefix: None,
            },
        );
    }

    /// Adds an issue concerning a specific column.
    pub fn add_column(
        &mut self,
        column: &str,
        reason: ReasonCode,
        message: impl Into<String>,
    ) {
        self.push(
            Field::Columns,
            ValidationIssue {
                reason,
                message: message.into(),
                column: Some(column.to_string()),
                expected_prefix: None,
            },
        );
    }

    /// Adds a table name issue naming the prefix that was required.
    pub fn add_prefix(
        &mut self,
        reason: ReasonCode,
        message: impl Into<String>,
        expected_prefix: &str,
    ) {
        self.push(
            Field::Name,
            ValidationIssue {
                reason,
                message: message.into(),
                column: None,
                expected_prefix: Some(expected_prefix.to_string()),
            },
        );
    }

    fn push(&mut self, field: Field, issue: ValidationIssue) {
        self.errors.entry(field).or_default().push(issue);
    }

    /// Moves every issue of `other` into this collection.
    pub fn merge(&mut self, other: Self) {
        for (field, issues) in other.errors {
            self.errors.entry(field).or_default().extend(issues);
        }
    }

    /// Returns whether there are any issues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of fields with issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns the issues for a specific field.
    #[must_use]
    pub fn get(&self, field: Field) -> &[ValidationIssue] {
        self.errors.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Returns whether `field` carries an issue with `reason`.
    #[must_use]
    pub fn has(&self, field: Field, reason: ReasonCode) -> bool {
        self.get(field).iter().any(|issue| issue.reason == reason)
    }

    /// Returns every issue as a flat list, fields in stable order.
    #[must_use]
    pub fn all_errors(&self) -> Vec<(Field, &ValidationIssue)> {
        self.errors
            .iter()
            .flat_map(|(field, issues)| issues.iter().map(move |issue| (*field, issue)))
            .collect()
    }

    /// Converts into a `Result`, failing when any issue was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TableError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (field, issues) in &self.errors {
            for issue in issues {
                writeln!(f, "{field}: [{}] {}", issue.reason, issue.message)?;
            }
        }
        Ok(())
    }
}
