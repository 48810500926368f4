//! Schema validation.
//!
//! The validator checks a proposed table name and column list against a fixed
//! list of [`Rule`]s. Every rule runs and all violations are collected, so a
//! caller gets complete feedback in one pass.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Field, ReasonCode, Result, TableError, ValidationErrors};
use crate::schema::ColumnDescriptor;
use crate::types::ColumnType;

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("table name pattern is valid"));

static COLUMN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("column name pattern is valid"));

/// The validation rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The table name is a lowercase identifier.
    TableNamePattern,
    /// The table name starts with `<prefix>_`.
    TablePrefix,
    /// The column list is not empty.
    NonEmptyColumns,
    /// Column names are lowercase identifiers.
    ColumnNamePattern,
    /// Column names are unique.
    UniqueColumnNames,
    /// Column ids are unique, so every column matches at most one existing
    /// column.
    UniqueColumnIds,
    /// Column types are canonical types.
    KnownTypes,
    /// At most one primary key, and it is NOT NULL.
    SinglePrimaryKey,
    /// At most one auto-increment column, and it is integer typed.
    SingleAutoIncrement,
    /// Unsigned columns are integer typed.
    UnsignedIntegers,
    /// Lengths are inside their type's domain.
    LegalLengths,
}

/// Every rule, in evaluation order.
pub const RULES: [Rule; 11] = [
    Rule::TableNamePattern,
    Rule::TablePrefix,
    Rule::NonEmptyColumns,
    Rule::ColumnNamePattern,
    Rule::UniqueColumnNames,
    Rule::UniqueColumnIds,
    Rule::KnownTypes,
    Rule::SinglePrimaryKey,
    Rule::SingleAutoIncrement,
    Rule::UnsignedIntegers,
    Rule::LegalLengths,
];

/// What a rule gets to look at.
struct Subject<'a> {
    table: &'a str,
    prefix: &'a str,
    columns: &'a [ColumnDescriptor],
}

impl Rule {
    /// Returns the rule name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TableNamePattern => "table_name_pattern",
            Self::TablePrefix => "table_prefix",
            Self::NonEmptyColumns => "non_empty_columns",
            Self::ColumnNamePattern => "column_name_pattern",
            Self::UniqueColumnNames => "unique_column_names",
            Self::UniqueColumnIds => "unique_column_ids",
            Self::KnownTypes => "known_types",
            Self::SinglePrimaryKey => "single_primary_key",
            Self::SingleAutoIncrement => "single_auto_increment",
            Self::UnsignedIntegers => "unsigned_integers",
            Self::LegalLengths => "legal_lengths",
        }
    }

    /// Returns true for rules that only look at the table name.
    #[must_use]
    pub const fn is_name_rule(self) -> bool {
        matches!(self, Self::TableNamePattern | Self::TablePrefix)
    }

    fn check(self, subject: &Subject<'_>, errors: &mut ValidationErrors) {
        match self {
            Self::TableNamePattern => check_table_name(subject, errors),
            Self::TablePrefix => check_prefix(subject, errors),
            Self::NonEmptyColumns => check_non_empty(subject, errors),
            Self::ColumnNamePattern => check_column_names(subject, errors),
            Self::UniqueColumnNames => check_unique_names(subject, errors),
            Self::UniqueColumnIds => check_unique_ids(subject, errors),
            Self::KnownTypes => check_known_types(subject, errors),
            Self::SinglePrimaryKey => check_primary_key(subject, errors),
            Self::SingleAutoIncrement => check_auto_increment(subject, errors),
            Self::UnsignedIntegers => check_unsigned(subject, errors),
            Self::LegalLengths => check_lengths(subject, errors),
        }
    }
}

/// Validates table names and column lists.
#[derive(Debug, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs every rule against the table name and columns.
    ///
    /// Fails with [`TableError::Configuration`] when `prefix` is empty and with
    /// [`TableError::Validation`] listing every violation otherwise.
    pub fn validate(&self, table: &str, columns: &[ColumnDescriptor], prefix: &str) -> Result<()> {
        self.collect(table, columns, prefix, &RULES)?.into_result()
    }

    /// Runs only the table name rules.
    pub fn validate_name(&self, table: &str, prefix: &str) -> Result<()> {
        let name_rules: Vec<Rule> = RULES.iter().copied().filter(|r| r.is_name_rule()).collect();
        self.collect(table, &[], prefix, &name_rules)?.into_result()
    }

    /// Runs `rules` and returns the collected issues without failing on them.
    pub fn collect(
        &self,
        table: &str,
        columns: &[ColumnDescriptor],
        prefix: &str,
        rules: &[Rule],
    ) -> Result<ValidationErrors> {
        if prefix.trim().is_empty() {
            return Err(TableError::Configuration(
                "a namespace prefix is required to validate table names".to_string(),
            ));
        }

        let subject = Subject {
            table,
            prefix,
            columns,
        };
        let mut errors = ValidationErrors::new();
        for rule in rules {
            let mut found = ValidationErrors::new();
            rule.check(&subject, &mut found);
            if !found.is_empty() {
                debug!(rule = rule.name(), table, "validation rule failed");
            }
            errors.merge(found);
        }
        Ok(errors)
    }
}

fn check_table_name(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    if !TABLE_NAME.is_match(subject.table) {
        errors.add(
            Field::Name,
            ReasonCode::InvalidName,
            format!(
                "Table name '{}' must start with a lowercase letter and contain only \
                 lowercase letters, digits and underscores",
                subject.table
            ),
        );
    }
}

fn check_prefix(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    let required = format!("{}_", subject.prefix);
    let valid = subject
        .table
        .strip_prefix(&required)
        .is_some_and(|rest| !rest.is_empty());
    if !valid {
        errors.add_prefix(
            ReasonCode::InvalidPrefix,
            format!(
                "Table name '{}' must start with '{required}' followed by a name",
                subject.table
            ),
            &required,
        );
    }
}

fn check_non_empty(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    if subject.columns.is_empty() {
        errors.add(
            Field::Columns,
            ReasonCode::EmptyColumns,
            "The table must have at least one column",
        );
    }
}

fn check_column_names(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    for column in subject.columns {
        if !COLUMN_NAME.is_match(&column.name) {
            errors.add_column(
                &column.name,
                ReasonCode::InvalidColumnName,
                format!(
                    "Column name '{}' must contain only lowercase letters, digits and underscores",
                    column.name
                ),
            );
        }
    }
}

fn check_unique_names(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for column in subject.columns {
        if !seen.insert(column.name.as_str()) && reported.insert(column.name.as_str()) {
            errors.add_column(
                &column.name,
                ReasonCode::DuplicateColumn,
                format!("Column '{}' is declared more than once", column.name),
            );
        }
    }
}

// Columns sharing both name and id are left to `UniqueColumnNames`.
fn check_unique_ids(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    let mut first_name: HashMap<&str, &str> = HashMap::new();
    let mut reported = HashSet::new();
    for column in subject.columns {
        let id = column.effective_id();
        let name = *first_name.entry(id).or_insert(column.name.as_str());
        if name != column.name && reported.insert(id) {
            errors.add_column(
                &column.name,
                ReasonCode::DuplicateColumnId,
                format!(
                    "Column '{}' has id '{id}', which column '{name}' already uses",
                    column.name
                ),
            );
        }
    }
}

fn check_known_types(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    for column in subject.columns {
        if let Err(err) = column.column_type.parse::<ColumnType>() {
            errors.add_column(&column.name, ReasonCode::UnknownType, err.to_string());
        }
    }
}

fn check_primary_key(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    let keys: Vec<&ColumnDescriptor> = subject.columns.iter().filter(|c| c.primary_key).collect();
    if keys.len() > 1 {
        let names: Vec<&str> = keys.iter().map(|c| c.name.as_str()).collect();
        errors.add(
            Field::Columns,
            ReasonCode::MultiplePrimaryKeys,
            format!(
                "Only one column may be the primary key, found: {}",
                names.join(", ")
            ),
        );
    }
    for column in keys.iter().filter(|c| c.allow_null) {
        errors.add_column(
            &column.name,
            ReasonCode::NullablePrimaryKey,
            format!("Primary key column '{}' cannot allow NULL", column.name),
        );
    }
}

fn check_auto_increment(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    let incrementing: Vec<&ColumnDescriptor> =
        subject.columns.iter().filter(|c| c.auto_increment).collect();
    if incrementing.len() > 1 {
        let names: Vec<&str> = incrementing.iter().map(|c| c.name.as_str()).collect();
        errors.add(
            Field::Columns,
            ReasonCode::MultipleAutoIncrement,
            format!(
                "Only one column may auto-increment, found: {}",
                names.join(", ")
            ),
        );
    }
    for column in incrementing {
        if is_known_non_integer(column) {
            errors.add_column(
                &column.name,
                ReasonCode::AutoIncrementNotInteger,
                format!(
                    "Auto-increment column '{}' must have an integer type, not '{}'",
                    column.name, column.column_type
                ),
            );
        }
    }
}

fn check_unsigned(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    for column in subject.columns.iter().filter(|c| c.unsigned) {
        if is_known_non_integer(column) {
            errors.add_column(
                &column.name,
                ReasonCode::UnsignedNotInteger,
                format!(
                    "Unsigned column '{}' must have an integer type, not '{}'",
                    column.name, column.column_type
                ),
            );
        }
    }
}

fn check_lengths(subject: &Subject<'_>, errors: &mut ValidationErrors) {
    for column in subject.columns {
        // Unknown types are reported by `KnownTypes`.
        let Ok(column_type) = column.column_type.parse::<ColumnType>() else {
            continue;
        };
        if let Err(err) = column_type.validate_length(column.length.as_deref()) {
            errors.add_column(
                &column.name,
                ReasonCode::IllegalLength,
                format!("Column '{}': {err}", column.name),
            );
        }
    }
}

/// Unknown types are reported once by `KnownTypes`, not again here.
fn is_known_non_integer(column: &ColumnDescriptor) -> bool {
    column
        .column_type
        .parse::<ColumnType>()
        .is_ok_and(|ty| !ty.is_integer())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(table: &str, columns: &[ColumnDescriptor]) -> Result<()> {
        SchemaValidator::new().validate(table, columns, "acme")
    }

    fn errors(table: &str, columns: &[ColumnDescriptor]) -> ValidationErrors {
        match validate(table, columns) {
            Err(TableError::Validation(errors)) => errors,
            other => panic!("Expected validation errors, got {other:?}"),
        }
    }

    fn id_column() -> ColumnDescriptor {
        ColumnDescriptor::new("id", "integer")
            .unsigned()
            .auto_increment()
            .primary_key()
    }

    #[test]
    fn test_valid_table() {
        let columns = vec![
            id_column(),
            ColumnDescriptor::new("title", "string").length("191"),
            ColumnDescriptor::new("price", "decimal").length("10,2").nullable(),
        ];
        assert!(validate("acme_posts", &columns).is_ok());
    }

    #[test]
    fn test_duplicate_column() {
        let columns = vec![
            ColumnDescriptor::new("slug", "string"),
            ColumnDescriptor::new("slug", "string"),
            ColumnDescriptor::new("slug", "text"),
        ];
        let errors = errors("acme_posts", &columns);
        assert!(errors.has(Field::Columns, ReasonCode::DuplicateColumn));
        let duplicates = errors
            .get(Field::Columns)
            .iter()
            .filter(|i| i.reason == ReasonCode::DuplicateColumn)
            .count();
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn test_duplicate_column_id() {
        let columns = vec![
            id_column(),
            ColumnDescriptor::new("headline", "string").id("title"),
            ColumnDescriptor::new("title", "string"),
        ];
        let errors = errors("acme_posts", &columns);
        let issues: Vec<_> = errors
            .get(Field::Columns)
            .iter()
            .filter(|i| i.reason == ReasonCode::DuplicateColumnId)
            .collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column.as_deref(), Some("title"));
        assert!(!errors.has(Field::Columns, ReasonCode::DuplicateColumn));

        let renamed = vec![
            id_column(),
            ColumnDescriptor::new("headline", "string").id("title"),
        ];
        assert!(validate("acme_posts", &renamed).is_ok());
    }

    #[test]
    fn test_duplicate_name_not_reported_as_duplicate_id() {
        let columns = vec![
            ColumnDescriptor::new("slug", "string"),
            ColumnDescriptor::new("slug", "string"),
        ];
        let errors = errors("acme_posts", &columns);
        assert!(errors.has(Field::Columns, ReasonCode::DuplicateColumn));
        assert!(!errors.has(Field::Columns, ReasonCode::DuplicateColumnId));
    }

    #[test]
    fn test_multiple_primary_keys() {
        let columns = vec![
            ColumnDescriptor::new("id", "integer").primary_key(),
            ColumnDescriptor::new("uuid", "string").primary_key(),
        ];
        assert!(
            errors("acme_posts", &columns).has(Field::Columns, ReasonCode::MultiplePrimaryKeys)
        );

        let single = vec![ColumnDescriptor::new("id", "integer").primary_key()];
        assert!(validate("acme_posts", &single).is_ok());
    }

    #[test]
    fn test_nullable_primary_key() {
        let columns = vec![ColumnDescriptor::new("id", "integer").primary_key().nullable()];
        assert!(errors("acme_posts", &columns).has(Field::Columns, ReasonCode::NullablePrimaryKey));
    }

    #[test]
    fn test_multiple_auto_increment() {
        let columns = vec![
            ColumnDescriptor::new("id", "integer").auto_increment(),
            ColumnDescriptor::new("seq", "bigInteger").auto_increment(),
        ];
        let errors = errors("acme_posts", &columns);
        assert!(errors.has(Field::Columns, ReasonCode::MultipleAutoIncrement));
        assert!(!errors.has(Field::Columns, ReasonCode::AutoIncrementNotInteger));
    }

    #[test]
    fn test_type_gated_flags() {
        let columns = vec![
            ColumnDescriptor::new("title", "string").auto_increment(),
            ColumnDescriptor::new("amount", "decimal").length("8,2").unsigned(),
        ];
        let errors = errors("acme_posts", &columns);
        assert!(errors.has(Field::Columns, ReasonCode::AutoIncrementNotInteger));
        assert!(errors.has(Field::Columns, ReasonCode::UnsignedNotInteger));
    }

    #[test]
    fn test_unknown_type_reported_once() {
        let columns = vec![ColumnDescriptor::new("geo", "geometry")
            .unsigned()
            .length("12")];
        let errors = errors("acme_posts", &columns);
        assert_eq!(errors.get(Field::Columns).len(), 1);
        assert!(errors.has(Field::Columns, ReasonCode::UnknownType));
    }

    #[test]
    fn test_illegal_length() {
        let columns = vec![ColumnDescriptor::new("title", "string").length("0")];
        assert!(errors("acme_posts", &columns).has(Field::Columns, ReasonCode::IllegalLength));

        let columns = vec![ColumnDescriptor::new("total", "decimal")];
        assert!(errors("acme_posts", &columns).has(Field::Columns, ReasonCode::IllegalLength));
    }

    #[test]
    fn test_invalid_column_name() {
        let columns = vec![ColumnDescriptor::new("Title", "string")];
        assert!(errors("acme_posts", &columns).has(Field::Columns, ReasonCode::InvalidColumnName));
    }

    #[test]
    fn test_empty_columns() {
        assert!(errors("acme_posts", &[]).has(Field::Columns, ReasonCode::EmptyColumns));
    }

    #[test]
    fn test_table_name_rules() {
        let columns = vec![id_column()];

        let errors_foo = errors("foo_widgets", &columns);
        assert!(errors_foo.has(Field::Name, ReasonCode::InvalidPrefix));
        assert!(!errors_foo.has(Field::Name, ReasonCode::InvalidName));
        assert_eq!(
            errors_foo.get(Field::Name)[0].expected_prefix.as_deref(),
            Some("acme_")
        );

        assert!(errors("Acme_Widgets", &columns).has(Field::Name, ReasonCode::InvalidName));
        assert!(errors("acme_", &columns).has(Field::Name, ReasonCode::InvalidPrefix));
        assert!(errors("acmewidgets", &columns).has(Field::Name, ReasonCode::InvalidPrefix));
    }

    #[test]
    fn test_aggregates_all_violations() {
        let columns = vec![
            ColumnDescriptor::new("slug", "string"),
            ColumnDescriptor::new("slug", "string").length("70000"),
        ];
        let errors = errors("foo_widgets", &columns);
        assert!(errors.has(Field::Name, ReasonCode::InvalidPrefix));
        assert!(errors.has(Field::Columns, ReasonCode::DuplicateColumn));
        assert!(errors.has(Field::Columns, ReasonCode::IllegalLength));
    }

    #[test]
    fn test_empty_prefix_fails_closed() {
        let result = SchemaValidator::new().validate("acme_posts", &[id_column()], " ");
        assert!(matches!(result, Err(TableError::Configuration(_))));
    }

    #[test]
    fn test_validate_name_only() {
        let validator = SchemaValidator::new();
        assert!(validator.validate_name("acme_posts", "acme").is_ok());
        assert!(validator.validate_name("posts", "acme").is_err());
    }
}
