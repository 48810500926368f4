//! Migration code generation.
//!
//! Renders diff instructions as Rust source implementing the
//! [`TableMigration`](crate::TableMigration) trait, with `up()` applying the
//! change and `down()` reverting it.

use std::fmt::Write as _;

use serde::Serialize;

use crate::diff::SchemaDiffer;
use crate::operations::{ColumnChanges, DiffInstruction};
use crate::schema::{Column, TableSchema};
use crate::types::ColumnLength;

/// What a generated migration does to its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationKind {
    /// The table is created.
    Create,
    /// The table is altered.
    Update,
    /// The table is dropped.
    Drop,
}

impl MigrationKind {
    /// Returns the verb used in struct and file names.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Drop => "drop",
        }
    }

    /// Returns the artifact description for `table`.
    #[must_use]
    pub fn describe(self, table: &str) -> String {
        match self {
            Self::Create => format!("Created table {table}"),
            Self::Update => format!("Updated table {table}"),
            Self::Drop => format!("Dropped table {table}"),
        }
    }
}

/// Source code for one table migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMigration {
    /// Table the migration applies to.
    pub table: String,
    /// What the migration does.
    pub kind: MigrationKind,
    /// Name of the generated struct, e.g. `TableCreateAcmePosts`.
    pub struct_name: String,
    /// Snake-case file stem, e.g. `table_create_acme_posts`.
    pub migration_name: String,
    /// Instructions returned by `up()`.
    pub up: Vec<DiffInstruction>,
    /// Instructions returned by `down()`.
    pub down: Vec<DiffInstruction>,
    /// The rendered Rust source.
    pub code: String,
}

/// Result of comparing a target table against the existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationCode {
    /// The tables differ; here is the migration.
    Changes(GeneratedMigration),
    /// The tables already agree.
    NoChanges,
}

impl MigrationCode {
    /// Returns true when there is nothing to migrate.
    #[must_use]
    pub fn is_no_changes(&self) -> bool {
        matches!(self, Self::NoChanges)
    }
}

/// Diffs schemas and renders the result as migration source.
#[derive(Debug, Default)]
pub struct CodeGenerator {
    differ: SchemaDiffer,
}

impl CodeGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a create or update migration for `target`.
    #[must_use]
    pub fn generate(&self, target: &TableSchema, existing: Option<&TableSchema>) -> MigrationCode {
        let up = self.differ.diff(target, existing);
        if up.is_empty() {
            return MigrationCode::NoChanges;
        }

        let (kind, down) = match existing {
            None => (
                MigrationKind::Create,
                vec![DiffInstruction::drop_table(target.name.clone())],
            ),
            Some(existing) => (
                MigrationKind::Update,
                self.differ.diff(existing, Some(target)),
            ),
        };
        MigrationCode::Changes(assemble(&target.name, kind, up, down))
    }

    /// Generates a migration dropping `existing`; `down()` recreates it.
    #[must_use]
    pub fn generate_drop(&self, existing: &TableSchema) -> GeneratedMigration {
        let up = vec![DiffInstruction::drop_table(existing.name.clone())];
        let down = self.differ.diff(existing, None);
        assemble(&existing.name, MigrationKind::Drop, up, down)
    }
}

fn assemble(
    table: &str,
    kind: MigrationKind,
    up: Vec<DiffInstruction>,
    down: Vec<DiffInstruction>,
) -> GeneratedMigration {
    let verb = kind.verb();
    let struct_name = format!("Table{}{}", studly(verb), studly(table));
    let migration_name = format!("table_{verb}_{table}");
    let code = render_migration(&struct_name, table, &up, &down);
    GeneratedMigration {
        table: table.to_string(),
        kind,
        struct_name,
        migration_name,
        up,
        down,
        code,
    }
}

/// Renders a complete migration source file.
#[must_use]
pub fn render_migration(
    struct_name: &str,
    table: &str,
    up: &[DiffInstruction],
    down: &[DiffInstruction],
) -> String {
    let up_body = render_instructions(up);
    let down_body = render_instructions(down);
    let table = quote(table);

    format!(
        "use oxide_tables::prelude::*;\n\
         \n\
         pub struct {struct_name};\n\
         \n\
         impl TableMigration for {struct_name} {{\n\
         \x20   const TABLE: &'static str = {table};\n\
         \n\
         \x20   fn up() -> Vec<DiffInstruction> {{\n\
         \x20       vec![\n\
         {up_body}\
         \x20       ]\n\
         \x20   }}\n\
         \n\
         \x20   fn down() -> Vec<DiffInstruction> {{\n\
         \x20       vec![\n\
         {down_body}\
         \x20       ]\n\
         \x20   }}\n\
         }}\n"
    )
}

// ================================================================
// Internal helpers
// ================================================================

/// Converts `acme_blog_posts` into `AcmeBlogPosts`.
fn studly(name: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = true;
    for ch in name.chars() {
        if ch == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(ch.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

/// Renders a Rust string literal.
fn quote(s: &str) -> String {
    format!("{s:?}")
}

fn render_instructions(ops: &[DiffInstruction]) -> String {
    let mut out = String::new();
    for op in ops {
        let _ = writeln!(out, "            {},", render_instruction(op));
    }
    out
}

fn render_instruction(op: &DiffInstruction) -> String {
    match op {
        DiffInstruction::CreateTable { table, columns } => {
            let mut out = format!(
                "DiffInstruction::create_table(\n                {},\n                vec![\n",
                quote(table)
            );
            for column in columns {
                let _ = writeln!(out, "                    {},", render_column(column));
            }
            out.push_str("                ],\n            )");
            out
        }
        DiffInstruction::DropTable { table } => {
            format!("DiffInstruction::drop_table({})", quote(table))
        }
        DiffInstruction::DropPrimaryKey { table, columns } => format!(
            "DiffInstruction::drop_primary_key({}, {})",
            quote(table),
            render_names(columns)
        ),
        DiffInstruction::AddColumn { table, column } => format!(
            "DiffInstruction::add_column({}, {})",
            quote(table),
            render_column(column)
        ),
        DiffInstruction::ModifyColumn {
            table,
            column,
            column_type,
            length,
            changes,
        } => format!(
            "DiffInstruction::modify_column({}, {}, ColumnType::{}, {}, {})",
            quote(table),
            quote(column),
            column_type.variant_name(),
            render_optional_length(length.as_ref()),
            render_changes(changes)
        ),
        DiffInstruction::DropColumn { table, column } => format!(
            "DiffInstruction::drop_column({}, {})",
            quote(table),
            quote(column)
        ),
        DiffInstruction::AddPrimaryKey { table, columns } => format!(
            "DiffInstruction::add_primary_key({}, {})",
            quote(table),
            render_names(columns)
        ),
    }
}

fn render_column(column: &Column) -> String {
    let mut out = format!(
        "Column::new({}, ColumnType::{})",
        quote(&column.name),
        column.column_type.variant_name()
    );
    if column.id != column.name {
        let _ = write!(out, ".id({})", quote(&column.id));
    }
    if let Some(length) = &column.length {
        let _ = write!(out, ".length({})", render_length(length));
    }
    if column.unsigned {
        out.push_str(".unsigned()");
    }
    if column.allow_null {
        out.push_str(".nullable()");
    }
    if column.auto_increment {
        out.push_str(".auto_increment()");
    }
    if column.primary_key {
        out.push_str(".primary_key()");
    }
    if let Some(default) = &column.default {
        let _ = write!(out, ".default_value({})", quote(default));
    }
    out
}

fn render_length(length: &ColumnLength) -> String {
    match length {
        ColumnLength::Chars(n) => format!("ColumnLength::Chars({n})"),
        ColumnLength::Precision { precision, scale } => {
            format!("ColumnLength::Precision {{ precision: {precision}, scale: {scale} }}")
        }
    }
}

fn render_optional_length(length: Option<&ColumnLength>) -> String {
    length.map_or_else(|| "None".to_string(), |l| format!("Some({})", render_length(l)))
}

fn render_changes(changes: &ColumnChanges) -> String {
    let mut out = String::from("ColumnChanges::new()");
    if let Some(name) = &changes.name {
        let _ = write!(out, ".rename_to({})", quote(name));
    }
    if let Some(column_type) = changes.column_type {
        let _ = write!(out, ".set_type(ColumnType::{})", column_type.variant_name());
    }
    if let Some(length) = &changes.length {
        let _ = write!(out, ".set_length({})", render_optional_length(length.as_ref()));
    }
    if let Some(unsigned) = changes.unsigned {
        let _ = write!(out, ".set_unsigned({unsigned})");
    }
    if let Some(allow_null) = changes.allow_null {
        let _ = write!(out, ".set_nullable({allow_null})");
    }
    if let Some(auto_increment) = changes.auto_increment {
        let _ = write!(out, ".set_auto_increment({auto_increment})");
    }
    if let Some(default) = &changes.default {
        match default {
            Some(value) => {
                let _ = write!(out, ".set_default(Some({}.to_string()))", quote(value));
            }
            None => out.push_str(".set_default(None)"),
        }
    }
    out
}

fn render_names(names: &[String]) -> String {
    let items: Vec<String> = names
        .iter()
        .map(|n| format!("{}.to_string()", quote(n)))
        .collect();
    format!("vec![{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    fn posts() -> TableSchema {
        TableSchema::new("acme_posts")
            .column(
                Column::new("id", ColumnType::Integer)
                    .unsigned()
                    .auto_increment()
                    .primary_key(),
            )
            .column(Column::new("title", ColumnType::String).length(ColumnLength::Chars(191)))
    }

    #[test]
    fn test_studly() {
        assert_eq!(studly("acme_blog_posts"), "AcmeBlogPosts");
        assert_eq!(studly("create"), "Create");
    }

    #[test]
    fn test_generate_create() {
        let code = CodeGenerator::new().generate(&posts(), None);
        let MigrationCode::Changes(migration) = code else {
            panic!("Expected changes");
        };

        assert_eq!(migration.kind, MigrationKind::Create);
        assert_eq!(migration.struct_name, "TableCreateAcmePosts");
        assert_eq!(migration.migration_name, "table_create_acme_posts");
        assert_eq!(migration.down, vec![DiffInstruction::drop_table("acme_posts")]);

        let expected = "\
use oxide_tables::prelude::*;

pub struct TableCreateAcmePosts;

impl TableMigration for TableCreateAcmePosts {
    const TABLE: &'static str = \"acme_posts\";

    fn up() -> Vec<DiffInstruction> {
        vec![
            DiffInstruction::create_table(
                \"acme_posts\",
                vec![
                    Column::new(\"id\", ColumnType::Integer).unsigned().auto_increment().primary_key(),
                    Column::new(\"title\", ColumnType::String).length(ColumnLength::Chars(191)),
                ],
            ),
        ]
    }

    fn down() -> Vec<DiffInstruction> {
        vec![
            DiffInstruction::drop_table(\"acme_posts\"),
        ]
    }
}
";
        assert_eq!(migration.code, expected);
    }

    #[test]
    fn test_generate_update_with_reverse() {
        let existing = TableSchema::new("acme_posts").column(
            Column::new("id", ColumnType::Integer)
                .unsigned()
                .auto_increment()
                .primary_key(),
        );

        let MigrationCode::Changes(migration) =
            CodeGenerator::new().generate(&posts(), Some(&existing))
        else {
            panic!("Expected changes");
        };

        assert_eq!(migration.kind, MigrationKind::Update);
        assert_eq!(migration.struct_name, "TableUpdateAcmePosts");
        assert_eq!(migration.down, vec![DiffInstruction::drop_column("acme_posts", "title")]);
        assert!(migration.code.contains(
            "DiffInstruction::add_column(\"acme_posts\", Column::new(\"title\", ColumnType::String).length(ColumnLength::Chars(191))),"
        ));
        assert!(migration
            .code
            .contains("DiffInstruction::drop_column(\"acme_posts\", \"title\"),"));
    }

    #[test]
    fn test_render_modify_changes() {
        let op = DiffInstruction::modify_column(
            "acme_posts",
            "title",
            ColumnType::String,
            Some(ColumnLength::Chars(100)),
            ColumnChanges::new()
                .rename_to("headline")
                .set_length(Some(ColumnLength::Chars(100)))
                .set_default(Some("it's \"new\"".to_string())),
        );

        assert_eq!(
            render_instruction(&op),
            "DiffInstruction::modify_column(\"acme_posts\", \"title\", ColumnType::String, \
             Some(ColumnLength::Chars(100)), ColumnChanges::new().rename_to(\"headline\")\
             .set_length(Some(ColumnLength::Chars(100)))\
             .set_default(Some(\"it's \\\"new\\\"\".to_string())))"
        );
    }

    #[test]
    fn test_no_changes() {
        let schema = posts();
        assert!(CodeGenerator::new()
            .generate(&schema, Some(&schema))
            .is_no_changes());
    }

    #[test]
    fn test_generate_drop() {
        let migration = CodeGenerator::new().generate_drop(&posts());
        assert_eq!(migration.kind, MigrationKind::Drop);
        assert_eq!(migration.struct_name, "TableDropAcmePosts");
        assert_eq!(migration.up, vec![DiffInstruction::drop_table("acme_posts")]);
        assert!(matches!(
            migration.down.as_slice(),
            [DiffInstruction::CreateTable { columns, .. }] if columns.len() == 2
        ));
    }

    #[test]
    fn test_deterministic_code() {
        let existing = TableSchema::new("acme_posts")
            .column(Column::new("id", ColumnType::BigInteger).primary_key())
            .column(Column::new("body", ColumnType::Text));
        let first = CodeGenerator::new().generate(&posts(), Some(&existing));
        let second = CodeGenerator::new().generate(&posts(), Some(&existing));
        assert_eq!(first, second);
    }
}
