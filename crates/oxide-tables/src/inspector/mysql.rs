//! MySQL introspection through `information_schema`.
//!
//! The queries are read-only. Text columns are cast to `CHAR` because MySQL 8
//! reports several `information_schema` columns with a binary collation.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::{debug, info};

use super::{InspectorError, MemoryInspector, PhysicalColumn, PhysicalTable};

const TABLES_SQL: &str = r"
SELECT CAST(TABLE_NAME AS CHAR)
FROM information_schema.TABLES
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME LIKE ?
ORDER BY TABLE_NAME
";

const COLUMNS_SQL: &str = r"
SELECT
    CAST(TABLE_NAME AS CHAR),
    CAST(COLUMN_NAME AS CHAR),
    CAST(COLUMN_TYPE AS CHAR),
    CAST(IS_NULLABLE AS CHAR),
    CAST(COLUMN_DEFAULT AS CHAR),
    CAST(COLUMN_KEY AS CHAR),
    CAST(EXTRA AS CHAR)
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME LIKE ?
ORDER BY TABLE_NAME, ORDINAL_POSITION
";

static COLUMN_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-z]+)\s*(?:\(([^)]*)\))?\s*(unsigned)?")
        .expect("column type pattern is valid")
});

/// One row of `information_schema.COLUMNS`.
type ColumnRow = (String, String, String, String, Option<String>, String, String);

/// Captures schema snapshots from a MySQL database.
#[derive(Debug, Clone)]
pub struct MySqlInspector {
    pool: MySqlPool,
}

impl MySqlInspector {
    /// Creates an inspector over an existing pool.
    #[must_use]
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connects to `url`.
    pub async fn connect(url: &str) -> Result<Self, InspectorError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Reads every table starting with `prefix` into an in-memory snapshot.
    pub async fn snapshot(&self, prefix: &str) -> Result<MemoryInspector, InspectorError> {
        let pattern = like_prefix(prefix);

        let names: Vec<(String,)> = sqlx::query_as(TABLES_SQL)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;
        let rows: Vec<ColumnRow> = sqlx::query_as(COLUMNS_SQL)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;

        let mut tables: BTreeMap<String, PhysicalTable> = names
            .into_iter()
            .map(|(name,)| {
                let table = PhysicalTable {
                    name: name.clone(),
                    columns: Vec::new(),
                    primary_key: Vec::new(),
                };
                (name, table)
            })
            .collect();

        for row in rows {
            let (table_name, column_name, column_type, is_nullable, default, key, extra) = row;
            // Views share information_schema.COLUMNS; skip them.
            let Some(table) = tables.get_mut(&table_name) else {
                continue;
            };
            if key == "PRI" {
                table.primary_key.push(column_name.clone());
            }
            table.columns.push(column_from_row(
                &column_name,
                &column_type,
                &is_nullable,
                default.as_deref(),
                &extra,
            ));
        }

        info!(prefix, tables = tables.len(), "captured schema snapshot");
        Ok(MemoryInspector::from_tables(tables.into_values()))
    }
}

/// Parses a MySQL `COLUMN_TYPE` such as `int(10) unsigned`, `varchar(191)`
/// or `decimal(8,2)` into a physical column named `name`.
///
/// Parameters that are not plain numbers (e.g. `enum` members) are ignored.
#[must_use]
pub fn parse_column_type(name: &str, column_type: &str) -> PhysicalColumn {
    let lowered = column_type.to_ascii_lowercase();
    let mut column = PhysicalColumn {
        name: name.to_string(),
        type_name: lowered.trim().to_string(),
        length: None,
        precision: None,
        scale: None,
        nullable: false,
        auto_increment: false,
        unsigned: false,
        default: None,
    };

    let Some(caps) = COLUMN_TYPE.captures(&lowered) else {
        return column;
    };
    column.type_name = caps[1].to_string();
    column.unsigned = caps.get(3).is_some();

    let params: Vec<u32> = caps
        .get(2)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|p| p.trim().parse::<u32>())
                .collect::<Result<Vec<_>, _>>()
                .unwrap_or_default()
        })
        .unwrap_or_default();

    match column.type_name.as_str() {
        "decimal" | "numeric" | "double" | "float" | "real" => {
            column.precision = params.first().and_then(|p| u8::try_from(*p).ok());
            column.scale = params.get(1).and_then(|s| u8::try_from(*s).ok());
        }
        _ => column.length = params.first().copied(),
    }
    column
}

fn column_from_row(
    name: &str,
    column_type: &str,
    is_nullable: &str,
    default: Option<&str>,
    extra: &str,
) -> PhysicalColumn {
    let mut column = parse_column_type(name, column_type);
    column.nullable = is_nullable.eq_ignore_ascii_case("YES");
    column.auto_increment = extra.to_ascii_lowercase().contains("auto_increment");
    column.default = default.and_then(normalize_default);
    debug!(column = name, column_type, "introspected column");
    column
}

/// MariaDB reports defaults as quoted literals and NULL as the text `NULL`;
/// MySQL reports the bare value.
fn normalize_default(raw: &str) -> Option<String> {
    if raw.eq_ignore_ascii_case("NULL") {
        return None;
    }
    let unquoted = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map_or_else(|| raw.to_string(), |s| s.replace("''", "'"));
    Some(unquoted)
}

/// Builds a `LIKE` pattern matching names that start with `prefix`.
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}
