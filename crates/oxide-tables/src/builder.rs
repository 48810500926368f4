//! Schema building.
//!
//! Turns caller-supplied column descriptors into a canonical [`TableSchema`],
//! and converts between canonical schemas and the physical representation
//! reported by introspection.

use tracing::warn;

use crate::error::{Result, TableError};
use crate::inspector::{PhysicalColumn, PhysicalTable};
use crate::schema::{Column, ColumnDescriptor, TableSchema};
use crate::types::{ColumnLength, ColumnType, LengthDomain};

/// Builds canonical table schemas.
#[derive(Debug, Default)]
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Builds the target schema from `columns`, keeping their order.
    ///
    /// This does not enforce table-level rules; run the validator first. It
    /// fails fast on the first column whose type or length cannot be parsed.
    pub fn build(&self, name: &str, columns: &[ColumnDescriptor]) -> Result<TableSchema> {
        let columns = columns
            .iter()
            .map(|c| self.build_column(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(TableSchema {
            name: name.to_string(),
            columns,
        })
    }

    /// Builds one canonical column. A missing length takes the type's default.
    pub fn build_column(&self, descriptor: &ColumnDescriptor) -> Result<Column> {
        let constraint = |source| TableError::TypeConstraint {
            column: descriptor.name.clone(),
            source,
        };
        let column_type: ColumnType = descriptor.column_type.parse().map_err(constraint)?;
        let length = column_type
            .validate_length(descriptor.length.as_deref())
            .map_err(constraint)?
            .or_else(|| column_type.default_length());

        Ok(Column {
            id: descriptor.effective_id().to_string(),
            name: descriptor.name.clone(),
            column_type,
            length,
            unsigned: descriptor.unsigned,
            allow_null: descriptor.allow_null,
            auto_increment: descriptor.auto_increment,
            primary_key: descriptor.primary_key,
            default: descriptor.default.clone(),
        })
    }

    /// Translates an introspected table into a schema whose column ids equal
    /// their names.
    pub fn from_introspected(&self, physical: &PhysicalTable) -> Result<TableSchema> {
        let columns = physical
            .columns
            .iter()
            .map(|c| self.column_from_physical(physical, c))
            .collect::<Result<Vec<_>>>()?;
        Ok(TableSchema {
            name: physical.name.clone(),
            columns,
        })
    }

    fn column_from_physical(
        &self,
        table: &PhysicalTable,
        physical: &PhysicalColumn,
    ) -> Result<Column> {
        let column_type = ColumnType::from_physical(&physical.type_name).ok_or_else(|| {
            TableError::UnsupportedPhysicalType {
                table: table.name.clone(),
                column: physical.name.clone(),
                type_name: physical.type_name.clone(),
            }
        })?;

        let length = match column_type.length_domain() {
            LengthDomain::None => None,
            LengthDomain::Chars { default, .. } => {
                Some(ColumnLength::Chars(physical.length.unwrap_or(default)))
            }
            LengthDomain::Precision { .. } => physical.precision.map(|precision| {
                ColumnLength::Precision {
                    precision,
                    scale: physical.scale.unwrap_or(0),
                }
            }),
        };

        let integer = column_type.is_integer();
        if !integer && (physical.unsigned || physical.auto_increment) {
            warn!(
                table = %table.name,
                column = %physical.name,
                "ignoring unsigned/auto-increment on a non-integer column"
            );
        }

        Ok(Column {
            id: physical.name.clone(),
            name: physical.name.clone(),
            column_type,
            length,
            unsigned: integer && physical.unsigned,
            allow_null: physical.nullable,
            auto_increment: integer && physical.auto_increment,
            primary_key: table.primary_key.contains(&physical.name),
            default: physical.default.clone(),
        })
    }

    /// Translates a schema into its physical representation.
    #[must_use]
    pub fn to_physical(&self, schema: &TableSchema) -> PhysicalTable {
        let columns = schema
            .columns
            .iter()
            .map(|column| {
                let (length, precision, scale) = match column.length {
                    Some(ColumnLength::Chars(n)) => (Some(n), None, None),
                    Some(ColumnLength::Precision { precision, scale }) => {
                        (None, Some(precision), Some(scale))
                    }
                    None => (None, None, None),
                };
                PhysicalColumn {
                    name: column.name.clone(),
                    type_name: column.column_type.physical_name().to_string(),
                    length,
                    precision,
                    scale,
                    nullable: column.allow_null,
                    auto_increment: column.auto_increment,
                    unsigned: column.unsigned,
                    default: column.default.clone(),
                }
            })
            .collect();

        PhysicalTable {
            name: schema.name.clone(),
            columns,
            primary_key: schema.primary_key_names(),
        }
    }
}
