//! Schema differ.
//!
//! This module compares a target table against the existing one (if any) and
//! produces the instructions needed to turn the existing table into the
//! target. Columns are matched by their stable id, so a renamed column becomes
//! a single modify instruction rather than a drop and an add.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::operations::{ColumnChanges, DiffInstruction};
use crate::schema::{Column, TableSchema};

/// Compares table schemas.
#[derive(Debug, Default)]
pub struct SchemaDiffer;

impl SchemaDiffer {
    /// Creates a differ.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the instructions turning `existing` into `target`.
    ///
    /// With no existing table this is a single create instruction. Otherwise
    /// instructions come in a fixed order: drop key, add columns, modify
    /// columns, drop columns, add key. Added and modified columns follow target
    /// order; dropped columns follow existing order. An empty result means the
    /// tables already agree.
    #[must_use]
    pub fn diff(
        &self,
        target: &TableSchema,
        existing: Option<&TableSchema>,
    ) -> Vec<DiffInstruction> {
        let Some(existing) = existing else {
            return vec![DiffInstruction::create_table(
                target.name.clone(),
                target.columns.clone(),
            )];
        };

        let table = target.name.as_str();
        let existing_by_id: HashMap<&str, &Column> =
            existing.columns.iter().map(|c| (c.id.as_str(), c)).collect();
        let target_ids: HashSet<&str> = target.columns.iter().map(|c| c.id.as_str()).collect();

        let target_key: HashSet<&str> = target.primary_key().map(|c| c.id.as_str()).collect();
        let existing_key: HashSet<&str> = existing.primary_key().map(|c| c.id.as_str()).collect();
        let key_changed = target_key != existing_key;

        let mut instructions = Vec::new();

        if key_changed && !existing_key.is_empty() {
            instructions.push(DiffInstruction::drop_primary_key(
                table,
                existing.primary_key_names(),
            ));
        }

        for column in &target.columns {
            if !existing_by_id.contains_key(column.id.as_str()) {
                let mut added = column.clone();
                added.primary_key = false;
                instructions.push(DiffInstruction::add_column(table, added));
            }
        }

        for column in &target.columns {
            let Some(current) = existing_by_id.get(column.id.as_str()) else {
                continue;
            };
            let changes = ColumnChanges::between(current, column);
            if !changes.is_empty() {
                instructions.push(DiffInstruction::modify_column(
                    table,
                    current.name.clone(),
                    column.column_type,
                    column.length,
                    changes,
                ));
            }
        }

        for column in &existing.columns {
            if !target_ids.contains(column.id.as_str()) {
                instructions.push(DiffInstruction::drop_column(table, column.name.clone()));
            }
        }

        if key_changed && !target_key.is_empty() {
            instructions.push(DiffInstruction::add_primary_key(
                table,
                target.primary_key_names(),
            ));
        }

        for instruction in &instructions {
            debug!(table, "{}", instruction.description());
        }
        instructions
    }
}
