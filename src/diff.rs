//! Schema diffing - compare two schema snapshots.
//!
//! Tables are partitioned into create / drop / unchanged. Unchanged tables
//! are compared column by column and index by index:
//!
//! - a column present only in the new schema is added, one present only in
//!   the old schema is dropped, and a column whose type, nullability,
//!   default or length differs gets a single combined alteration
//! - an index present only on one side is created or dropped, and an index
//!   whose definition changed is dropped and recreated (there is no in-place
//!   ALTER INDEX for definitions)
//! - the index backing the primary key is never diffed; it follows the
//!   PRIMARY KEY clause of the table
//!
//! Index definitions are compared with whitespace collapsed so that purely
//! cosmetic catalog differences do not churn indexes.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::snapshot::{
    ColumnDescriptor, IndexDescriptor, SchemaSnapshot, TableSnapshot, is_primary_key_index,
};

/// Table names partitioned by what happens to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePlan {
    /// In the new schema only, in new catalog order.
    pub create: Vec<String>,
    /// In the old schema only, in old catalog order.
    pub drop: Vec<String>,
    /// In both schemas, in old catalog order.
    pub unchanged: Vec<String>,
}

impl TablePlan {
    pub fn classify(old: &[String], new: &[String]) -> Self {
        let old_set: HashSet<&str> = old.iter().map(String::as_str).collect();
        let new_set: HashSet<&str> = new.iter().map(String::as_str).collect();

        let create = new
            .iter()
            .filter(|t| !old_set.contains(t.as_str()))
            .cloned()
            .collect();

        let (unchanged, drop) = old
            .iter()
            .cloned()
            .partition(|t| new_set.contains(t.as_str()));

        Self {
            create,
            drop,
            unchanged,
        }
    }
}

/// A column whose shape changed. Holds the new descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAlteration {
    pub column: ColumnDescriptor,
    pub length_changed: bool,
}

/// Column and index changes for one table present in both schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChanges {
    pub table: String,
    pub columns_to_create: Vec<ColumnDescriptor>,
    pub columns_to_drop: Vec<ColumnDescriptor>,
    pub alterations: Vec<ColumnAlteration>,
    pub indexes_to_drop: Vec<String>,
    pub indexes_to_create: Vec<IndexDescriptor>,
}

impl TableChanges {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns_to_create: Vec::new(),
            columns_to_drop: Vec::new(),
            alterations: Vec::new(),
            indexes_to_drop: Vec::new(),
            indexes_to_create: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns_to_create.is_empty()
            && self.columns_to_drop.is_empty()
            && self.alterations.is_empty()
            && self.indexes_to_drop.is_empty()
            && self.indexes_to_create.is_empty()
    }
}

/// The classified difference between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub tables_to_create: Vec<TableSnapshot>,
    pub tables_to_drop: Vec<String>,
    /// Only tables with at least one change.
    pub table_changes: Vec<TableChanges>,
}

impl ChangeSet {
    /// Returns true if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.tables_to_create.is_empty()
            && self.tables_to_drop.is_empty()
            && self.table_changes.is_empty()
    }
}

/// Compare two snapshots.
///
/// Tables whose metadata is missing from either snapshot (because fetching
/// it failed) are left out rather than treated as created or dropped.
pub fn diff_schemas(old: &SchemaSnapshot, new: &SchemaSnapshot) -> ChangeSet {
    let plan = TablePlan::classify(&old.table_names, &new.table_names);
    let mut changes = ChangeSet {
        tables_to_drop: plan.drop,
        ..ChangeSet::default()
    };

    for name in &plan.create {
        match new.get_table(name) {
            Some(table) => changes.tables_to_create.push(table.clone()),
            None => debug!("Skipping creation of {}: no metadata", name),
        }
    }

    for name in &plan.unchanged {
        let (Some(old_table), Some(new_table)) = (old.get_table(name), new.get_table(name)) else {
            debug!("Skipping comparison of {}: no metadata", name);
            continue;
        };
        let table_changes = diff_table(old_table, new_table);
        if !table_changes.is_empty() {
            changes.table_changes.push(table_changes);
        }
    }

    changes
}

/// Compare columns and indexes of one table.
pub fn diff_table(old: &TableSnapshot, new: &TableSnapshot) -> TableChanges {
    let mut changes = TableChanges::new(&new.name);
    diff_columns(old, new, &mut changes);

    match (&old.indexes, &new.indexes) {
        (Some(old_idx), Some(new_idx)) => diff_indexes(old_idx, new_idx, &mut changes),
        _ => debug!("Index metadata unavailable for {}, skipping indexes", new.name),
    }

    changes
}

fn diff_columns(old: &TableSnapshot, new: &TableSnapshot, changes: &mut TableChanges) {
    let old_cols: BTreeMap<&str, &ColumnDescriptor> =
        old.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let new_cols: BTreeMap<&str, &ColumnDescriptor> =
        new.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    for col in &new.columns {
        match old_cols.get(col.name.as_str()) {
            None => changes.columns_to_create.push(col.clone()),
            Some(prev) if !col.same_shape(prev) => changes.alterations.push(ColumnAlteration {
                column: col.clone(),
                length_changed: col.max_length != prev.max_length,
            }),
            Some(_) => {}
        }
    }

    changes.columns_to_drop = old
        .columns
        .iter()
        .filter(|c| !new_cols.contains_key(c.name.as_str()))
        .cloned()
        .collect();
}

fn diff_indexes(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
    changes: &mut TableChanges,
) {
    for (name, old_def) in old {
        if is_primary_key_index(name) {
            continue;
        }
        match new.get(name) {
            None => changes.indexes_to_drop.push(name.clone()),
            Some(new_def) if normalize_definition(new_def) != normalize_definition(old_def) => {
                changes.indexes_to_drop.push(name.clone());
                changes
                    .indexes_to_create
                    .push(IndexDescriptor::new(name.clone(), new_def.clone()));
            }
            Some(_) => {}
        }
    }

    for (name, new_def) in new {
        if !old.contains_key(name) && !is_primary_key_index(name) {
            changes
                .indexes_to_create
                .push(IndexDescriptor::new(name.clone(), new_def.clone()));
        }
    }
}

/// Collapse whitespace runs so cosmetic differences compare equal.
pub fn normalize_definition(def: &str) -> String {
    def.split_whitespace().collect::<Vec<_>>().join(" ")
}
