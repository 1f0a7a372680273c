//! Schema snapshots.
//!
//! A snapshot is a read-only copy of the catalog metadata of one schema,
//! fetched once per run and never mutated by the differ.
//!
//! ```
//! use pg_schema_diff::snapshot::{ColumnDescriptor, TableSnapshot};
//!
//! let users = TableSnapshot::new("users")
//!     .column(ColumnDescriptor::new("id", "integer").not_null())
//!     .column(ColumnDescriptor::new("name", "character varying").max_length(50))
//!     .primary_key(["id"]);
//!
//! assert_eq!(users.columns.len(), 2);
//! ```

use std::collections::BTreeMap;

use crate::error::{MetadataKind, SchemaRole};

/// The type family that carries a length modifier.
pub const VARCHAR: &str = "character varying";

/// Suffix of the index PostgreSQL creates to back a PRIMARY KEY.
pub const PRIMARY_KEY_INDEX_SUFFIX: &str = "_pkey";

/// Whether an index name follows the PRIMARY KEY backing index convention.
pub fn is_primary_key_index(name: &str) -> bool {
    name.ends_with(PRIMARY_KEY_INDEX_SUFFIX)
}

/// Catalog-visible shape of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<i32>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            max_length: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn max_length(mut self, len: i32) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Compare everything except the name.
    pub fn same_shape(&self, other: &ColumnDescriptor) -> bool {
        self.data_type == other.data_type
            && self.nullable == other.nullable
            && self.default == other.default
            && self.max_length == other.max_length
    }

    pub fn is_varchar(&self) -> bool {
        self.data_type == VARCHAR
    }
}

/// An index as reported by `pg_indexes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    pub definition: String,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }

    /// Whether this is the implicit index backing a PRIMARY KEY.
    pub fn is_primary_key(&self) -> bool {
        is_primary_key_index(&self.name)
    }
}

/// Metadata of one table in one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub name: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnDescriptor>,
    /// Primary key columns in key order, `None` when the table has none
    /// or the lookup failed.
    pub primary_key: Option<Vec<String>>,
    /// Index name -> definition. `None` when the index listing failed, in
    /// which case index diffing is skipped for the table.
    pub indexes: Option<BTreeMap<String, String>>,
}

impl TableSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Some(BTreeMap::new()),
        }
    }

    pub fn column(mut self, col: ColumnDescriptor) -> Self {
        self.columns.push(col);
        self
    }

    pub fn primary_key<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = Some(cols.into_iter().map(Into::into).collect());
        self
    }

    pub fn index(mut self, name: impl Into<String>, definition: impl Into<String>) -> Self {
        self.indexes
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), definition.into());
        self
    }

    /// Indexes that are not the primary-key backing index, in name order.
    pub fn secondary_indexes(&self) -> impl Iterator<Item = IndexDescriptor> + '_ {
        self.indexes
            .iter()
            .flatten()
            .map(|(name, def)| IndexDescriptor::new(name.clone(), def.clone()))
            .filter(|idx| !idx.is_primary_key())
    }
}

/// A unit of metadata that could not be fetched and was left out of the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMetadata {
    pub role: SchemaRole,
    pub table: String,
    pub kind: MetadataKind,
    pub reason: String,
}

/// All metadata fetched from one schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    /// Every table in the schema, in catalog order.
    pub table_names: Vec<String>,
    /// Tables whose metadata was fetched. A name listed in `table_names` but
    /// missing here was either not needed or could not be read.
    pub tables: BTreeMap<String, TableSnapshot>,
    pub skipped: Vec<SkippedMetadata>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table and its metadata.
    pub fn add_table(&mut self, table: TableSnapshot) {
        if !self.table_names.contains(&table.name) {
            self.table_names.push(table.name.clone());
        }
        self.tables.insert(table.name.clone(), table);
    }

    pub fn with_table(mut self, table: TableSnapshot) -> Self {
        self.add_table(table);
        self
    }

    pub fn get_table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_shape_ignores_name() {
        let a = ColumnDescriptor::new("a", "integer").not_null();
        let b = ColumnDescriptor::new("b", "integer").not_null();
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&b.clone().default("0")));
    }

    #[test]
    fn test_secondary_indexes_skip_pkey() {
        let t = TableSnapshot::new("users")
            .index("users_pkey", "CREATE UNIQUE INDEX users_pkey ON public.users USING btree (id)")
            .index("idx_users_email", "CREATE INDEX idx_users_email ON public.users USING btree (email)");
        let names: Vec<String> = t.secondary_indexes().map(|i| i.name).collect();
        assert_eq!(names, vec!["idx_users_email".to_string()]);
    }

    #[test]
    fn test_primary_key_index_convention() {
        assert!(is_primary_key_index("users_pkey"));
        assert!(!is_primary_key_index("users_pkey_idx"));
        assert!(IndexDescriptor::new("orders_pkey", "").is_primary_key());
    }

    #[test]
    fn test_add_table_keeps_names_unique() {
        let mut schema = SchemaSnapshot::new();
        schema.add_table(TableSnapshot::new("users"));
        schema.add_table(TableSnapshot::new("users"));
        assert_eq!(schema.table_names, vec!["users".to_string()]);
    }
}
