//! Catalog access.
//!
//! [`CatalogSource`] is the query surface the differ needs from a database.
//! [`PgCatalog`] implements it over sqlx; tests use in-memory sources.
//!
//! The helpers in this module apply the failure policy:
//! - failing to list tables is fatal
//! - failing to list a table's columns skips that table
//! - failing to look up a primary key is logged and treated as "no key"
//! - failing to list indexes skips index processing for that table

mod postgres;

pub use postgres::PgCatalog;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::{MetadataKind, Result, SchemaDiffError, SchemaRole};
use crate::snapshot::{
    ColumnDescriptor, IndexDescriptor, SchemaSnapshot, SkippedMetadata, TableSnapshot,
};

/// A query-capable handle on one schema.
#[allow(async_fn_in_trait)]
pub trait CatalogSource {
    /// Table names in the schema, in a stable order.
    async fn list_tables(&self) -> std::result::Result<Vec<String>, sqlx::Error>;

    /// Columns of a table in ordinal order.
    async fn list_columns(&self, table: &str) -> std::result::Result<Vec<ColumnDescriptor>, sqlx::Error>;

    /// Primary key columns in key order. `Ok(None)` means the table has no
    /// primary key, which is not an error.
    async fn primary_key(&self, table: &str) -> std::result::Result<Option<Vec<String>>, sqlx::Error>;

    /// Index names and definitions, including the primary-key index.
    async fn list_indexes(&self, table: &str) -> std::result::Result<Vec<IndexDescriptor>, sqlx::Error>;
}

/// Result of reading one table: the snapshot plus any non-fatal failures.
#[derive(Debug)]
pub struct TableFetch {
    pub table: TableSnapshot,
    pub errors: Vec<SchemaDiffError>,
}

/// List all tables, failing the run if the catalog cannot be read.
pub async fn list_tables<S: CatalogSource>(source: &S, role: SchemaRole) -> Result<Vec<String>> {
    let tables = source
        .list_tables()
        .await
        .map_err(|source| SchemaDiffError::CatalogList { role, source })?;
    debug!("Listed {} tables in {} schema", tables.len(), role);
    Ok(tables)
}

/// Read columns, primary key and indexes of one table.
///
/// Returns `Err` only when the columns cannot be read; primary key and
/// index failures are reported through [`TableFetch::errors`].
pub async fn fetch_table<S: CatalogSource>(source: &S, name: &str) -> Result<TableFetch> {
    let columns = source
        .list_columns(name)
        .await
        .map_err(|e| SchemaDiffError::metadata(name, MetadataKind::Columns, e))?;

    let mut errors = Vec::new();

    let primary_key = match source.primary_key(name).await {
        Ok(Some(cols)) if !cols.is_empty() => Some(cols),
        Ok(_) => {
            info!("Table {} has no primary key", name);
            None
        }
        Err(e) => {
            errors.push(SchemaDiffError::metadata(name, MetadataKind::PrimaryKey, e));
            None
        }
    };

    let indexes: Option<BTreeMap<String, String>> = match source.list_indexes(name).await {
        Ok(list) => Some(
            list.into_iter()
                .map(|idx| (idx.name, idx.definition))
                .collect(),
        ),
        Err(e) => {
            errors.push(SchemaDiffError::metadata(name, MetadataKind::Indexes, e));
            None
        }
    };

    debug!(
        "Loaded {} columns for {} (primary key: {:?})",
        columns.len(),
        name,
        primary_key
    );

    Ok(TableFetch {
        table: TableSnapshot {
            name: name.to_string(),
            columns,
            primary_key,
            indexes,
        },
        errors,
    })
}

/// Build a snapshot of `table_names`, reading metadata only for `wanted`.
///
/// Per-table failures are logged and recorded in [`SchemaSnapshot::skipped`].
pub async fn fetch_schema<S: CatalogSource>(
    source: &S,
    role: SchemaRole,
    table_names: Vec<String>,
    wanted: &[String],
) -> SchemaSnapshot {
    let mut snapshot = SchemaSnapshot {
        table_names,
        ..SchemaSnapshot::default()
    };

    for name in wanted {
        match fetch_table(source, name).await {
            Ok(fetch) => {
                for err in fetch.errors {
                    record_skip(&mut snapshot, role, err);
                }
                snapshot.tables.insert(name.clone(), fetch.table);
            }
            Err(err) => record_skip(&mut snapshot, role, err),
        }
    }

    snapshot
}

fn record_skip(snapshot: &mut SchemaSnapshot, role: SchemaRole, err: SchemaDiffError) {
    warn!("{} schema: {}", role, err);
    if let SchemaDiffError::MetadataFetch { table, kind, source } = err {
        snapshot.skipped.push(SkippedMetadata {
            role,
            table,
            kind,
            reason: source.to_string(),
        });
    }
}
