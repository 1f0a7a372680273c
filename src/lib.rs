//! # pg-schema-diff
//!
//! Compare two live PostgreSQL schemas and generate the DDL that converges
//! the current ("old") schema towards the reference ("new") schema.
//!
//! The generated script is printed, never executed.
//!
//! ```ignore
//! use pg_schema_diff::{generate_migration, catalog::PgCatalog, error::SchemaRole};
//!
//! let old = PgCatalog::connect("postgres://localhost/app", "public", SchemaRole::Old).await?;
//! let new = PgCatalog::connect("postgres://localhost/app_dev", "public", SchemaRole::New).await?;
//! let run = generate_migration(&old, &new, pg_schema_diff::script::current_version()).await?;
//! print!("{}", run.script);
//! ```

pub mod catalog;
pub mod config;
pub mod diff;
pub mod error;
pub mod script;
pub mod snapshot;
pub mod sql;

use tracing::info;

use crate::catalog::{CatalogSource, fetch_schema, list_tables};
use crate::diff::{ChangeSet, TablePlan, diff_schemas};
use crate::error::{Result, SchemaRole};
use crate::script::MigrationScript;
use crate::snapshot::SkippedMetadata;

/// Outcome of one diff run.
#[derive(Debug, Clone)]
pub struct MigrationRun {
    pub script: MigrationScript,
    pub changes: ChangeSet,
    /// Metadata that could not be read; the script has gaps for these.
    pub skipped: Vec<SkippedMetadata>,
}

/// Inspect both schemas and build the migration script.
///
/// Fails only when the table list of either schema cannot be read. Every
/// other catalog failure skips the affected table or metadata category.
pub async fn generate_migration<O, N>(old: &O, new: &N, version: i64) -> Result<MigrationRun>
where
    O: CatalogSource,
    N: CatalogSource,
{
    let new_names = list_tables(new, SchemaRole::New).await?;
    let old_names = list_tables(old, SchemaRole::Old).await?;

    let plan = TablePlan::classify(&old_names, &new_names);
    info!(
        "Tables: {} to create, {} to drop, {} to compare",
        plan.create.len(),
        plan.drop.len(),
        plan.unchanged.len()
    );

    let new_wanted: Vec<String> = plan
        .create
        .iter()
        .chain(plan.unchanged.iter())
        .cloned()
        .collect();
    let new_snapshot = fetch_schema(new, SchemaRole::New, new_names, &new_wanted).await;
    let old_snapshot = fetch_schema(old, SchemaRole::Old, old_names, &plan.unchanged).await;

    let changes = diff_schemas(&old_snapshot, &new_snapshot);
    let script = MigrationScript::assemble(&changes, version);

    let mut skipped = new_snapshot.skipped;
    skipped.extend(old_snapshot.skipped);

    Ok(MigrationRun {
        script,
        changes,
        skipped,
    })
}
