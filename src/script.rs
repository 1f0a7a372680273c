//! Migration script assembly.
//!
//! Statements are emitted in a fixed phase order:
//!
//! 1. created tables, each followed by its secondary indexes
//! 2. dropped tables
//! 3. column alterations
//! 4. added columns
//! 5. dropped columns
//! 6. dropped indexes
//! 7. created indexes
//!
//! An index that is being replaced is therefore always dropped before it is
//! recreated.

use std::fmt;

use crate::diff::ChangeSet;
use crate::sql;

/// The generated DDL, prefixed with a version comment when non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    version: i64,
    statements: Vec<String>,
}

impl MigrationScript {
    /// Render a change set in phase order.
    pub fn assemble(changes: &ChangeSet, version: i64) -> Self {
        let mut statements = Vec::new();

        for table in &changes.tables_to_create {
            statements.push(sql::create_table_sql(table));
            statements.extend(table.secondary_indexes().map(|idx| sql::create_index_sql(&idx)));
        }

        statements.extend(changes.tables_to_drop.iter().map(|t| sql::drop_table_sql(t)));

        for tc in &changes.table_changes {
            statements.extend(tc.alterations.iter().map(|a| sql::alter_column_sql(&tc.table, a)));
        }
        for tc in &changes.table_changes {
            statements.extend(tc.columns_to_create.iter().map(|c| sql::add_column_sql(&tc.table, c)));
        }
        for tc in &changes.table_changes {
            statements.extend(tc.columns_to_drop.iter().map(|c| sql::drop_column_sql(&tc.table, c)));
        }
        for tc in &changes.table_changes {
            statements.extend(tc.indexes_to_drop.iter().map(|i| sql::drop_index_sql(i)));
        }
        for tc in &changes.table_changes {
            statements.extend(tc.indexes_to_create.iter().map(sql::create_index_sql));
        }

        Self {
            version,
            statements,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

/// Version marker for a script generated now: Unix time in seconds.
pub fn current_version() -> i64 {
    chrono::Utc::now().timestamp()
}

impl fmt::Display for MigrationScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        writeln!(f, "--- Migration Version {}", self.version)?;
        for stmt in &self.statements {
            writeln!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ColumnAlteration, TableChanges};
    use crate::snapshot::{ColumnDescriptor, IndexDescriptor, TableSnapshot};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_change_set_renders_nothing() {
        let script = MigrationScript::assemble(&ChangeSet::default(), 1_700_000_000);
        assert!(script.is_empty());
        assert_eq!(script.to_string(), "");
    }

    #[test]
    fn test_phase_order() {
        let changes = ChangeSet {
            tables_to_create: vec![
                TableSnapshot::new("orders")
                    .column(ColumnDescriptor::new("id", "integer").not_null())
                    .primary_key(["id"])
                    .index("orders_pkey", "CREATE UNIQUE INDEX orders_pkey ON public.orders USING btree (id)")
                    .index("idx_orders_id", "CREATE INDEX idx_orders_id ON public.orders USING btree (id)"),
            ],
            tables_to_drop: vec!["legacy".into()],
            table_changes: vec![TableChanges {
                table: "users".into(),
                columns_to_create: vec![ColumnDescriptor::new("email", "text")],
                columns_to_drop: vec![ColumnDescriptor::new("nickname", "text")],
                alterations: vec![ColumnAlteration {
                    column: ColumnDescriptor::new("id", "bigint"),
                    length_changed: false,
                }],
                indexes_to_drop: vec!["idx_users_name".into()],
                indexes_to_create: vec![IndexDescriptor::new(
                    "idx_users_name",
                    "CREATE INDEX idx_users_name ON public.users USING btree (lower(name))",
                )],
            }],
        };

        let script = MigrationScript::assemble(&changes, 42);
        let heads: Vec<&str> = script
            .statements()
            .iter()
            .map(|s| s.split_whitespace().take(2).collect::<Vec<_>>())
            .map(|words| match words.as_slice() {
                ["CREATE", "TABLE"] => "create table",
                ["CREATE", "INDEX"] => "create index",
                ["DROP", "TABLE"] => "drop table",
                ["DROP", "INDEX"] => "drop index",
                _ => "alter",
            })
            .collect();

        assert_eq!(
            heads,
            vec![
                "create table",
                "create index",
                "drop table",
                "alter",
                "alter",
                "alter",
                "drop index",
                "create index",
            ]
        );
        assert!(script.statements()[3].contains("ALTER COLUMN id TYPE bigint"));
        assert!(script.statements()[4].contains("ADD COLUMN email"));
        assert!(script.statements()[5].contains("DROP COLUMN nickname"));
        assert!(script.to_string().starts_with("--- Migration Version 42\n"));
    }
}
