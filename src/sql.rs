//! DDL rendering.
//!
//! Every statement is rendered with a trailing semicolon. Catalog-provided
//! identifiers go through [`ident`]; index definitions are emitted verbatim
//! as the catalog reported them.

use std::borrow::Cow;

use crate::diff::ColumnAlteration;
use crate::snapshot::{ColumnDescriptor, IndexDescriptor, TableSnapshot};

/// PostgreSQL keywords that cannot be used as bare table or column names.
const RESERVED_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant", "group",
    "having", "ilike", "in", "initially", "inner", "intersect", "into", "is", "isnull",
    "join", "lateral", "leading", "left", "like", "limit", "localtime", "localtimestamp",
    "natural", "not", "notnull", "null", "offset", "on", "only", "or", "order", "outer",
    "overlaps", "placing", "primary", "references", "returning", "right", "select",
    "session_user", "similar", "some", "symmetric", "system_user", "table", "tablesample",
    "then", "to", "trailing", "true", "union", "unique", "user", "using", "variadic",
    "verbose", "when", "where", "window", "with",
];

/// Format an identifier for DDL output.
///
/// Plain lower-case identifiers that are not reserved keywords are emitted
/// as-is. Anything else is double quoted with embedded quotes doubled, so
/// mixed-case names keep their case and `user` becomes `"user"`.
pub fn ident(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
        }
        _ => false,
    };

    if plain && !RESERVED_KEYWORDS.contains(&name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

/// `<type>[(<len>)]`, the length only for character varying columns.
fn column_type(col: &ColumnDescriptor, with_length: bool) -> String {
    match col.max_length {
        Some(len) if with_length && col.is_varchar() => format!("{}({})", col.data_type, len),
        _ => col.data_type.clone(),
    }
}

/// `[ NOT NULL][ DEFAULT <expr>]`
fn column_constraints(col: &ColumnDescriptor) -> String {
    let not_null = if col.nullable { "" } else { " NOT NULL" };
    let default = col
        .default
        .as_ref()
        .map(|d| format!(" DEFAULT {}", d))
        .unwrap_or_default();
    format!("{}{}", not_null, default)
}

/// Column definition as used in CREATE TABLE and ADD COLUMN.
pub fn column_definition(col: &ColumnDescriptor) -> String {
    format!(
        "{} {}{}",
        ident(&col.name),
        column_type(col, true),
        column_constraints(col)
    )
}

pub fn create_table_sql(table: &TableSnapshot) -> String {
    let mut parts: Vec<String> = table.columns.iter().map(column_definition).collect();

    if let Some(pk) = &table.primary_key {
        let cols: Vec<Cow<'_, str>> = pk.iter().map(|c| ident(c)).collect();
        parts.push(format!("PRIMARY KEY({})", cols.join(", ")));
    }

    if parts.is_empty() {
        return format!("CREATE TABLE IF NOT EXISTS {}();", ident(&table.name));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {}(\n\t{}\n);",
        ident(&table.name),
        parts.join(",\n\t")
    )
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {};", ident(table))
}

pub fn add_column_sql(table: &str, col: &ColumnDescriptor) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {};",
        ident(table),
        column_definition(col)
    )
}

pub fn drop_column_sql(table: &str, col: &ColumnDescriptor) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {};",
        ident(table),
        ident(&col.name)
    )
}

/// One combined statement for every attribute change of a column.
///
/// The length modifier is only repeated when the length itself changed.
pub fn alter_column_sql(table: &str, alteration: &ColumnAlteration) -> String {
    let col = &alteration.column;
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {}{};",
        ident(table),
        ident(&col.name),
        column_type(col, alteration.length_changed),
        column_constraints(col)
    )
}

pub fn create_index_sql(index: &IndexDescriptor) -> String {
    format!("{};", index.definition.trim_end().trim_end_matches(';'))
}

pub fn drop_index_sql(name: &str) -> String {
    format!("DROP INDEX {};", ident(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ident() {
        assert_eq!(ident("users"), "users");
        assert_eq!(ident("user_2fa$"), "user_2fa$");
        assert_eq!(ident("Users"), "\"Users\"");
        assert_eq!(ident("order items"), "\"order items\"");
        assert_eq!(ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(ident("1st"), "\"1st\"");
    }

    #[test]
    fn test_reserved_words_are_quoted() {
        assert_eq!(ident("user"), "\"user\"");
        assert_eq!(ident("order"), "\"order\"");
        assert_eq!(ident("username"), "username");
        assert_eq!(drop_table_sql("user"), "DROP TABLE IF EXISTS \"user\";");

        let table = TableSnapshot::new("order")
            .column(ColumnDescriptor::new("group", "integer"))
            .primary_key(["group"]);
        assert_eq!(
            create_table_sql(&table),
            "CREATE TABLE IF NOT EXISTS \"order\"(\n\t\"group\" integer,\n\tPRIMARY KEY(\"group\")\n);"
        );
        assert_eq!(drop_index_sql("desc"), "DROP INDEX \"desc\";");
    }

    #[test]
    fn test_create_table() {
        let table = TableSnapshot::new("users")
            .column(ColumnDescriptor::new("id", "integer").not_null().default("nextval('users_id_seq'::regclass)"))
            .column(ColumnDescriptor::new("name", "character varying").max_length(50))
            .column(ColumnDescriptor::new("age", "integer").max_length(10))
            .primary_key(["id"]);

        assert_eq!(
            create_table_sql(&table),
            "CREATE TABLE IF NOT EXISTS users(\n\
             \tid integer NOT NULL DEFAULT nextval('users_id_seq'::regclass),\n\
             \tname character varying(50),\n\
             \tage integer,\n\
             \tPRIMARY KEY(id)\n\
             );"
        );
    }

    #[test]
    fn test_create_table_composite_key_and_no_key() {
        let table = TableSnapshot::new("memberships")
            .column(ColumnDescriptor::new("user_id", "integer").not_null())
            .column(ColumnDescriptor::new("group_id", "integer").not_null())
            .primary_key(["user_id", "group_id"]);
        assert!(create_table_sql(&table).contains("PRIMARY KEY(user_id, group_id)"));

        let keyless = TableSnapshot::new("events").column(ColumnDescriptor::new("payload", "jsonb"));
        assert!(!create_table_sql(&keyless).contains("PRIMARY KEY"));
        assert_eq!(create_table_sql(&TableSnapshot::new("empty")), "CREATE TABLE IF NOT EXISTS empty();");
    }

    #[test]
    fn test_column_statements() {
        let email = ColumnDescriptor::new("email", "character varying").max_length(255).not_null();
        assert_eq!(
            add_column_sql("users", &email),
            "ALTER TABLE users ADD COLUMN email character varying(255) NOT NULL;"
        );
        assert_eq!(drop_column_sql("users", &email), "ALTER TABLE users DROP COLUMN email;");
    }

    #[test]
    fn test_alter_column() {
        let widened = ColumnAlteration {
            column: ColumnDescriptor::new("name", "character varying").max_length(100),
            length_changed: true,
        };
        assert_eq!(
            alter_column_sql("users", &widened),
            "ALTER TABLE users ALTER COLUMN name TYPE character varying(100);"
        );

        let not_null = ColumnAlteration {
            column: ColumnDescriptor::new("name", "character varying").max_length(100).not_null().default("''::character varying"),
            length_changed: false,
        };
        assert_eq!(
            alter_column_sql("users", &not_null),
            "ALTER TABLE users ALTER COLUMN name TYPE character varying NOT NULL DEFAULT ''::character varying;"
        );
    }

    #[test]
    fn test_index_statements() {
        let idx = IndexDescriptor::new("idx_users_email", "CREATE INDEX idx_users_email ON public.users USING btree (email)");
        assert_eq!(
            create_index_sql(&idx),
            "CREATE INDEX idx_users_email ON public.users USING btree (email);"
        );
        assert_eq!(drop_index_sql("idx_users_email"), "DROP INDEX idx_users_email;");
    }
}
