use sqlx::FromRow;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::CatalogSource;
use crate::error::{Result, SchemaDiffError, SchemaRole};
use crate::snapshot::{ColumnDescriptor, IndexDescriptor};

const LIST_TABLES: &str = "SELECT table_name::text
     FROM information_schema.tables
     WHERE table_schema = $1 AND table_type = 'BASE TABLE'
     ORDER BY table_name";

const LIST_COLUMNS: &str = "SELECT column_name::text,
            column_default::text,
            is_nullable::text,
            data_type::text,
            character_maximum_length::int4
     FROM information_schema.columns
     WHERE table_schema = $1 AND table_name = $2
     ORDER BY ordinal_position";

const PRIMARY_KEY: &str = "SELECT a.attname::text
     FROM pg_catalog.pg_index i
     JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
     JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey)
     WHERE n.nspname = $1 AND c.relname = $2 AND i.indisprimary
     ORDER BY array_position(i.indkey::int2[], a.attnum)";

const LIST_INDEXES: &str = "SELECT indexname::text, indexdef
     FROM pg_catalog.pg_indexes
     WHERE schemaname = $1 AND tablename = $2
     ORDER BY indexname";

#[derive(Debug, FromRow)]
struct ColumnRow {
    column_name: String,
    column_default: Option<String>,
    is_nullable: String,
    data_type: String,
    character_maximum_length: Option<i32>,
}

impl From<ColumnRow> for ColumnDescriptor {
    fn from(row: ColumnRow) -> Self {
        ColumnDescriptor {
            name: row.column_name,
            data_type: row.data_type,
            nullable: row.is_nullable == "YES",
            default: row.column_default,
            max_length: row.character_maximum_length,
        }
    }
}

#[derive(Debug, FromRow)]
struct IndexRow {
    indexname: String,
    indexdef: String,
}

/// PostgreSQL catalog reader for one schema.
pub struct PgCatalog {
    pool: PgPool,
    schema: String,
}

impl PgCatalog {
    /// Open a single connection and hold it for the whole run.
    pub async fn connect(url: &str, schema: &str, role: SchemaRole) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|source| SchemaDiffError::Connection { role, source })?;

        Ok(Self {
            pool,
            schema: schema.to_string(),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl CatalogSource for PgCatalog {
    async fn list_tables(&self) -> std::result::Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(LIST_TABLES)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_columns(&self, table: &str) -> std::result::Result<Vec<ColumnDescriptor>, sqlx::Error> {
        let rows: Vec<ColumnRow> = sqlx::query_as(LIST_COLUMNS)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ColumnDescriptor::from).collect())
    }

    async fn primary_key(&self, table: &str) -> std::result::Result<Option<Vec<String>>, sqlx::Error> {
        let cols: Vec<String> = sqlx::query_scalar(PRIMARY_KEY)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(if cols.is_empty() { None } else { Some(cols) })
    }

    async fn list_indexes(&self, table: &str) -> std::result::Result<Vec<IndexDescriptor>, sqlx::Error> {
        let rows: Vec<IndexRow> = sqlx::query_as(LIST_INDEXES)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| IndexDescriptor::new(row.indexname, row.indexdef))
            .collect())
    }
}
