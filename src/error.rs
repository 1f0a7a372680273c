//! Error types for schema inspection and diffing.

use std::fmt;

use thiserror::Error;

/// Which of the two databases an error or snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRole {
    /// The current schema the migration will be applied to.
    Old,
    /// The reference schema the migration converges towards.
    New,
}

impl fmt::Display for SchemaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRole::Old => write!(f, "old"),
            SchemaRole::New => write!(f, "new"),
        }
    }
}

/// The per-table metadata categories fetched from a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Columns,
    PrimaryKey,
    Indexes,
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataKind::Columns => write!(f, "columns"),
            MetadataKind::PrimaryKey => write!(f, "primary key"),
            MetadataKind::Indexes => write!(f, "indexes"),
        }
    }
}

/// Main error type for schema diff operations.
#[derive(Error, Debug)]
pub enum SchemaDiffError {
    /// Could not open a connection to one of the databases.
    #[error("failed to connect to {role} database: {source}")]
    Connection {
        role: SchemaRole,
        #[source]
        source: sqlx::Error,
    },

    /// Could not enumerate the tables of a schema. Nothing can be compared.
    #[error("failed to list tables of {role} schema: {source}")]
    CatalogList {
        role: SchemaRole,
        #[source]
        source: sqlx::Error,
    },

    /// A per-table catalog query failed. Callers skip the affected unit.
    #[error("failed to fetch {kind} of table {table}: {source}")]
    MetadataFetch {
        table: String,
        kind: MetadataKind,
        #[source]
        source: sqlx::Error,
    },

    /// Invalid configuration (bad file, unsupported schema, ...)
    #[error("configuration error: {0}")]
    Config(String),
}

impl SchemaDiffError {
    pub fn metadata(table: impl Into<String>, kind: MetadataKind, source: sqlx::Error) -> Self {
        SchemaDiffError::MetadataFetch {
            table: table.into(),
            kind,
            source,
        }
    }

    /// Whether the run has to stop because of this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SchemaDiffError::MetadataFetch { .. })
    }
}

/// Result type alias for schema diff operations.
pub type Result<T> = std::result::Result<T, SchemaDiffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_error_display() {
        let err = SchemaDiffError::metadata(
            "users",
            MetadataKind::PrimaryKey,
            sqlx::Error::Protocol("boom".into()),
        );
        let msg = err.to_string();
        assert!(msg.contains("primary key"));
        assert!(msg.contains("users"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_catalog_list_is_fatal() {
        let err = SchemaDiffError::CatalogList {
            role: SchemaRole::New,
            source: sqlx::Error::PoolClosed,
        };
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("failed to list tables of new schema"));
    }
}
