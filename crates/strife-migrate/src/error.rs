//! Error types for the migration runner.

use std::path::PathBuf;

use strife_db::DbError;

/// Errors raised while loading or running migrations, seeders and backups.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A database operation failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// IO error (reading declaration or seed files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A declaration or seed file is not valid JSON of the expected shape.
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A directory the command needs does not exist.
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// No registered migration manages the table.
    #[error("No migration registered for table '{0}'")]
    UnknownTable(String),

    /// Two registered migrations manage the same table.
    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),
}

/// Result type alias for migration runner operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
