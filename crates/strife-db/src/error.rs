//! Error types for the active-record engine.

use thiserror::Error;

/// Errors raised by connections, query building, and migrations.
///
/// Usage errors (a malformed chain, empty input, an unknown dynamic call)
/// are reported as their own variants so callers can match on them;
/// driver failures are wrapped in [`DbError::Database`].
#[derive(Debug, Error)]
pub enum DbError {
    /// The connection could not be opened.
    #[error("connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// The configured driver is not supported.
    #[error("unsupported driver '{0}', only 'sqlite' is available")]
    UnsupportedDriver(String),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed while creating or dropping its table.
    #[error("migration of table '{table}' failed: {source}")]
    Migration {
        /// Target table of the migration.
        table: String,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// `install()` was called on a migration that declared no fields.
    #[error("migration for table '{0}' declares no fields")]
    EmptyDefinition(String),

    /// An operation received an empty value set.
    #[error("{0}() expects at least one value")]
    EmptyValue(&'static str),

    /// A clause was chained in an invalid position.
    #[error("{op}() must follow {requires}()")]
    ChainOrder {
        /// The misplaced operation.
        op: &'static str,
        /// The operation that must precede it.
        requires: &'static str,
    },

    /// A dynamic call name did not resolve to any known operation.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// A field expected to be numeric holds something else.
    #[error("field '{0}' is not numeric")]
    NotNumeric(String),

    /// The requested field is absent from the record.
    #[error("field '{0}' does not exist on the record")]
    FieldNotFound(String),

    /// No row id could be resolved for an operation that needs one.
    #[error("{0}() has no target row: pass an id or fetch a record first")]
    MissingTarget(&'static str),

    /// `commit()`/`rollback()` without an active transaction.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// `transact()` while a transaction is already open.
    #[error("a transaction is already active")]
    TransactionActive,

    /// An argument was rejected before reaching the database.
    #[error("invalid argument to {op}(): {reason}")]
    InvalidArgument {
        /// The operation that rejected the argument.
        op: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// IO error (reading/writing backup files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A restore stopped at the first failed insert.
    #[error("restore stopped after {restored} row(s): {source}")]
    Restore {
        /// Rows inserted before the failure.
        restored: usize,
        /// The failure that stopped the restore.
        #[source]
        source: Box<DbError>,
    },
}

impl DbError {
    pub(crate) fn invalid(op: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            op,
            reason: reason.into(),
        }
    }
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DbError>;
