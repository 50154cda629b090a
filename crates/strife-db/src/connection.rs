//! The single database connection.
//!
//! `ConnectionManager` owns at most one live `SqliteConnection`, opened on
//! first use from the stored configuration. Every statement in the crate
//! runs through it, one at a time, behind a `&mut` borrow.

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteQueryResult};
use sqlx::{Connection, Sqlite};
use tracing::{debug, info};

use crate::builder::QueryBuilder;
use crate::config::ConnectionConfig;
use crate::error::{DbError, Result};
use crate::record::Record;
use crate::value::SqlValue;

/// Owner of the lazily opened database handle and its credentials.
#[derive(Debug)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    conn: Option<SqliteConnection>,
    in_transaction: bool,
    last_insert_id: Option<i64>,
}

impl ConnectionManager {
    /// Stores the configuration without opening anything.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            conn: None,
            in_transaction: false,
            last_insert_id: None,
        }
    }

    /// Replaces the stored configuration.
    ///
    /// An already open handle keeps its settings until it is closed.
    pub fn configure(&mut self, config: ConnectionConfig) {
        self.config = config;
    }

    /// Returns the stored configuration.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns true while a handle is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Returns the open handle, opening it on first use.
    pub async fn handle(&mut self) -> Result<&mut SqliteConnection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                let options = self.config.connect_options()?;
                let conn = SqliteConnection::connect_with(&options)
                    .await
                    .map_err(DbError::Connection)?;
                info!(database = %self.config.database, "Opened database connection");
                conn
            }
        };
        Ok(self.conn.insert(conn))
    }

    /// Closes the handle. Does nothing when none is open.
    pub async fn close(&mut self) -> Result<()> {
        self.in_transaction = false;
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            info!(database = %self.config.database, "Closed database connection");
        }
        Ok(())
    }

    /// Starts a builder session on an arbitrary table.
    pub fn table(&mut self, table: impl Into<String>) -> QueryBuilder<'_> {
        QueryBuilder::new(self, table)
    }

    /// Runs a raw statement and returns the rows it produced.
    pub async fn query(&mut self, sql: &str) -> Result<Vec<Record>> {
        self.fetch_all(sql, Vec::new()).await
    }

    /// Row id of the most recent insert on this connection.
    #[must_use]
    pub fn last_inserted_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    /// Begins a transaction; changes are held back until `commit()`.
    pub async fn transact(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(DbError::TransactionActive);
        }
        self.execute("BEGIN", Vec::new()).await?;
        self.in_transaction = true;
        info!("Transaction started");
        Ok(())
    }

    /// Commits the active transaction.
    pub async fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DbError::NoActiveTransaction);
        }
        self.execute("COMMIT", Vec::new()).await?;
        self.in_transaction = false;
        info!("Transaction committed");
        Ok(())
    }

    /// Discards everything since `transact()`.
    pub async fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DbError::NoActiveTransaction);
        }
        self.execute("ROLLBACK", Vec::new()).await?;
        self.in_transaction = false;
        info!("Transaction rolled back");
        Ok(())
    }

    /// Returns true between `transact()` and `commit()`/`rollback()`.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Executes a statement that returns no rows.
    pub(crate) async fn execute(
        &mut self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<SqliteQueryResult> {
        debug!(sql = %sql, params = params.len(), "Executing statement");
        let conn = self.handle().await?;
        let result = bind_all(sqlx::query(sql), params).execute(conn).await?;
        Ok(result)
    }

    /// Executes an INSERT and remembers the new row id.
    pub(crate) async fn execute_insert(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<i64> {
        let id = self.execute(sql, params).await?.last_insert_rowid();
        self.last_insert_id = Some(id);
        Ok(id)
    }

    /// Runs a query and decodes every row.
    pub(crate) async fn fetch_all(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Record>> {
        debug!(sql = %sql, params = params.len(), "Fetching rows");
        let conn = self.handle().await?;
        let rows = bind_all(sqlx::query(sql), params).fetch_all(conn).await?;
        rows.iter()
            .map(|row| Record::from_row(row).map_err(DbError::from))
            .collect()
    }

    /// Runs a query and decodes the first row, if any.
    pub(crate) async fn fetch_optional(
        &mut self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<Option<Record>> {
        debug!(sql = %sql, params = params.len(), "Fetching one row");
        let conn = self.handle().await?;
        let row = bind_all(sqlx::query(sql), params)
            .fetch_optional(conn)
            .await?;
        row.as_ref()
            .map(Record::from_row)
            .transpose()
            .map_err(DbError::from)
    }
}

fn bind_all<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: Vec<SqlValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.into_iter().fold(query, bind_param)
}

/// Binds a SqlValue parameter to a raw query.
fn bind_param<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}
