//! Chainable active-record builder.
//!
//! A `QueryBuilder` is one query session on one table. Clause methods
//! accumulate into its [`QueryState`]; terminal methods execute the
//! assembled statement and leave the state idle again, whether they
//! succeed or fail.
//!
//! # Example
//!
//! ```ignore
//! let mut db = ConnectionManager::new(ConnectionConfig::sqlite("app.db"));
//!
//! let admins = db
//!     .table("users")
//!     .where_eq("role", "admin")
//!     .order_by("id", "desc")?
//!     .limit(10)
//!     .get()
//!     .await?;
//! ```

mod export;
mod write;

pub use export::CsvOptions;

use serde::de::DeserializeOwned;

use crate::connection::ConnectionManager;
use crate::error::{DbError, Result};
use crate::query::{DynamicCall, DynamicVerb, QueryState};
use crate::record::Record;
use crate::value::SqlValue;

/// Outcome of a dynamically named call.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// A clause was added; the session continues.
    Chained,
    /// A field was incremented or decremented to this value.
    Updated(SqlValue),
    /// A field was read. `None` when no row matched.
    Pulled(Option<SqlValue>),
}

/// Query session over one table, borrowing the connection for its lifetime.
#[derive(Debug)]
pub struct QueryBuilder<'c> {
    db: &'c mut ConnectionManager,
    primary_key: String,
    state: QueryState,
    current: Option<Record>,
    pending: Record,
}

impl<'c> QueryBuilder<'c> {
    /// Starts an idle session on `table` with primary key `id`.
    pub fn new(db: &'c mut ConnectionManager, table: impl Into<String>) -> Self {
        Self {
            db,
            primary_key: String::from("id"),
            state: QueryState::new(table),
            current: None,
            pending: Record::new(),
        }
    }

    /// Overrides the primary key column.
    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        self.state.table()
    }

    /// The accumulated, not yet executed state.
    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// The underlying connection.
    pub fn connection(&mut self) -> &mut ConnectionManager {
        self.db
    }

    /// Discards every pending clause.
    pub fn reset(&mut self) -> &mut Self {
        self.state.take();
        self
    }

    // Clauses

    /// Selects the given columns instead of `*`.
    pub fn select<I, S>(&mut self, columns: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.select(columns)?;
        Ok(self)
    }

    /// Selects the given columns with `DISTINCT`.
    pub fn distinct<I, S>(&mut self, columns: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.distinct(columns)?;
        Ok(self)
    }

    /// Adds `field = ?`.
    pub fn where_eq(&mut self, field: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.where_op(field, "=", value)
    }

    /// Adds `field <op> ?`. The operator is used as given.
    pub fn where_op(&mut self, field: &str, op: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.state.where_op(field, op, value.into());
        self
    }

    /// Adds `OR field = ?`. Fails unless a where clause precedes it.
    pub fn or_where_eq(&mut self, field: &str, value: impl Into<SqlValue>) -> Result<&mut Self> {
        self.or_where_op(field, "=", value)
    }

    /// Adds `OR field <op> ?`. Fails unless a where clause precedes it.
    pub fn or_where_op(
        &mut self,
        field: &str,
        op: &str,
        value: impl Into<SqlValue>,
    ) -> Result<&mut Self> {
        self.state.or_where_op(field, op, value.into())?;
        Ok(self)
    }

    /// Adds `field IN (?, ...)`.
    pub fn where_in<I, V>(&mut self, field: &str, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.state
            .where_in(field, values.into_iter().map(Into::into))?;
        Ok(self)
    }

    /// Adds `field BETWEEN ? AND ?`.
    pub fn where_between(
        &mut self,
        field: &str,
        low: impl Into<SqlValue>,
        high: impl Into<SqlValue>,
    ) -> &mut Self {
        self.state.where_between(field, low.into(), high.into());
        self
    }

    /// Adds `OR field BETWEEN ? AND ?`. Fails unless a where clause
    /// precedes it.
    pub fn or_where_between(
        &mut self,
        field: &str,
        low: impl Into<SqlValue>,
        high: impl Into<SqlValue>,
    ) -> Result<&mut Self> {
        self.state.or_where_between(field, low.into(), high.into())?;
        Ok(self)
    }

    /// Orders by `field`; `direction` is `ASC` or `DESC` in any case.
    pub fn order_by(&mut self, field: &str, direction: &str) -> Result<&mut Self> {
        self.state.order_by(field, direction)?;
        Ok(self)
    }

    /// Limits the number of rows.
    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.state.limit(n);
        self
    }

    /// Renders the pending SELECT without executing it.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.state.to_select_sql()
    }

    /// Wraps `text` as an escaped SQL string literal.
    #[must_use]
    pub fn quote(text: &str) -> String {
        SqlValue::from(text).to_sql_inline()
    }

    // Held record

    /// The record held from the last `find`/`first`/`first_row`/`last_row`.
    #[must_use]
    pub fn result(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    /// Holds `record` as the current row, as if it had just been fetched.
    pub fn hold(&mut self, record: Record) -> &mut Self {
        self.current = Some(record);
        self
    }

    /// Drops the held record.
    pub fn release(&mut self) -> Option<Record> {
        self.current.take()
    }

    /// The held record, fetching the first matching row when none is held.
    pub async fn data(&mut self) -> Result<Option<Record>> {
        if self.current.is_none() {
            self.first().await?;
        }
        Ok(self.current.clone())
    }

    /// Stages a field change for the next `save()`.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        self.pending.set(field, value);
        self
    }

    /// Field changes staged for `save()`.
    #[must_use]
    pub fn pending(&self) -> &Record {
        &self.pending
    }

    // Terminal reads

    /// Fetches the row with primary key `id` and holds it.
    ///
    /// Pending clauses are discarded.
    pub async fn find(&mut self, id: i64) -> Result<Option<Record>> {
        self.state.take();
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ? LIMIT 1",
            self.table(),
            self.primary_key
        );
        let found = self.db.fetch_optional(&sql, vec![SqlValue::Int(id)]).await?;
        self.hold_found(found.as_ref());
        Ok(found)
    }

    /// Fetches the first row of the assembled query and holds it.
    pub async fn first(&mut self) -> Result<Option<Record>> {
        self.state.limit_if_unset(1);
        let found = self.fetch_one().await?;
        self.hold_found(found.as_ref());
        Ok(found)
    }

    /// Fetches the row with the lowest primary key and holds it.
    pub async fn first_row(&mut self) -> Result<Option<Record>> {
        self.edge_row("ASC").await
    }

    /// Fetches the row with the highest primary key and holds it.
    pub async fn last_row(&mut self) -> Result<Option<Record>> {
        self.edge_row("DESC").await
    }

    /// Fetches every row of the assembled query.
    pub async fn get(&mut self) -> Result<Vec<Record>> {
        let state = self.state.take();
        let sql = state.to_select_sql();
        self.db.fetch_all(&sql, state.into_bound_values()).await
    }

    /// Fetches every row of the assembled query as `T`.
    pub async fn get_as<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        self.get()
            .await?
            .iter()
            .map(|record| record.deserialize::<T>())
            .collect()
    }

    /// Number of rows the assembled query returns.
    ///
    /// Runs the full SELECT and counts the fetched rows.
    pub async fn count(&mut self) -> Result<usize> {
        Ok(self.get().await?.len())
    }

    /// Returns true when the assembled query matches at least one row.
    pub async fn exists(&mut self) -> Result<bool> {
        self.state.limit_if_unset(1);
        Ok(self.fetch_one().await?.is_some())
    }

    /// Reads `column` from the held record, or from the first row of the
    /// assembled query when none is held.
    ///
    /// Returns `Ok(None)` when the query matches no row.
    pub async fn pull(&mut self, column: &str) -> Result<Option<SqlValue>> {
        if let Some(current) = &self.current {
            self.state.take();
            return current.try_get(column).cloned().map(Some);
        }

        self.state.limit_if_unset(1);
        match self.fetch_one().await? {
            Some(row) => row.try_get(column).cloned().map(Some),
            None => Ok(None),
        }
    }

    // Dynamic calls

    /// Resolves a dynamically named operation such as `whereUsername` or
    /// `incrementScore` and runs it.
    pub async fn call(&mut self, name: &str, args: Vec<SqlValue>) -> Result<Dispatched> {
        let call = DynamicCall::parse(name, args)?;
        self.dispatch(&call).await
    }

    /// Runs a parsed dynamic call through the matching named operation.
    pub async fn dispatch(&mut self, call: &DynamicCall) -> Result<Dispatched> {
        let field = call.field.as_str();
        match call.verb {
            DynamicVerb::Where => {
                let (op, value) = call.condition()?;
                self.where_op(field, op, value);
                Ok(Dispatched::Chained)
            }
            DynamicVerb::OrWhere => {
                let (op, value) = call.condition()?;
                self.or_where_op(field, op, value)?;
                Ok(Dispatched::Chained)
            }
            DynamicVerb::OrderBy => {
                self.order_by(field, call.direction()?)?;
                Ok(Dispatched::Chained)
            }
            DynamicVerb::Increment => self
                .increment(field, call.step()?)
                .await
                .map(Dispatched::Updated),
            DynamicVerb::Decrement => self
                .decrement(field, call.step()?)
                .await
                .map(Dispatched::Updated),
            DynamicVerb::Pull => self.pull(field).await.map(Dispatched::Pulled),
        }
    }

    async fn fetch_one(&mut self) -> Result<Option<Record>> {
        let state = self.state.take();
        let sql = state.to_select_sql();
        self.db.fetch_optional(&sql, state.into_bound_values()).await
    }

    async fn edge_row(&mut self, direction: &str) -> Result<Option<Record>> {
        self.state.take();
        let sql = format!(
            "SELECT * FROM {} ORDER BY {} {direction} LIMIT 1",
            self.table(),
            self.primary_key
        );
        let found = self.db.fetch_optional(&sql, Vec::new()).await?;
        self.hold_found(found.as_ref());
        Ok(found)
    }

    // A miss keeps the previously held record.
    fn hold_found(&mut self, found: Option<&Record>) {
        if let Some(record) = found {
            self.current = Some(record.clone());
        }
    }

    fn current_id(&self, op: &'static str) -> Result<i64> {
        self.current
            .as_ref()
            .and_then(|record| record.get(&self.primary_key))
            .and_then(SqlValue::as_i64)
            .ok_or(DbError::MissingTarget(op))
    }
}
