//! In-progress statement state.
//!
//! A `QueryState` accumulates the clauses of one statement across chained
//! calls. It renders deterministically to
//! `SELECT <selection> FROM <table> <where> <order> <limit>` (or the DELETE
//! form), and keeps its bound values in placeholder order.

use std::fmt;
use std::str::FromStr;

use crate::error::{DbError, Result};
use crate::value::SqlValue;

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    Asc,
    /// Descending order (DESC)
    Desc,
}

impl OrderDirection {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Parses `ASC`/`DESC` in any letter case.
impl FromStr for OrderDirection {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(DbError::invalid(
                "order_by",
                format!("direction must be ASC or DESC, got '{token}'"),
            ))
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// The clauses and bound values of the statement being assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    table: String,
    select: Option<String>,
    where_clause: Option<String>,
    order: Option<String>,
    limit: Option<u64>,
    bound: Vec<SqlValue>,
}

impl QueryState {
    /// Creates an idle state targeting `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: None,
            where_clause: None,
            order: None,
            limit: None,
            bound: Vec::new(),
        }
    }

    /// Sets the selected columns, replacing any earlier selection.
    ///
    /// Accepts either one comma-separated string or several column names.
    pub fn select<I, S>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select = Some(join_columns("select", columns)?);
        Ok(())
    }

    /// Like [`select`](Self::select), prefixed with `DISTINCT`.
    pub fn distinct<I, S>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = join_columns("distinct", columns)?;
        self.select = Some(format!("DISTINCT {columns}"));
        Ok(())
    }

    /// Adds `field <op> ?`, AND-combined with earlier conditions.
    ///
    /// The operator is used verbatim.
    pub fn where_op(&mut self, field: &str, op: &str, value: SqlValue) {
        self.push_condition("AND", format!("{field} {op} ?"));
        self.bound.push(value);
    }

    /// Adds `field <op> ?`, OR-combined with earlier conditions.
    pub fn or_where_op(&mut self, field: &str, op: &str, value: SqlValue) -> Result<()> {
        self.require_where("or_where")?;
        self.push_condition("OR", format!("{field} {op} ?"));
        self.bound.push(value);
        Ok(())
    }

    /// Adds `field IN (?, ...)` with one placeholder per value.
    pub fn where_in<I>(&mut self, field: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = SqlValue>,
    {
        let values: Vec<SqlValue> = values.into_iter().collect();
        if values.is_empty() {
            return Err(DbError::EmptyValue("where_in"));
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        self.push_condition("AND", format!("{field} IN ({placeholders})"));
        self.bound.extend(values);
        Ok(())
    }

    /// Adds `field BETWEEN ? AND ?` (inclusive), AND-combined.
    pub fn where_between(&mut self, field: &str, low: SqlValue, high: SqlValue) {
        self.push_condition("AND", format!("{field} BETWEEN ? AND ?"));
        self.bound.push(low);
        self.bound.push(high);
    }

    /// Adds `field BETWEEN ? AND ?` (inclusive), OR-combined.
    pub fn or_where_between(&mut self, field: &str, low: SqlValue, high: SqlValue) -> Result<()> {
        self.require_where("or_where_between")?;
        self.push_condition("OR", format!("{field} BETWEEN ? AND ?"));
        self.bound.push(low);
        self.bound.push(high);
        Ok(())
    }

    /// Sets `ORDER BY field ASC|DESC`, replacing an earlier ordering.
    pub fn order_by(&mut self, field: &str, direction: &str) -> Result<()> {
        let direction: OrderDirection = direction.parse()?;
        self.order = Some(format!("ORDER BY {field} {direction}"));
        Ok(())
    }

    /// Sets `LIMIT n`.
    pub fn limit(&mut self, n: u64) {
        self.limit = Some(n);
    }

    /// Sets `LIMIT n` unless a limit is already present.
    pub(crate) fn limit_if_unset(&mut self, n: u64) {
        self.limit.get_or_insert(n);
    }

    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The stored selection, without the `SELECT` keyword.
    #[must_use]
    pub fn select_clause(&self) -> Option<&str> {
        self.select.as_deref()
    }

    /// The assembled `WHERE ...` clause.
    #[must_use]
    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    /// The assembled `ORDER BY ...` clause.
    #[must_use]
    pub fn order_clause(&self) -> Option<&str> {
        self.order.as_deref()
    }

    /// The assembled `LIMIT n` clause.
    #[must_use]
    pub fn limit_clause(&self) -> Option<String> {
        self.limit.map(|n| format!("LIMIT {n}"))
    }

    /// Bound values, in placeholder order.
    #[must_use]
    pub fn bound_values(&self) -> &[SqlValue] {
        &self.bound
    }

    /// Returns true when no clause has been set.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        *self == Self::new(self.table.clone())
    }

    /// Returns true when a WHERE, ORDER BY or LIMIT clause is pending.
    #[must_use]
    pub fn has_conditions(&self) -> bool {
        self.where_clause.is_some() || self.order.is_some() || self.limit.is_some()
    }

    /// Renders the SELECT statement.
    #[must_use]
    pub fn to_select_sql(&self) -> String {
        let selection = self.select.as_deref().unwrap_or("*");
        self.render(format!("SELECT {selection} FROM {}", self.table))
    }

    /// Renders the DELETE statement for the pending conditions.
    ///
    /// SQLite only accepts ORDER BY/LIMIT on a DELETE through a subquery,
    /// so those go through `primary_key IN (SELECT primary_key ...)`.
    #[must_use]
    pub fn to_delete_sql(&self, primary_key: &str) -> String {
        if self.order.is_none() && self.limit.is_none() {
            return self.render(format!("DELETE FROM {}", self.table));
        }

        let matched = self.render(format!("SELECT {primary_key} FROM {}", self.table));
        format!(
            "DELETE FROM {} WHERE {primary_key} IN ({matched})",
            self.table
        )
    }

    /// Moves the accumulated state out, leaving this one idle.
    pub(crate) fn take(&mut self) -> Self {
        let idle = Self::new(self.table.clone());
        std::mem::replace(self, idle)
    }

    pub(crate) fn into_bound_values(self) -> Vec<SqlValue> {
        self.bound
    }

    fn render(&self, head: String) -> String {
        let limit = self.limit_clause();
        let clauses = [
            self.where_clause.as_deref(),
            self.order.as_deref(),
            limit.as_deref(),
        ];

        let mut sql = head;
        for clause in clauses.into_iter().flatten() {
            sql.push(' ');
            sql.push_str(clause);
        }
        sql
    }

    fn push_condition(&mut self, conjunction: &str, condition: String) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => format!("{existing} {conjunction} {condition}"),
            None => format!("WHERE {condition}"),
        });
    }

    fn require_where(&self, op: &'static str) -> Result<()> {
        if self.where_clause.is_none() {
            return Err(DbError::ChainOrder {
                op,
                requires: "where",
            });
        }
        Ok(())
    }
}

fn join_columns<I, S>(op: &'static str, columns: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names = Vec::new();
    for item in columns {
        names.extend(
            item.as_ref()
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
        );
    }

    if names.is_empty() {
        return Err(DbError::EmptyValue(op));
    }
    Ok(names.join(", "))
}
