//! Inserts, updates, deletes and counters.

use tracing::debug;

use super::QueryBuilder;
use crate::error::{DbError, Result};
use crate::record::Record;
use crate::value::{Number, SqlValue};

impl QueryBuilder<'_> {
    /// Inserts one row from `(column, value)` pairs and returns its row id.
    pub async fn insert<I, K, V>(&mut self, values: I) -> Result<i64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        self.insert_record("insert", values.into_iter().collect())
            .await
    }

    /// Inserts a row taken whole from a set of values, such as a submitted
    /// form.
    pub async fn create_from(&mut self, values: Record) -> Result<i64> {
        self.insert_record("create_from", values).await
    }

    /// Inserts a row from `values` minus the `exceptions` keys.
    ///
    /// Both sets must be non-empty.
    pub async fn create_except(&mut self, mut values: Record, exceptions: &[&str]) -> Result<i64> {
        if values.is_empty() || exceptions.is_empty() {
            return Err(DbError::EmptyValue("create_except"));
        }
        for field in exceptions {
            values.remove(field);
        }
        self.insert_record("create_except", values).await
    }

    /// Updates the row `id`, or the held record's row when `id` is `None`.
    ///
    /// Returns the number of rows changed.
    pub async fn update<I, K, V>(&mut self, values: I, id: Option<i64>) -> Result<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        let values: Record = values.into_iter().collect();
        if values.is_empty() {
            return Err(DbError::EmptyValue("update"));
        }
        let id = match id {
            Some(id) => id,
            None => self.current_id("update")?,
        };

        let assignments: Vec<String> = values.columns().map(|c| format!("{c} = ?")).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table(),
            assignments.join(", "),
            self.primary_key
        );
        let mut params: Vec<SqlValue> = values.into_iter().map(|(_, value)| value).collect();
        params.push(SqlValue::Int(id));

        Ok(self.db.execute(&sql, params).await?.rows_affected())
    }

    /// Writes the staged field changes to the held record's row, then
    /// refreshes those fields from storage.
    ///
    /// The staged changes are cleared whether or not the update succeeds.
    pub async fn save(&mut self) -> Result<u64> {
        let changes = std::mem::take(&mut self.pending);
        let id = self.current_id("save")?;
        let changed: Vec<String> = changes.columns().map(str::to_owned).collect();

        let affected = self.update(changes, Some(id)).await?;

        let sql = format!(
            "SELECT * FROM {} WHERE {} = ? LIMIT 1",
            self.table(),
            self.primary_key
        );
        let stored = self.db.fetch_optional(&sql, vec![SqlValue::Int(id)]).await?;
        if let (Some(stored), Some(current)) = (stored, self.current.as_mut()) {
            for field in changed {
                if let Some(value) = stored.get(&field) {
                    current.set(field, value.clone());
                }
            }
        }

        Ok(affected)
    }

    /// Deletes rows and returns how many were removed.
    ///
    /// With `ids`, deletes each of those rows by primary key and leaves any
    /// pending clauses alone. Otherwise deletes what the pending
    /// where/order/limit clauses match, or failing that the held record.
    /// A held record whose row is removed is released.
    pub async fn delete(&mut self, ids: &[i64]) -> Result<u64> {
        if !ids.is_empty() {
            let sql = format!(
                "DELETE FROM {} WHERE {} = ?",
                self.table(),
                self.primary_key
            );
            let mut removed = 0;
            for id in ids {
                removed += self
                    .db
                    .execute(&sql, vec![SqlValue::Int(*id)])
                    .await?
                    .rows_affected();
            }
            if self
                .current_id("delete")
                .is_ok_and(|held| ids.contains(&held))
            {
                self.current = None;
            }
            return Ok(removed);
        }

        if self.state.has_conditions() {
            let state = self.state.take();
            let sql = state.to_delete_sql(&self.primary_key);
            let removed = self
                .db
                .execute(&sql, state.into_bound_values())
                .await?
                .rows_affected();
            if removed > 0 {
                self.release_if_gone().await?;
            }
            return Ok(removed);
        }

        self.state.take();
        let id = self.current_id("delete")?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.table(),
            self.primary_key
        );
        let removed = self
            .db
            .execute(&sql, vec![SqlValue::Int(id)])
            .await?
            .rows_affected();
        self.current = None;
        Ok(removed)
    }

    /// Adds `amount` to a numeric field of the held record and returns the
    /// new value.
    pub async fn increment(&mut self, field: &str, amount: i64) -> Result<SqlValue> {
        self.step("increment", field, amount).await
    }

    /// Subtracts `amount` from a numeric field of the held record and
    /// returns the new value.
    pub async fn decrement(&mut self, field: &str, amount: i64) -> Result<SqlValue> {
        let amount = amount
            .checked_neg()
            .ok_or_else(|| DbError::invalid("decrement", "amount out of range"))?;
        self.step("decrement", field, amount).await
    }

    async fn release_if_gone(&mut self) -> Result<()> {
        let Ok(id) = self.current_id("delete") else {
            return Ok(());
        };
        let sql = format!(
            "SELECT {pk} FROM {} WHERE {pk} = ? LIMIT 1",
            self.table(),
            pk = self.primary_key
        );
        if self
            .db
            .fetch_optional(&sql, vec![SqlValue::Int(id)])
            .await?
            .is_none()
        {
            self.current = None;
        }
        Ok(())
    }

    async fn step(&mut self, op: &'static str, field: &str, delta: i64) -> Result<SqlValue> {
        let current = self.current.as_ref().ok_or(DbError::MissingTarget(op))?;
        let number = current
            .try_get(field)?
            .number()
            .ok_or_else(|| DbError::NotNumeric(field.to_owned()))?;
        let next = match number {
            Number::Int(n) => n
                .checked_add(delta)
                .map(Number::Int)
                .ok_or_else(|| DbError::invalid(op, format!("'{field}' would overflow")))?,
            Number::Float(f) => Number::Float(f + delta as f64),
        };
        let next = SqlValue::from(next);
        let id = self.current_id(op)?;

        let sql = format!(
            "UPDATE {} SET {field} = ? WHERE {} = ?",
            self.table(),
            self.primary_key
        );
        self.db
            .execute(&sql, vec![next.clone(), SqlValue::Int(id)])
            .await?;
        debug!(table = %self.table(), field, value = %next, "Stepped field");

        if let Some(current) = self.current.as_mut() {
            current.set(field, next.clone());
        }
        Ok(next)
    }

    async fn insert_record(&mut self, op: &'static str, values: Record) -> Result<i64> {
        if values.is_empty() {
            return Err(DbError::EmptyValue(op));
        }

        let columns: Vec<&str> = values.columns().collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            self.table(),
            columns.join(", ")
        );
        let params: Vec<SqlValue> = values.into_iter().map(|(_, value)| value).collect();
        self.db.execute_insert(&sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConnectionConfig;
    use crate::connection::ConnectionManager;
    use crate::error::DbError;
    use crate::record::Record;
    use crate::value::SqlValue;

    async fn scores() -> ConnectionManager {
        let mut db = ConnectionManager::new(ConnectionConfig::in_memory());
        db.query(
            "CREATE TABLE scores (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             name TEXT NOT NULL, score INTEGER NOT NULL, ratio REAL)",
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let mut db = scores().await;
        let mut table = db.table("scores");
        let id = table
            .insert([("name", SqlValue::from("ann")), ("score", SqlValue::Int(5))])
            .await
            .unwrap();
        let row = table.find(id).await.unwrap().unwrap();
        assert_eq!(row.get_str("name").unwrap(), Some("ann"));
        assert_eq!(row.get_i64("score").unwrap(), Some(5));
        drop(table);
        assert_eq!(db.last_inserted_id(), Some(id));
    }

    #[tokio::test]
    async fn test_insert_requires_values() {
        let mut db = scores().await;
        let err = db
            .table("scores")
            .insert(Vec::<(String, SqlValue)>::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::EmptyValue("insert")));
    }

    #[tokio::test]
    async fn test_create_except_drops_keys() {
        let mut db = scores().await;
        let mut table = db.table("scores");
        let form: Record = [
            ("name", SqlValue::from("bo")),
            ("score", SqlValue::Int(2)),
            ("csrf_token", SqlValue::from("abc")),
        ]
        .into_iter()
        .collect();

        assert!(matches!(
            table.create_except(form.clone(), &[]).await,
            Err(DbError::EmptyValue("create_except"))
        ));
        let id = table.create_except(form, &["csrf_token"]).await.unwrap();
        let row = table.find(id).await.unwrap().unwrap();
        assert!(!row.contains("csrf_token"));
    }

    #[tokio::test]
    async fn test_update_needs_target() {
        let mut db = scores().await;
        let mut table = db.table("scores");
        assert!(matches!(
            table.update([("score", 1_i64)], None).await,
            Err(DbError::MissingTarget("update"))
        ));

        let id = table
            .insert([("name", SqlValue::from("cy")), ("score", SqlValue::Int(1))])
            .await
            .unwrap();
        table.find(id).await.unwrap();
        assert_eq!(table.update([("score", 9_i64)], None).await.unwrap(), 1);
        let row = table.find(id).await.unwrap().unwrap();
        assert_eq!(row.get_i64("score").unwrap(), Some(9));
    }

    #[tokio::test]
    async fn test_save_refreshes_and_clears_pending() {
        let mut db = scores().await;
        let mut table = db.table("scores");
        let id = table
            .insert([("name", SqlValue::from("di")), ("score", SqlValue::Int(3))])
            .await
            .unwrap();

        table.set("score", 4_i64);
        assert!(matches!(
            table.save().await,
            Err(DbError::MissingTarget("save"))
        ));
        assert!(table.pending().is_empty());

        table.find(id).await.unwrap();
        table.set("score", 11_i64).set("name", "dee");
        assert_eq!(table.save().await.unwrap(), 1);
        assert!(table.pending().is_empty());
        let held = table.result().unwrap();
        assert_eq!(held.get_i64("score").unwrap(), Some(11));
        assert_eq!(held.get_str("name").unwrap(), Some("dee"));
    }

    #[tokio::test]
    async fn test_increment_and_decrement() {
        let mut db = scores().await;
        let mut table = db.table("scores");
        let id = table
            .insert([
                ("name", SqlValue::from("ed")),
                ("score", SqlValue::Int(5)),
                ("ratio", SqlValue::Float(0.5)),
            ])
            .await
            .unwrap();

        assert!(matches!(
            table.increment("score", 1).await,
            Err(DbError::MissingTarget("increment"))
        ));

        table.find(id).await.unwrap();
        assert_eq!(table.increment("score", 1).await.unwrap(), SqlValue::Int(6));
        assert_eq!(table.decrement("score", 4).await.unwrap(), SqlValue::Int(2));
        assert_eq!(
            table.increment("ratio", 1).await.unwrap(),
            SqlValue::Float(1.5)
        );
        assert!(matches!(
            table.increment("name", 1).await,
            Err(DbError::NotNumeric(field)) if field == "name"
        ));
        assert!(matches!(
            table.increment("missing", 1).await,
            Err(DbError::FieldNotFound(field)) if field == "missing"
        ));

        let stored = table.pull("score").await.unwrap();
        assert_eq!(stored, Some(SqlValue::Int(2)));
        table.release();
        let stored = table.where_eq("id", id).pull("score").await.unwrap();
        assert_eq!(stored, Some(SqlValue::Int(2)));
    }

    #[tokio::test]
    async fn test_delete_modes() {
        let mut db = scores().await;
        let mut table = db.table("scores");
        for (name, score) in [("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)] {
            table
                .insert([("name", SqlValue::from(name)), ("score", SqlValue::Int(score))])
                .await
                .unwrap();
        }

        assert!(matches!(
            table.delete(&[]).await,
            Err(DbError::MissingTarget("delete"))
        ));

        // By ids, leaving pending clauses untouched.
        table.where_eq("name", "e");
        assert_eq!(table.delete(&[1, 2]).await.unwrap(), 2);
        assert!(table.state().where_clause().is_some());

        // By the pending clauses.
        assert_eq!(table.delete(&[]).await.unwrap(), 1);
        assert!(table.state().is_idle());

        // ORDER BY/LIMIT go through the primary-key subquery.
        table.order_by("score", "DESC").unwrap().limit(1);
        assert_eq!(table.delete(&[]).await.unwrap(), 1);
        assert_eq!(table.count().await.unwrap(), 1);

        // The held record.
        table.first_row().await.unwrap();
        assert_eq!(table.delete(&[]).await.unwrap(), 1);
        assert!(table.result().is_none());
        assert_eq!(table.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_delete_discards_selection() {
        let mut db = scores().await;
        let mut table = db.table("scores");
        table
            .insert([("name", SqlValue::from("a")), ("score", SqlValue::Int(1))])
            .await
            .unwrap();

        table.select(["name"]).unwrap();
        assert!(matches!(
            table.delete(&[]).await,
            Err(DbError::MissingTarget("delete"))
        ));
        assert!(table.state().is_idle());
        let rows = table.get().await.unwrap();
        assert!(rows[0].contains("score"));
    }

    #[tokio::test]
    async fn test_query_delete_releases_removed_held_record() {
        let mut db = scores().await;
        let mut table = db.table("scores");
        let mut ids = Vec::new();
        for name in ["a", "b"] {
            let id = table
                .insert([("name", SqlValue::from(name)), ("score", SqlValue::Int(1))])
                .await
                .unwrap();
            ids.push(id);
        }

        table.find(ids[0]).await.unwrap();
        table.where_eq("name", "b");
        assert_eq!(table.delete(&[]).await.unwrap(), 1);
        assert_eq!(
            table.result().and_then(|row| row.get("id")),
            Some(&SqlValue::Int(ids[0]))
        );

        table.where_eq("name", "a");
        assert_eq!(table.delete(&[]).await.unwrap(), 1);
        assert!(table.result().is_none());
        assert!(matches!(
            table.increment("score", 1).await,
            Err(DbError::MissingTarget("increment"))
        ));
    }
}
