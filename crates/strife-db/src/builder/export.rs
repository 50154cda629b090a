//! Table snapshots and text exports.
//!
//! A backup is one JSON array of row objects, stored as `<table>.json` in
//! the backup directory. `restore` reads exactly that shape back.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::QueryBuilder;
use crate::error::{DbError, Result};
use crate::record::Record;

/// Delimiters for [`QueryBuilder::csv_encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Joins the fields of one row.
    pub delimiter: String,
    /// Joins rows.
    pub separator: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: String::from(","),
            separator: String::from("|"),
        }
    }
}

impl CsvOptions {
    /// Options with the given delimiters. Empty strings fall back to the
    /// defaults.
    #[must_use]
    pub fn new(delimiter: &str, separator: &str) -> Self {
        let defaults = Self::default();
        Self {
            delimiter: non_empty_or(delimiter, defaults.delimiter),
            separator: non_empty_or(separator, defaults.separator),
        }
    }
}

fn non_empty_or(value: &str, fallback: String) -> String {
    if value.is_empty() {
        fallback
    } else {
        value.to_owned()
    }
}

impl QueryBuilder<'_> {
    /// Location of this table's backup file inside `dir`.
    #[must_use]
    pub fn backup_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(format!("{}.json", self.table()))
    }

    /// Writes every row of the table to `<dir>/<table>.json`.
    ///
    /// Pending clauses are left alone. Returns the written path.
    pub async fn backup(&mut self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let sql = format!("SELECT * FROM {}", self.table());
        let rows = self.db.fetch_all(&sql, Vec::new()).await?;

        let path = self.backup_path(&dir);
        tokio::fs::create_dir_all(dir.as_ref()).await?;
        tokio::fs::write(&path, serde_json::to_vec_pretty(&rows)?).await?;

        info!(
            table = %self.table(),
            rows = rows.len(),
            path = %path.display(),
            "Backed up table"
        );
        Ok(path)
    }

    /// Re-inserts every row of `<dir>/<table>.json`, returning the count.
    ///
    /// Stops at the first failed insert; rows inserted before it stay.
    pub async fn restore(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let path = self.backup_path(&dir);
        let bytes = tokio::fs::read(&path).await?;
        let rows: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_slice(&bytes)?;

        let total = rows.len();
        for (restored, row) in rows.into_iter().enumerate() {
            if let Err(err) = self.create_from(Record::from_json(row)).await {
                warn!(
                    table = %self.table(),
                    restored,
                    error = %err,
                    "Restore stopped at a failed insert"
                );
                return Err(DbError::Restore {
                    restored,
                    source: Box::new(err),
                });
            }
        }

        info!(
            table = %self.table(),
            rows = total,
            path = %path.display(),
            "Restored table"
        );
        Ok(total)
    }

    /// Renders the held record, or else the rows of the assembled query, as
    /// delimited text.
    ///
    /// Fields are joined by `delimiter` and rows by `separator`; delimiters
    /// left at either end of a row are trimmed.
    pub async fn csv_encode(&mut self, options: &CsvOptions) -> Result<String> {
        let rows = self.export_rows().await?;
        let lines: Vec<String> = rows
            .iter()
            .map(|row| {
                let fields: Vec<String> = row.values().map(ToString::to_string).collect();
                fields
                    .join(&options.delimiter)
                    .trim_start_matches(options.delimiter.as_str())
                    .trim_end_matches(options.delimiter.as_str())
                    .to_owned()
            })
            .collect();
        Ok(lines.join(&options.separator))
    }

    /// Renders the held record as a JSON object, or else the rows of the
    /// assembled query as a JSON array.
    pub async fn json_encode(&mut self) -> Result<String> {
        if let Some(current) = &self.current {
            return Ok(serde_json::to_string(current)?);
        }
        let rows = self.get().await?;
        Ok(serde_json::to_string(&rows)?)
    }

    async fn export_rows(&mut self) -> Result<Vec<Record>> {
        if let Some(current) = &self.current {
            return Ok(vec![current.clone()]);
        }
        self.get().await
    }
}
