//! Seeders fill freshly migrated tables with rows.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use strife_db::{ConnectionManager, Record};
use tracing::debug;

use crate::declaration::json_files;
use crate::error::Result;

/// Inserts a fixed set of rows into the database.
///
/// # Example
///
/// ```ignore
/// struct AdminSeeder;
///
/// impl Seeder for AdminSeeder {
///     fn name(&self) -> &str {
///         "admins"
///     }
///
///     fn run<'a>(&'a self, db: &'a mut ConnectionManager) -> BoxFuture<'a, strife_db::Result<usize>> {
///         Box::pin(async move {
///             db.table("users").insert([("username", "root")]).await?;
///             Ok(1)
///         })
///     }
/// }
/// ```
pub trait Seeder: Send + Sync {
    /// Name shown in logs and command output.
    fn name(&self) -> &str;

    /// Inserts the rows, returning how many were written.
    fn run<'a>(&'a self, db: &'a mut ConnectionManager) -> BoxFuture<'a, strife_db::Result<usize>>;
}

/// Seeds a table from a JSON array of row objects.
///
/// The file uses the same shape as a table backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSeeder {
    table: String,
    path: PathBuf,
}

impl JsonSeeder {
    /// Seeds `table` from the file at `path`.
    #[must_use]
    pub fn new(table: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
            path: path.into(),
        }
    }

    /// Seeds the table named by the file stem, so `seeds/users.json` seeds
    /// `users`. Returns `None` when the path has no usable stem.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let table = path.file_stem()?.to_str()?;
        Some(Self::new(table, path))
    }

    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Source file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Seeder for JsonSeeder {
    fn name(&self) -> &str {
        &self.table
    }

    fn run<'a>(&'a self, db: &'a mut ConnectionManager) -> BoxFuture<'a, strife_db::Result<usize>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&self.path).await?;
            let rows: Vec<serde_json::Map<String, serde_json::Value>> =
                serde_json::from_slice(&bytes)?;

            let total = rows.len();
            let mut table = db.table(self.table.as_str());
            for row in rows {
                table.create_from(Record::from_json(row)).await?;
            }
            debug!(table = %self.table, rows = total, "Seeded table");
            Ok(total)
        })
    }
}

/// Builds one [`JsonSeeder`] per `.json` file in `dir`, in file-name order.
pub async fn load_dir(dir: &Path) -> Result<Vec<JsonSeeder>> {
    Ok(json_files(dir)
        .await?
        .into_iter()
        .filter_map(|path| JsonSeeder::from_path(&path))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_from_file_stem() {
        let seeder = JsonSeeder::from_path(Path::new("seeds/users.json")).unwrap();
        assert_eq!(seeder.table(), "users");
        assert_eq!(seeder.name(), "users");
        assert_eq!(seeder.path(), Path::new("seeds/users.json"));
    }

    #[tokio::test]
    async fn test_load_dir_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("users.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let seeders = load_dir(dir.path()).await.unwrap();
        assert_eq!(seeders.len(), 1);
        assert_eq!(seeders[0].table(), "users");
    }
}
