//! Table declarations read from JSON files.
//!
//! Each file in the migrations directory declares one table:
//!
//! ```json
//! {
//!     "table": "users",
//!     "columns": [
//!         { "name": "id", "type": "increments" },
//!         { "name": "username", "type": "varchar", "length": 50, "unique": true },
//!         { "name": "bio", "type": "text", "nullable": true }
//!     ]
//! }
//! ```
//!
//! Files are applied in file-name order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strife_db::{ColumnType, Migration, SchemaBuilder};
use tracing::debug;

use crate::error::{MigrateError, Result};

/// One column of a [`TableDeclaration`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDeclaration {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub column: ColumnType,
    /// Length written as `TYPE(n)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Whether the column accepts `NULL`.
    #[serde(default)]
    pub nullable: bool,
    /// Whether the column is unique.
    #[serde(default)]
    pub unique: bool,
}

/// A table declared in a migration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDeclaration {
    /// Table name.
    pub table: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDeclaration>,
}

impl Migration for TableDeclaration {
    fn table(&self) -> &str {
        &self.table
    }

    fn define(&self, schema: &mut SchemaBuilder) {
        for column in &self.columns {
            let field = schema.column(&column.name, column.column);
            if let Some(length) = column.length {
                field.length(length);
            }
            if column.nullable {
                field.nullable();
            }
            if column.unique {
                field.unique();
            }
        }
    }
}

impl TableDeclaration {
    /// Parses a declaration file.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice(&bytes).map_err(|source| MigrateError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Lists the `.json` files of `dir` in file-name order.
pub(crate) async fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !tokio::fs::try_exists(dir).await? {
        return Err(MigrateError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads every declaration in `dir`, in file-name order.
pub async fn load_dir(dir: &Path) -> Result<Vec<TableDeclaration>> {
    let mut declarations = Vec::new();
    for path in json_files(dir).await? {
        let declaration = TableDeclaration::load(&path).await?;
        debug!(table = %declaration.table, path = %path.display(), "Loaded declaration");
        declarations.push(declaration);
    }
    Ok(declarations)
}
