//! Table declarations and their install/uninstall actions.
//!
//! A migration describes one table as an ordered list of typed column
//! declarations. Declaration order becomes column order.
//!
//! # Example
//!
//! ```ignore
//! struct UsersTable;
//!
//! impl Migration for UsersTable {
//!     fn table(&self) -> &str {
//!         "users"
//!     }
//!
//!     fn define(&self, schema: &mut SchemaBuilder) {
//!         schema.increments("id");
//!         schema.varchar("username").length(50).unique();
//!         schema.varchar("email").unique();
//!         schema.timestamp("created_at").nullable();
//!     }
//! }
//!
//! let message = UsersTable.up(&mut db).await?;
//! assert_eq!(message, "Table 'users' migrated.");
//! ```

mod column;

pub use column::{ColumnType, MigrationField};

use futures::future::BoxFuture;
use tracing::info;

use crate::connection::ConnectionManager;
use crate::error::{DbError, Result};

/// A table's declared column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaBuilder {
    table: String,
    fields: Vec<MigrationField>,
}

macro_rules! column_methods {
    ($($(#[$doc:meta])* $method:ident => $column:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $method(&mut self, name: &str) -> &mut MigrationField {
                self.column(name, ColumnType::$column)
            }
        )*
    };
}

impl SchemaBuilder {
    /// Starts an empty declaration for `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declares a column. Redeclaring a name replaces it in place.
    pub fn column(&mut self, name: &str, column: ColumnType) -> &mut MigrationField {
        let field = MigrationField::new(name, column);
        let index = match self.fields.iter().position(|f| f.name() == name) {
            Some(index) => {
                self.fields[index] = field;
                index
            }
            None => {
                self.fields.push(field);
                self.fields.len() - 1
            }
        };
        &mut self.fields[index]
    }

    column_methods! {
        /// `INTEGER PRIMARY KEY AUTOINCREMENT`.
        increments => Increments,
        /// `CHAR(255)` unless a length is set.
        char => Char,
        /// `VARCHAR(255)` unless a length is set.
        varchar => Varchar,
        /// `TINYTEXT(255)` unless a length is set.
        tiny_text => TinyText,
        text => Text,
        medium_text => MediumText,
        long_text => LongText,
        binary => Binary,
        var_binary => VarBinary,
        tiny_int => TinyInt,
        small_int => SmallInt,
        integer => Integer,
        medium_int => MediumInt,
        big_int => BigInt,
        decimal => Decimal,
        float => Float,
        double => Double,
        real => Real,
        bit => Bit,
        boolean => Boolean,
        serial => Serial,
        date => Date,
        datetime => DateTime,
        timestamp => Timestamp,
        time => Time,
        year => Year,
    }

    /// Declared columns in order.
    #[must_use]
    pub fn fields(&self) -> &[MigrationField] {
        &self.fields
    }

    /// Returns true when no column is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `(name, fragment)` pairs in declaration order.
    #[must_use]
    pub fn dictionary(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|field| (field.name().to_owned(), field.fragment()))
            .collect()
    }

    /// Renders the CREATE TABLE statement.
    ///
    /// Column definitions come first in declaration order, followed by the
    /// unique constraints in the same order.
    pub fn create_statement(&self) -> Result<String> {
        if self.fields.is_empty() {
            return Err(DbError::EmptyDefinition(self.table.clone()));
        }

        let definitions = self.fields.iter().map(MigrationField::definition);
        let constraints = self.fields.iter().filter_map(MigrationField::constraint);
        let body: Vec<String> = definitions.chain(constraints).collect();
        Ok(format!("CREATE TABLE {} ({})", self.table, body.join(", ")))
    }

    /// Renders the DROP TABLE statement.
    #[must_use]
    pub fn drop_statement(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table)
    }

    /// Drops the table if present and creates it from the declaration.
    ///
    /// Any existing rows are lost.
    pub async fn install(&self, db: &mut ConnectionManager) -> Result<String> {
        let create = self.create_statement()?;
        self.run(db, &self.drop_statement()).await?;
        self.run(db, &create).await?;
        info!(table = %self.table, columns = self.fields.len(), "Migrated table");
        Ok(format!("Table '{}' migrated.", self.table))
    }

    /// Drops the table if present.
    pub async fn uninstall(&self, db: &mut ConnectionManager) -> Result<String> {
        self.run(db, &self.drop_statement()).await?;
        info!(table = %self.table, "Rolled back table");
        Ok(format!("Table '{}' rolled back.", self.table))
    }

    async fn run(&self, db: &mut ConnectionManager, sql: &str) -> Result<()> {
        match db.execute(sql, Vec::new()).await {
            Ok(_) => Ok(()),
            Err(DbError::Database(source)) => Err(DbError::Migration {
                table: self.table.clone(),
                source,
            }),
            Err(err) => Err(err),
        }
    }
}

/// Declarative description of one table.
pub trait Migration: Send + Sync {
    /// Table the migration manages.
    fn table(&self) -> &str;

    /// Declares the table's columns.
    fn define(&self, schema: &mut SchemaBuilder);

    /// Builds the declared schema.
    fn schema(&self) -> SchemaBuilder {
        let mut schema = SchemaBuilder::new(self.table());
        self.define(&mut schema);
        schema
    }

    /// Installs the declared table.
    fn up<'a>(&'a self, db: &'a mut ConnectionManager) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let schema = self.schema();
            schema.install(db).await
        })
    }

    /// Drops the declared table.
    fn down<'a>(&'a self, db: &'a mut ConnectionManager) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let schema = self.schema();
            schema.uninstall(db).await
        })
    }
}
