//! Migration registry.
//!
//! The [`Migrator`] holds migrations and seeders in registration order and
//! runs them against one [`ConnectionManager`]. Migrations loaded from a
//! directory register in file-name order.

use std::path::{Path, PathBuf};

use strife_db::{ConnectionManager, Migration};
use tracing::{debug, info, warn};

use crate::declaration;
use crate::error::{MigrateError, Result};
use crate::seeder::{self, Seeder};

/// Installation state of one registered table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    /// Table name.
    pub table: String,
    /// Whether the table exists in the database.
    pub installed: bool,
    /// Row count, when installed.
    pub rows: Option<usize>,
}

/// Runs registered migrations and seeders.
#[derive(Default)]
pub struct Migrator {
    migrations: Vec<Box<dyn Migration>>,
    seeders: Vec<Box<dyn Seeder>>,
}

impl Migrator {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every declaration in `dir`, in file-name order.
    pub async fn from_dir(dir: &Path) -> Result<Self> {
        let mut migrator = Self::new();
        for declaration in declaration::load_dir(dir).await? {
            migrator.register(declaration)?;
        }
        Ok(migrator)
    }

    /// Registers a JSON seeder for every file in `dir`, in file-name order.
    pub async fn load_seeders(&mut self, dir: &Path) -> Result<&mut Self> {
        for seeder in seeder::load_dir(dir).await? {
            self.register_seeder(seeder);
        }
        Ok(self)
    }

    /// Registers a migration. Each table may be registered once.
    pub fn register(&mut self, migration: impl Migration + 'static) -> Result<&mut Self> {
        if self.position(migration.table()).is_some() {
            return Err(MigrateError::DuplicateTable(migration.table().to_owned()));
        }
        debug!(table = %migration.table(), "Registered migration");
        self.migrations.push(Box::new(migration));
        Ok(self)
    }

    /// Registers a seeder.
    pub fn register_seeder(&mut self, seeder: impl Seeder + 'static) -> &mut Self {
        debug!(seeder = %seeder.name(), "Registered seeder");
        self.seeders.push(Box::new(seeder));
        self
    }

    /// Registered tables in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.migrations.iter().map(|m| m.table())
    }

    /// Number of registered seeders.
    #[must_use]
    pub fn seeder_count(&self) -> usize {
        self.seeders.len()
    }

    /// Installs every registered table. Existing rows are lost.
    pub async fn migrate(&self, db: &mut ConnectionManager) -> Result<Vec<String>> {
        let mut messages = Vec::with_capacity(self.migrations.len());
        for migration in &self.migrations {
            messages.push(migration.up(db).await?);
        }
        info!(tables = messages.len(), "Migrations applied");
        Ok(messages)
    }

    /// Drops every registered table, in registration order.
    pub async fn rollback(&self, db: &mut ConnectionManager) -> Result<Vec<String>> {
        let mut messages = Vec::with_capacity(self.migrations.len());
        for migration in &self.migrations {
            messages.push(migration.down(db).await?);
        }
        info!(tables = messages.len(), "Migrations rolled back");
        Ok(messages)
    }

    /// Installs one registered table.
    pub async fn table_up(&self, db: &mut ConnectionManager, table: &str) -> Result<String> {
        Ok(self.migration(table)?.up(db).await?)
    }

    /// Drops one registered table.
    pub async fn table_down(&self, db: &mut ConnectionManager, table: &str) -> Result<String> {
        Ok(self.migration(table)?.down(db).await?)
    }

    /// Runs every seeder, returning `(name, rows)` pairs.
    ///
    /// Each seeder runs in its own transaction; a failing seeder is rolled
    /// back and stops the run.
    pub async fn seed(&self, db: &mut ConnectionManager) -> Result<Vec<(String, usize)>> {
        let mut seeded = Vec::with_capacity(self.seeders.len());
        for seeder in &self.seeders {
            db.transact().await?;
            match seeder.run(db).await {
                Ok(rows) => {
                    db.commit().await?;
                    info!(seeder = %seeder.name(), rows, "Seeded");
                    seeded.push((seeder.name().to_owned(), rows));
                }
                Err(err) => {
                    if let Err(rollback) = db.rollback().await {
                        warn!(seeder = %seeder.name(), error = %rollback, "Rollback failed");
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(seeded)
    }

    /// Backs up every registered table into `dir`.
    pub async fn backup_all(&self, db: &mut ConnectionManager, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(self.migrations.len());
        for table in self.tables() {
            paths.push(db.table(table).backup(dir).await?);
        }
        Ok(paths)
    }

    /// Backs up one registered table into `dir`.
    pub async fn backup(
        &self,
        db: &mut ConnectionManager,
        table: &str,
        dir: &Path,
    ) -> Result<PathBuf> {
        let table = self.migration(table)?.table();
        Ok(db.table(table).backup(dir).await?)
    }

    /// Restores every registered table from `dir`, returning `(table, rows)`
    /// pairs.
    pub async fn restore_all(
        &self,
        db: &mut ConnectionManager,
        dir: &Path,
    ) -> Result<Vec<(String, usize)>> {
        let mut restored = Vec::with_capacity(self.migrations.len());
        for table in self.tables() {
            let rows = db.table(table).restore(dir).await?;
            restored.push((table.to_owned(), rows));
        }
        Ok(restored)
    }

    /// Restores one registered table from `dir`.
    pub async fn restore(
        &self,
        db: &mut ConnectionManager,
        table: &str,
        dir: &Path,
    ) -> Result<usize> {
        let table = self.migration(table)?.table();
        Ok(db.table(table).restore(dir).await?)
    }

    /// Reports whether each registered table exists and how many rows it
    /// holds.
    pub async fn status(&self, db: &mut ConnectionManager) -> Result<Vec<TableStatus>> {
        let mut statuses = Vec::with_capacity(self.migrations.len());
        for table in self.tables() {
            let installed = db
                .table("sqlite_master")
                .where_eq("type", "table")
                .where_eq("name", table)
                .exists()
                .await?;
            let rows = if installed {
                Some(db.table(table).count().await?)
            } else {
                None
            };
            statuses.push(TableStatus {
                table: table.to_owned(),
                installed,
                rows,
            });
        }
        Ok(statuses)
    }

    fn position(&self, table: &str) -> Option<usize> {
        self.migrations.iter().position(|m| m.table() == table)
    }

    fn migration(&self, table: &str) -> Result<&dyn Migration> {
        self.position(table)
            .map(|index| self.migrations[index].as_ref())
            .ok_or_else(|| MigrateError::UnknownTable(table.to_owned()))
    }
}
