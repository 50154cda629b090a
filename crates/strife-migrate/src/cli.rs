//! Command-line front-end.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strife_db::{ConnectionConfig, ConnectionManager};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::error::Result;
use crate::migrator::Migrator;

/// Table migrations, seeders and backups for SQLite.
#[derive(Debug, Parser)]
#[command(name = "strife-migrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    pub database: String,

    /// Directory of table declaration files.
    #[arg(short, long, default_value = "migrations")]
    pub migrations_dir: PathBuf,

    /// Directory of seed files.
    #[arg(short, long, default_value = "seeds")]
    pub seeds_dir: PathBuf,

    /// Directory holding table backups.
    #[arg(short, long, env = "STRIFE_BACKUP_DIR", default_value = "storage/backups")]
    pub backup_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Install every declared table. Existing rows are lost.
    Migrate,

    /// Drop every declared table.
    Rollback,

    /// Install one declared table.
    TableUp {
        /// Table name.
        table: String,
    },

    /// Drop one declared table.
    TableDown {
        /// Table name.
        table: String,
    },

    /// Insert the rows of every seed file.
    Seed,

    /// Write table rows to the backup directory.
    Backup {
        /// Table to back up (all if not specified).
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Re-insert table rows from the backup directory.
    Restore {
        /// Table to restore (all if not specified).
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Show whether each declared table exists.
    Status,
}

/// Installs the global `fmt` subscriber.
pub fn init_tracing(verbose: bool) -> std::result::Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// Runs one command against the configured database.
pub async fn run(cli: Cli) -> Result<()> {
    let config = ConnectionConfig::from_url(&cli.database)?;
    let mut db = ConnectionManager::new(config);
    let mut migrator = Migrator::from_dir(&cli.migrations_dir).await?;

    match cli.command {
        Commands::Migrate => {
            for message in migrator.migrate(&mut db).await? {
                println!("{message}");
            }
        }

        Commands::Rollback => {
            for message in migrator.rollback(&mut db).await? {
                println!("{message}");
            }
        }

        Commands::TableUp { table } => {
            println!("{}", migrator.table_up(&mut db, &table).await?);
        }

        Commands::TableDown { table } => {
            println!("{}", migrator.table_down(&mut db, &table).await?);
        }

        Commands::Seed => {
            migrator.load_seeders(&cli.seeds_dir).await?;
            for (name, rows) in migrator.seed(&mut db).await? {
                println!("Seeded '{name}' with {rows} row(s).");
            }
        }

        Commands::Backup { table } => {
            let paths = match table {
                Some(table) => vec![migrator.backup(&mut db, &table, &cli.backup_dir).await?],
                None => migrator.backup_all(&mut db, &cli.backup_dir).await?,
            };
            for path in paths {
                println!("Backed up to {}", path.display());
            }
        }

        Commands::Restore { table } => {
            let restored = match table {
                Some(table) => {
                    let rows = migrator.restore(&mut db, &table, &cli.backup_dir).await?;
                    vec![(table, rows)]
                }
                None => migrator.restore_all(&mut db, &cli.backup_dir).await?,
            };
            for (table, rows) in restored {
                println!("Restored {rows} row(s) into '{table}'.");
            }
        }

        Commands::Status => {
            println!("\nDeclared tables:");
            println!("{:-<60}", "");
            for status in migrator.status(&mut db).await? {
                match status.rows {
                    Some(rows) => println!(" [X] {} ({rows} rows)", status.table),
                    None => println!(" [ ] {}", status.table),
                }
            }
            println!();
        }
    }

    db.close().await?;
    info!("Done.");
    Ok(())
}
