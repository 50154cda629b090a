//! # strife-migrate
//!
//! Runs table migrations, seeders and backups for `strife-db`.
//!
//! Tables are declared either in Rust, by implementing
//! [`strife_db::Migration`], or in JSON files loaded from a directory (see
//! [`declaration`]). A [`Migrator`] installs and drops them in registration
//! order.
//!
//! ```ignore
//! let mut migrator = Migrator::from_dir(Path::new("migrations")).await?;
//! migrator.register(PostsTable)?;
//! for message in migrator.migrate(&mut db).await? {
//!     println!("{message}");
//! }
//! ```

pub mod cli;
pub mod declaration;
pub mod error;
pub mod migrator;
pub mod seeder;

pub use declaration::{ColumnDeclaration, TableDeclaration};
pub use error::{MigrateError, Result};
pub use migrator::{Migrator, TableStatus};
pub use seeder::{JsonSeeder, Seeder};

/// Re-export of `BoxFuture` for implementing [`Seeder`].
pub use futures::future::BoxFuture;
