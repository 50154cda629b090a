//! # strife-db
//!
//! Active-record query building and schema migrations over SQLite.
//!
//! This crate provides:
//! - `ConnectionManager` owning the single, lazily opened connection
//! - `QueryBuilder`, a chainable query session with terminal reads, writes,
//!   counters, dynamic calls, backups and exports
//! - `Model` for entities bound to one table
//! - `SchemaBuilder` and `Migration` for declaring and installing tables
//!
//! ## Quick Start
//!
//! ```ignore
//! use strife_db::{ConnectionConfig, ConnectionManager, Model};
//!
//! struct User;
//!
//! impl Model for User {
//!     const TABLE: &'static str = "users";
//! }
//!
//! async fn example() -> strife_db::Result<()> {
//!     let mut db = ConnectionManager::new(ConnectionConfig::sqlite("app.db"));
//!
//!     let id = User::objects(&mut db)
//!         .insert([("username", "bob"), ("email", "bob@example.com")])
//!         .await?;
//!
//!     let mut users = User::objects(&mut db);
//!     users.find(id).await?;
//!     users.increment("logins", 1).await?;
//!
//!     let admins = User::objects(&mut db)
//!         .where_eq("role", "admin")
//!         .or_where_eq("role", "owner")?
//!         .order_by("id", "desc")?
//!         .get()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Dynamic Calls
//!
//! Names such as `whereUsername`, `orWhereEmail`, `incrementScore`,
//! `decrementStock`, `pullName` and `orderById` resolve to the matching
//! named operation:
//!
//! ```ignore
//! let mut users = User::objects(&mut db);
//! users.call("whereUsername", vec!["bob".into()]).await?;
//! let email = users.call("pullEmail", vec![]).await?;
//! ```

mod builder;
mod config;
mod connection;
mod error;
mod model;
pub mod query;
mod record;
pub mod schema;
mod value;

pub use builder::{CsvOptions, Dispatched, QueryBuilder};
pub use config::{ConnectionConfig, IN_MEMORY};
pub use connection::ConnectionManager;
pub use error::{DbError, Result};
pub use model::Model;
pub use query::{DynamicCall, DynamicVerb, OrderDirection, QueryState};
pub use record::Record;
pub use schema::{ColumnType, Migration, MigrationField, SchemaBuilder};
pub use value::{SqlValue, ToSqlValue};
