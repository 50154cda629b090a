//! Connection configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnectOptions;

use crate::error::{DbError, Result};

/// Database name that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Credentials and settings for the single database connection.
///
/// Set once at startup. Only the `sqlite` driver is available; `host`,
/// `port`, `username`, `password` and `charset` are carried for the record
/// and ignored by SQLite, which stores text as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Driver name.
    pub driver: String,
    /// Server host.
    pub host: String,
    /// Database file path, or `:memory:`.
    pub database: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Connection charset.
    pub charset: String,
    /// Server port.
    pub port: u16,
    /// How long a statement waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: String::from("sqlite"),
            host: String::from("localhost"),
            database: String::from(IN_MEMORY),
            username: String::new(),
            password: String::new(),
            charset: String::from("utf8"),
            port: 0,
            busy_timeout_ms: 5_000,
        }
    }
}

impl ConnectionConfig {
    /// Configuration for a SQLite database file (or `:memory:`).
    #[must_use]
    pub fn sqlite(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Configuration for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Parses a `sqlite:` URL such as `sqlite:db.sqlite3`,
    /// `sqlite://data/app.db` or `sqlite::memory:`.
    pub fn from_url(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once(':')
            .ok_or_else(|| DbError::UnsupportedDriver(url.to_owned()))?;
        if scheme != "sqlite" {
            return Err(DbError::UnsupportedDriver(scheme.to_owned()));
        }

        let database = rest.strip_prefix("//").unwrap_or(rest);
        let database = match database {
            "" | ":memory:" => IN_MEMORY,
            path => path.split('?').next().unwrap_or(path),
        };
        Ok(Self::sqlite(database))
    }

    /// Sets the busy timeout.
    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns true when the database lives only in memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }

    /// Builds the driver options for this configuration.
    pub fn connect_options(&self) -> Result<SqliteConnectOptions> {
        if !self.driver.eq_ignore_ascii_case("sqlite") {
            return Err(DbError::UnsupportedDriver(self.driver.clone()));
        }

        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(DbError::Connection)?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database)
                .create_if_missing(true)
        };

        Ok(options
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms)))
    }
}
