//! Column declarations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SQL column types a migration can declare.
///
/// Serialized in snake case (`varchar`, `tiny_int`, `date_time`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Auto-incrementing integer primary key.
    Increments,
    /// Fixed-length character string.
    Char,
    /// Variable-length character string.
    Varchar,
    /// Short text.
    TinyText,
    /// Text.
    Text,
    /// Medium text.
    MediumText,
    /// Long text.
    LongText,
    /// Fixed-length binary data.
    Binary,
    /// Variable-length binary data.
    #[serde(alias = "varbinary")]
    VarBinary,
    /// Tiny integer.
    TinyInt,
    /// Small integer.
    SmallInt,
    /// Integer.
    Integer,
    /// Medium integer.
    MediumInt,
    /// Big integer.
    BigInt,
    /// Decimal.
    Decimal,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Real.
    Real,
    /// Bit field.
    Bit,
    /// Boolean.
    Boolean,
    /// Serial integer.
    Serial,
    /// Date only.
    Date,
    /// Date and time.
    #[serde(alias = "datetime")]
    DateTime,
    /// Timestamp.
    Timestamp,
    /// Time only.
    Time,
    /// Year.
    Year,
}

impl ColumnType {
    /// Returns the type keyword written into the column definition.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Increments => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::TinyText => "TINYTEXT",
            Self::Text => "TEXT",
            Self::MediumText => "MEDIUMTEXT",
            Self::LongText => "LONGTEXT",
            Self::Binary => "BINARY",
            Self::VarBinary => "VARBINARY",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::MediumInt => "MEDIUMINT",
            Self::BigInt => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Real => "REAL",
            Self::Bit => "BIT",
            Self::Boolean => "BOOLEAN",
            Self::Serial => "SERIAL",
            Self::Date => "DATE",
            Self::DateTime => "DATETIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Time => "TIME",
            Self::Year => "YEAR",
        }
    }

    /// Length used when none is given.
    #[must_use]
    pub const fn default_length(self) -> Option<u32> {
        match self {
            Self::Char | Self::Varchar | Self::TinyText => Some(255),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One declared column.
///
/// Columns are `NOT NULL` and not unique unless marked otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationField {
    name: String,
    column: ColumnType,
    length: Option<u32>,
    nullable: bool,
    unique: bool,
}

impl MigrationField {
    /// Declares `name` with the type's default length.
    #[must_use]
    pub fn new(name: impl Into<String>, column: ColumnType) -> Self {
        Self {
            name: name.into(),
            column,
            length: column.default_length(),
            nullable: false,
            unique: false,
        }
    }

    /// Sets the length written as `TYPE(n)`.
    pub fn length(&mut self, n: u32) -> &mut Self {
        if self.column != ColumnType::Increments {
            self.length = Some(n);
        }
        self
    }

    /// Allows `NULL`.
    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = true;
        self
    }

    /// Adds a `UNIQUE(name)` constraint.
    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        self.column
    }

    /// Returns true when the column carries a unique constraint.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns true when the column accepts `NULL`.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The column definition, `name TYPE(len) NULLABILITY`.
    #[must_use]
    pub fn definition(&self) -> String {
        if self.column == ColumnType::Increments {
            return format!("{} {}", self.name, self.column);
        }

        let length = self.length.map(|n| format!("({n})")).unwrap_or_default();
        let nullability = if self.nullable { "NULL" } else { "NOT NULL" };
        format!("{} {}{length} {nullability}", self.name, self.column)
    }

    /// The `UNIQUE(name)` constraint, when declared.
    #[must_use]
    pub fn constraint(&self) -> Option<String> {
        self.unique.then(|| format!("UNIQUE({})", self.name))
    }

    /// The full fragment, `name TYPE(len) NULLABILITY[, UNIQUE(name)]`.
    #[must_use]
    pub fn fragment(&self) -> String {
        match self.constraint() {
            Some(constraint) => format!("{}, {constraint}", self.definition()),
            None => self.definition(),
        }
    }
}
