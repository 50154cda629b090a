//! SQL values and parameter handling.
//!
//! Every value that reaches a statement travels as a bound parameter; the
//! inline rendering is kept for `quote()` and diagnostics only.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Serialize, Serializer};

/// A SQL value that can be used as a parameter or read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

/// A value that passed the numeric check, ready for arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

impl SqlValue {
    /// Returns the SQL representation for inline use (escaped).
    ///
    /// **Warning**: Prefer using parameterized queries instead.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => {
                // Escape single quotes by doubling them
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }

    /// Returns true for `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer held by this value.
    ///
    /// Text is accepted when it parses as an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a float when it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.number()? {
            Number::Int(n) => Some(n as f64),
            Number::Float(f) => Some(f),
        }
    }

    /// Returns the text held by this value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for integers, floats, and numeric strings.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.number().is_some()
    }

    pub(crate) fn number(&self) -> Option<Number> {
        match self {
            Self::Int(n) => Some(Number::Int(*n)),
            Self::Float(f) if f.is_finite() => Some(Number::Float(*f)),
            Self::Text(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<i64>() {
                    return Some(Number::Int(n));
                }
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Number::Float)
            }
            _ => None,
        }
    }

    /// Converts the value into its JSON form.
    ///
    /// Blobs become arrays of byte values; non-finite floats become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::from(*n),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
            Self::Blob(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
        }
    }

    /// Builds a value from its JSON form.
    ///
    /// Arrays made only of byte values, including the empty array, come
    /// back as blobs; any other array or object is stored as its JSON text.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => {
                let bytes: Option<Vec<u8>> = items
                    .iter()
                    .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect();
                match bytes {
                    Some(bytes) => Self::Blob(bytes),
                    None => Self::Text(Value::Array(items).to_string()),
                }
            }
            Value::Object(map) => Self::Text(Value::Object(map).to_string()),
        }
    }
}

impl From<Number> for SqlValue {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Self::Int(i),
            Number::Float(f) => Self::Float(f),
        }
    }
}

/// Plain-text rendering used by CSV export.
impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", u8::from(*b)),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Blob(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Blob(b) => serializer.collect_seq(b),
        }
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.format("%Y-%m-%d").to_string())
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl<Tz: TimeZone> ToSqlValue for DateTime<Tz> {
    fn to_sql_value(self) -> SqlValue {
        self.naive_utc().to_sql_value()
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

macro_rules! from_via_to_sql_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    value.to_sql_value()
                }
            }
        )*
    };
}

from_via_to_sql_value!(
    bool,
    i64,
    i32,
    u32,
    f64,
    f32,
    String,
    &str,
    Vec<u8>,
    &[u8],
    NaiveDate,
    NaiveDateTime,
);

impl<T: ToSqlValue> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.to_sql_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_inline_text_escaping() {
        assert_eq!(
            SqlValue::Text(String::from("O'Brien")).to_sql_inline(),
            "'O''Brien'"
        );
        let malicious = SqlValue::from("'; DROP TABLE users; --");
        assert_eq!(malicious.to_sql_inline(), "'''; DROP TABLE users; --'");
    }

    #[test]
    fn test_sql_value_inline_blob() {
        assert_eq!(
            SqlValue::Blob(vec![0x48, 0x45, 0x4C, 0x4C, 0x4F]).to_sql_inline(),
            "X'48454C4C4F'"
        );
    }

    #[test]
    fn test_numeric_detection() {
        assert!(SqlValue::Int(5).is_numeric());
        assert!(SqlValue::Float(2.5).is_numeric());
        assert!(SqlValue::from(" 42 ").is_numeric());
        assert!(SqlValue::from("3.75").is_numeric());
        assert!(!SqlValue::from("bob").is_numeric());
        assert!(!SqlValue::Null.is_numeric());
        assert!(!SqlValue::Bool(true).is_numeric());
        assert_eq!(SqlValue::from("7").as_i64(), Some(7));
        assert_eq!(SqlValue::Int(3).as_f64(), Some(3.0));
    }

    #[test]
    fn test_json_conversion() {
        let blob = SqlValue::Blob(vec![1, 2, 255]);
        assert_eq!(SqlValue::from_json(blob.to_json()), blob);
        let empty = SqlValue::Blob(Vec::new());
        assert_eq!(SqlValue::from_json(empty.to_json()), empty);
        assert_eq!(
            SqlValue::from_json(serde_json::json!([1, 256])),
            SqlValue::Text(String::from("[1,256]"))
        );
        assert_eq!(
            SqlValue::from_json(serde_json::json!(12)),
            SqlValue::Int(12)
        );
        assert_eq!(
            SqlValue::from_json(serde_json::json!(1.5)),
            SqlValue::Float(1.5)
        );
        assert_eq!(
            SqlValue::from_json(serde_json::json!({"a": 1})),
            SqlValue::Text(String::from("{\"a\":1}"))
        );
        assert_eq!(SqlValue::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_display_for_csv() {
        assert_eq!(SqlValue::Null.to_string(), "");
        assert_eq!(SqlValue::Bool(true).to_string(), "1");
        assert_eq!(SqlValue::Int(-4).to_string(), "-4");
        assert_eq!(SqlValue::from("x").to_string(), "x");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(SqlValue::from(42_i32), SqlValue::Int(42));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("a")), SqlValue::Text(String::from("a")));
        let date = NaiveDate::from_ymd_opt(2015, 11, 10).unwrap();
        assert_eq!(
            SqlValue::from(date),
            SqlValue::Text(String::from("2015-11-10"))
        );
    }
}
