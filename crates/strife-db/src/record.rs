//! Fetched rows.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::{DbError, Result};
use crate::value::SqlValue;

/// One row returned by a terminal fetch.
///
/// Columns keep the order the statement produced them in. Accessors return
/// `Option`/`Result` instead of quietly yielding an empty value for a column
/// the row does not have.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, SqlValue)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a driver row, keeping each value's storage class.
    pub(crate) fn from_row(row: &SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let mut fields = Vec::with_capacity(row.columns().len());

        for (index, column) in row.columns().iter().enumerate() {
            let raw = row.try_get_raw(index)?;
            let value = if raw.is_null() {
                SqlValue::Null
            } else {
                let type_name = raw.type_info().name().to_owned();
                match type_name.as_str() {
                    "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get(index)?),
                    "REAL" => SqlValue::Float(row.try_get(index)?),
                    "BLOB" => SqlValue::Blob(row.try_get(index)?),
                    _ => SqlValue::Text(row.try_get(index)?),
                }
            };
            fields.push((column.name().to_owned(), value));
        }

        Ok(Self { fields })
    }

    /// Builds a record from a JSON object, in the object's key order.
    pub fn from_json(object: serde_json::Map<String, serde_json::Value>) -> Self {
        object
            .into_iter()
            .map(|(name, value)| (name, SqlValue::from_json(value)))
            .collect()
    }

    /// Returns the value of `field`, if the row has that column.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&SqlValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Returns the value of `field` or `FieldNotFound`.
    pub fn try_get(&self, field: &str) -> Result<&SqlValue> {
        self.get(field)
            .ok_or_else(|| DbError::FieldNotFound(field.to_owned()))
    }

    /// Returns `field` as an integer.
    pub fn get_i64(&self, field: &str) -> Result<Option<i64>> {
        Ok(self.try_get(field)?.as_i64())
    }

    /// Returns `field` as a float.
    pub fn get_f64(&self, field: &str) -> Result<Option<f64>> {
        Ok(self.try_get(field)?.as_f64())
    }

    /// Returns `field` as text.
    pub fn get_str(&self, field: &str) -> Result<Option<&str>> {
        Ok(self.try_get(field)?.as_str())
    }

    /// Returns true if the row has a column named `field`.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Sets `field`, replacing an existing value in place or appending.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<SqlValue>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Removes `field`, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<SqlValue> {
        let index = self.fields.iter().position(|(name, _)| name == field)?;
        Some(self.fields.remove(index).1)
    }

    /// Column names in row order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Values in row order.
    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.fields.iter().map(|(_, value)| value)
    }

    /// `(column, value)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts the record into a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }

    /// Deserializes the record into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl IntoIterator for Record {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (field, value) in iter {
            record.set(field, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
