//! Hydration Rows - Ordered column/value mappings handed to the engine
//!
//! A `Row` is one tuple of a query result. Column order is preserved as
//! supplied; lookups are by name.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{HydrationError, HydrationResult};
use crate::value::ColumnValue;

/// One tuple of a query result: an ordered mapping of column name to value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, ColumnValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column insertion
    pub fn with_column<V: Into<ColumnValue>>(mut self, name: &str, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a column, replacing the value in place if the column already exists
    pub fn insert<V: Into<ColumnValue>>(&mut self, name: &str, value: V) {
        let value = value.into();
        match self.columns.iter_mut().find(|(column, _)| column == name) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((name.to_string(), value)),
        }
    }

    /// Get a column value by name
    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Get a column value by name, treating SQL NULL as absent
    pub fn get_non_null(&self, name: &str) -> Option<&ColumnValue> {
        self.get(name).filter(|value| !value.is_null())
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get column names in supply order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(column, _)| column.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.columns.iter().map(|(column, value)| (column.as_str(), value))
    }

    /// Get a typed value from a column
    pub fn get_as<T: DeserializeOwned>(&self, column: &str) -> HydrationResult<T> {
        let value = self.get(column).ok_or_else(|| HydrationError::ColumnNotFound {
            column: column.to_string(),
        })?;

        serde_json::from_value(value.to_json()).map_err(|e| HydrationError::Conversion {
            column: column.to_string(),
            message: e.to_string(),
        })
    }

    /// Try to get an optional typed value; missing and NULL columns yield `None`
    pub fn try_get_as<T: DeserializeOwned>(&self, column: &str) -> HydrationResult<Option<T>> {
        match self.get_non_null(column) {
            Some(_) => self.get_as(column).map(Some),
            None => Ok(None),
        }
    }

    /// Convert row to a JSON object
    pub fn to_json(&self) -> JsonValue {
        let map: serde_json::Map<String, JsonValue> = self
            .columns
            .iter()
            .map(|(column, value)| (column.clone(), value.to_json()))
            .collect();
        JsonValue::Object(map)
    }

    /// Build a row from a JSON object, keeping the object's key order
    pub fn from_json(json: JsonValue) -> HydrationResult<Self> {
        match json {
            JsonValue::Object(map) => Ok(map
                .into_iter()
                .map(|(column, value)| (column, ColumnValue::from_json(value)))
                .collect()),
            other => Err(HydrationError::Serialization(format!(
                "Expected a JSON object for a row, got: {}",
                other
            ))),
        }
    }

    /// Convert a PostgreSQL row into a hydration row
    pub fn from_pg_row(row: &sqlx::postgres::PgRow) -> Self {
        use sqlx::{Column, Row as _, TypeInfo};

        let mut columns = Vec::with_capacity(row.columns().len());

        for (i, column) in row.columns().iter().enumerate() {
            // Try the common PostgreSQL types in turn
            let value = if let Ok(value) = row.try_get::<Option<String>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<i64>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<i32>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<i16>, _>(i) {
                value.map(i32::from).into()
            } else if let Ok(value) = row.try_get::<Option<f64>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<f32>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<bool>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<chrono::NaiveDate>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<chrono::NaiveTime>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<uuid::Uuid>, _>(i) {
                value.into()
            } else if let Ok(value) = row.try_get::<Option<JsonValue>, _>(i) {
                value.map(ColumnValue::Json).unwrap_or(ColumnValue::Null)
            } else if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(i) {
                value.into()
            } else {
                unsupported_column(column.name(), column.type_info().name())
            };

            columns.push((column.name().to_string(), value));
        }

        Self { columns }
    }
}

/// Placeholder for a column whose type has no `ColumnValue` mapping
fn unsupported_column(column: &str, type_name: &str) -> ColumnValue {
    tracing::debug!(
        column = column,
        column_type = type_name,
        "Unsupported column type, reading as NULL"
    );
    ColumnValue::Null
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<ColumnValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            let column: String = column.into();
            row.insert(&column, value);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, ColumnValue);
    type IntoIter = std::vec::IntoIter<(String, ColumnValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}
