//! Untyped rows as they travel between an execution context and an [`Entity`](crate::Entity).

use rusqlite::{
    types::{FromSql, Value, ValueRef},
    Row,
};

use crate::error::{DbError, Result};

/// One stored row: column names paired with their values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every column of a SQLite row.
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let stmt = row.as_ref();
        let mut columns = Vec::with_capacity(stmt.column_count());
        for (idx, name) in stmt.column_names().into_iter().enumerate() {
            columns.push((name.to_string(), row.get::<_, Value>(idx)?));
        }
        Ok(Self { columns })
    }

    /// Sets `column`, replacing an existing value of the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Reads `column` as `T`.
    pub fn get<T: FromSql>(&self, column: &str) -> Result<T> {
        let value = self.value(column).ok_or_else(|| DbError::Decode {
            column: column.to_string(),
            reason: "column not present in row".to_string(),
        })?;
        decode_value(value).map_err(|reason| DbError::Decode {
            column: column.to_string(),
            reason,
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Converts a stored value into a field type, reporting why it does not fit.
pub fn decode_value<T: FromSql>(value: &Value) -> std::result::Result<T, String> {
    T::column_result(ValueRef::from(value)).map_err(|e| e.to_string())
}

/// Extracts an integer key, the only key type relationships follow.
pub(crate) fn as_key(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(key) => Some(*key),
        _ => None,
    }
}
