//! Result rows and row mapping.
//!
//! Executors hand back [`Row`]s of driver-neutral [`Value`]s. Mapping a row
//! into a Rust type goes through [`FromRow`], usually generated with
//! `#[derive(FromRow)]`, which reads each field by column name.

use crate::error::{SqlError, SqlResult};
use crate::value::{FromValue, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One result row: column names plus values in the same order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row. Column names are shared between rows of one result set.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> SqlResult<Self> {
        if columns.len() != values.len() {
            return Err(SqlError::Scan(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw value of a column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    /// Decode a column by name.
    ///
    /// Fails with [`SqlError::Decode`] if the column is missing or the value
    /// does not convert.
    pub fn try_get<T: FromValue>(&self, column: &str) -> SqlResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| SqlError::decode(column, "no such column"))?;
        T::from_value(value.clone()).map_err(|message| SqlError::decode(column, message))
    }

    /// Map every value through `f`, keeping column names.
    pub fn map_values(self, mut f: impl FnMut(&str, Value) -> Value) -> Self {
        let values = self
            .columns
            .iter()
            .zip(self.values)
            .map(|(column, value)| f(column, value))
            .collect();
        Self {
            columns: self.columns,
            values,
        }
    }
}

/// Build `Self` from a [`Row`].
pub trait FromRow: Sized {
    /// Columns read by [`from_row`](Self::from_row), when statically known.
    const COLUMNS: &'static [&'static str] = &[];

    fn from_row(row: &Row) -> SqlResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(row.clone())
    }
}

impl FromRow for BTreeMap<String, Value> {
    fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(row
            .columns
            .iter()
            .cloned()
            .zip(row.values.iter().cloned())
            .collect())
    }
}
