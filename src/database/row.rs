use chrono::NaiveDateTime;
use rusqlite::types::ValueRef;

use crate::error::ReportError;

/// Accepted textual timestamp layouts, most specific first.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A scalar cell as returned by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// One result row: column names paired with values, in select-list order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

/// Rows in database return order.
pub type ResultSet = Vec<Row>;

impl Row {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.cells.push((column.into(), value));
    }

    #[cfg(test)]
    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.push(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    fn require(&self, column: &str) -> Result<&Value, ReportError> {
        self.get(column)
            .ok_or_else(|| ReportError::Database(format!("column `{column}` missing from result")))
    }

    /// Non-null text column.
    pub fn text(&self, column: &str) -> Result<String, ReportError> {
        self.opt_text(column)?
            .ok_or_else(|| ReportError::Database(format!("column `{column}` is unexpectedly NULL")))
    }

    /// Nullable text column. Numbers are accepted and stringified.
    pub fn opt_text(&self, column: &str) -> Result<Option<String>, ReportError> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            Value::Integer(i) => Ok(Some(i.to_string())),
            Value::Real(f) => Ok(Some(f.to_string())),
            Value::Blob(_) => Err(ReportError::Database(format!(
                "column `{column}` holds binary data, expected text"
            ))),
        }
    }

    /// Non-null timestamp column.
    pub fn timestamp(&self, column: &str) -> Result<NaiveDateTime, ReportError> {
        self.opt_timestamp(column)?
            .ok_or_else(|| ReportError::Database(format!("column `{column}` is unexpectedly NULL")))
    }

    pub fn opt_timestamp(&self, column: &str) -> Result<Option<NaiveDateTime>, ReportError> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Text(s) => parse_timestamp(s).map(Some).ok_or_else(|| {
                ReportError::Database(format!("column `{column}` is not a timestamp: {s:?}"))
            }),
            other => Err(ReportError::Database(format!(
                "column `{column}` is not a timestamp: {other:?}"
            ))),
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
