use rusqlite::{Connection, OpenFlags, params_from_iter};
use tracing::debug;

use super::row::{ResultSet, Row, Value};
use crate::error::ReportError;

/// A static SQL statement plus the clock values bound into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub name: &'static str,
    pub sql: &'static str,
    pub params: Vec<String>,
}

impl Query {
    pub fn new(name: &'static str, sql: &'static str) -> Self {
        Self {
            name,
            sql,
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self
    }
}

/// Anything that can execute a [`Query`] and hand back materialized rows.
pub trait RowSource {
    fn fetch(&self, query: &Query) -> Result<ResultSet, ReportError>;
}

impl<S: RowSource + ?Sized> RowSource for &S {
    fn fetch(&self, query: &Query) -> Result<ResultSet, ReportError> {
        (**self).fetch(query)
    }
}

/// Read-only SQLite fetcher. Each call opens its own connection, which is
/// dropped (and closed) before `fetch` returns on every path.
pub struct SqliteFetcher {
    connection_string: String,
}

impl SqliteFetcher {
    /// `connection_string` is a database path or a `file:` URI.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }

    fn connect(&self) -> Result<Connection, ReportError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Connection::open_with_flags(&self.connection_string, flags)
            .map_err(|e| ReportError::Database(format!("cannot open database: {e}")))
    }
}

impl RowSource for SqliteFetcher {
    fn fetch(&self, query: &Query) -> Result<ResultSet, ReportError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(query.sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
        let mut result = ResultSet::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                record.push(column.as_str(), Value::from(row.get_ref(idx)?));
            }
            result.push(record);
        }

        debug!(query = query.name, rows = result.len(), "query executed");
        Ok(result)
    }
}
