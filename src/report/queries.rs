//! The four report queries and the typed records they decode into.
//!
//! "Now" is not read inside SQL. The evaluation instant is captured once per
//! run and bound into every query so that all four sections agree on the
//! same clock. Timestamps go through `datetime()` on both sides of every
//! comparison so that `T`-separated and space-separated values compare
//! correctly.

use chrono::{Duration, NaiveDateTime};

use crate::database::{Query, ResultSet, Row, RowSource};
use crate::error::ReportError;

const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MISSED_RUNS_SQL: &str = "
    SELECT t.trigger_name, t.process_name,
           datetime(t.last_run) AS last_run, datetime(st.next_run) AS next_run
    FROM Triggers t
    JOIN Scheduled_Triggers st ON t.id = st.id
    WHERE datetime(t.last_run) < datetime(st.next_run)
      AND datetime(?1) > datetime(st.next_run)
    ORDER BY t.trigger_name";

const PROCESS_FAILURES_SQL: &str = "
    SELECT t.trigger_name, t.process_name,
           datetime(t.last_run) AS last_run, t.process_status
    FROM Triggers t
    WHERE t.process_status = 'Failed'
      AND datetime(t.last_run) > datetime(?1)
    ORDER BY t.trigger_name";

const PROCESS_STATUS_SQL: &str = "
    SELECT t.trigger_name, t.process_status,
           datetime(st.next_run) AS next_run, datetime(t.last_run) AS last_run
    FROM Triggers t
    JOIN Scheduled_Triggers st ON t.id = st.id
    WHERE t.last_run IS NOT NULL
    ORDER BY t.trigger_name";

const OVERDUE_PROCESSES_SQL: &str = "
    SELECT t.trigger_name, t.process_name,
           datetime(st.next_run) AS next_run, datetime(t.last_run) AS last_run
    FROM Triggers t
    JOIN Scheduled_Triggers st ON t.id = st.id
    WHERE datetime(st.next_run) < datetime(?1)
    ORDER BY t.trigger_name";

/// A record with a column set fixed at compile time.
///
/// Only columns a query's predicate guarantees to be non-null are decoded
/// strictly; everything else is optional and renders as an empty cell, so a
/// single bad orchestrator row cannot abort the report.
pub trait ReportRecord: Sized {
    /// Column names in select-list order.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row) -> Result<Self, ReportError>;

    /// Display text for each column, in [`Self::COLUMNS`] order. Not escaped.
    fn cells(&self) -> Vec<String>;
}

/// A scheduled run whose time has passed without the trigger recording a
/// run after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissedRun {
    pub trigger_name: Option<String>,
    pub process_name: Option<String>,
    pub last_run: NaiveDateTime,
    pub next_run: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    pub trigger_name: Option<String>,
    pub process_name: Option<String>,
    pub last_run: NaiveDateTime,
    pub process_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStatus {
    pub trigger_name: Option<String>,
    pub process_status: Option<String>,
    pub next_run: Option<NaiveDateTime>,
    /// `None` when the stored value is not a timestamp `datetime()` accepts.
    pub last_run: Option<NaiveDateTime>,
}

/// A trigger whose next scheduled run lies in the past, regardless of its
/// last run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueProcess {
    pub trigger_name: Option<String>,
    pub process_name: Option<String>,
    pub next_run: NaiveDateTime,
    pub last_run: Option<NaiveDateTime>,
}

fn show(ts: &NaiveDateTime) -> String {
    ts.format(DISPLAY_TIMESTAMP_FORMAT).to_string()
}

fn show_opt(ts: &Option<NaiveDateTime>) -> String {
    ts.as_ref().map(show).unwrap_or_default()
}

fn text_or_blank(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl ReportRecord for MissedRun {
    const COLUMNS: &'static [&'static str] =
        &["trigger_name", "process_name", "last_run", "next_run"];

    fn from_row(row: &Row) -> Result<Self, ReportError> {
        Ok(Self {
            trigger_name: row.opt_text("trigger_name")?,
            process_name: row.opt_text("process_name")?,
            last_run: row.timestamp("last_run")?,
            next_run: row.timestamp("next_run")?,
        })
    }

    fn cells(&self) -> Vec<String> {
        vec![
            text_or_blank(&self.trigger_name),
            text_or_blank(&self.process_name),
            show(&self.last_run),
            show(&self.next_run),
        ]
    }
}

impl ReportRecord for ProcessFailure {
    const COLUMNS: &'static [&'static str] =
        &["trigger_name", "process_name", "last_run", "process_status"];

    fn from_row(row: &Row) -> Result<Self, ReportError> {
        Ok(Self {
            trigger_name: row.opt_text("trigger_name")?,
            process_name: row.opt_text("process_name")?,
            last_run: row.timestamp("last_run")?,
            process_status: row.text("process_status")?,
        })
    }

    fn cells(&self) -> Vec<String> {
        vec![
            text_or_blank(&self.trigger_name),
            text_or_blank(&self.process_name),
            show(&self.last_run),
            self.process_status.clone(),
        ]
    }
}

impl ReportRecord for ProcessStatus {
    const COLUMNS: &'static [&'static str] =
        &["trigger_name", "process_status", "next_run", "last_run"];

    fn from_row(row: &Row) -> Result<Self, ReportError> {
        Ok(Self {
            trigger_name: row.opt_text("trigger_name")?,
            process_status: row.opt_text("process_status")?,
            next_run: row.opt_timestamp("next_run")?,
            last_run: row.opt_timestamp("last_run")?,
        })
    }

    fn cells(&self) -> Vec<String> {
        vec![
            text_or_blank(&self.trigger_name),
            text_or_blank(&self.process_status),
            show_opt(&self.next_run),
            show_opt(&self.last_run),
        ]
    }
}

impl ReportRecord for OverdueProcess {
    const COLUMNS: &'static [&'static str] =
        &["trigger_name", "process_name", "next_run", "last_run"];

    fn from_row(row: &Row) -> Result<Self, ReportError> {
        Ok(Self {
            trigger_name: row.opt_text("trigger_name")?,
            process_name: row.opt_text("process_name")?,
            next_run: row.timestamp("next_run")?,
            last_run: row.opt_timestamp("last_run")?,
        })
    }

    fn cells(&self) -> Vec<String> {
        vec![
            text_or_blank(&self.trigger_name),
            text_or_blank(&self.process_name),
            show(&self.next_run),
            show_opt(&self.last_run),
        ]
    }
}

/// Maps driver rows into typed records, rejecting any drift from the
/// expected column list.
fn decode<R: ReportRecord>(query: &Query, rows: ResultSet) -> Result<Vec<R>, ReportError> {
    rows.iter()
        .map(|row| {
            if !row.column_names().eq(R::COLUMNS.iter().copied()) {
                let found: Vec<&str> = row.column_names().collect();
                return Err(ReportError::Database(format!(
                    "query `{}` returned columns {found:?}, expected {:?}",
                    query.name,
                    R::COLUMNS
                )));
            }
            R::from_row(row)
        })
        .collect()
}

pub fn missed_runs_query(now: NaiveDateTime) -> Query {
    Query::new("missed_runs", MISSED_RUNS_SQL).bind(now.format(SQL_TIMESTAMP_FORMAT).to_string())
}

pub fn process_failures_query(now: NaiveDateTime, window_days: u32) -> Query {
    let cutoff = now - Duration::days(i64::from(window_days));
    Query::new("process_failures", PROCESS_FAILURES_SQL)
        .bind(cutoff.format(SQL_TIMESTAMP_FORMAT).to_string())
}

pub fn process_status_query() -> Query {
    Query::new("process_status", PROCESS_STATUS_SQL)
}

pub fn overdue_processes_query(now: NaiveDateTime) -> Query {
    Query::new("overdue_processes", OVERDUE_PROCESSES_SQL)
        .bind(now.format(SQL_TIMESTAMP_FORMAT).to_string())
}

/// Runs the report queries against a [`RowSource`] at a fixed evaluation
/// instant.
pub struct ReportQueries<S> {
    source: S,
    evaluated_at: NaiveDateTime,
    failure_window_days: u32,
}

impl<S: RowSource> ReportQueries<S> {
    pub fn new(source: S, evaluated_at: NaiveDateTime, failure_window_days: u32) -> Self {
        Self {
            source,
            evaluated_at,
            failure_window_days,
        }
    }

    pub fn evaluated_at(&self) -> NaiveDateTime {
        self.evaluated_at
    }

    pub fn failure_window_days(&self) -> u32 {
        self.failure_window_days
    }

    fn run<R: ReportRecord>(&self, query: Query) -> Result<Vec<R>, ReportError> {
        let rows = self.source.fetch(&query)?;
        decode(&query, rows)
    }

    pub fn missed_runs(&self) -> Result<Vec<MissedRun>, ReportError> {
        self.run(missed_runs_query(self.evaluated_at))
    }

    pub fn process_failures(&self) -> Result<Vec<ProcessFailure>, ReportError> {
        self.run(process_failures_query(
            self.evaluated_at,
            self.failure_window_days,
        ))
    }

    pub fn process_status(&self) -> Result<Vec<ProcessStatus>, ReportError> {
        self.run(process_status_query())
    }

    pub fn overdue_processes(&self) -> Result<Vec<OverdueProcess>, ReportError> {
        self.run(overdue_processes_query(self.evaluated_at))
    }
}
