use chrono::{DateTime, NaiveDateTime, Utc};
use lettre::Transport;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::EmailSettings;
use crate::database::RowSource;
use crate::error::ReportError;
use crate::mailer;
use crate::report::{ReportBundle, ReportQueries, render_report};
use crate::summary::RunSummary;

/// A fetched and rendered report, ready to be mailed or written out.
#[derive(Debug, Clone)]
pub struct PreparedReport {
    pub bundle: ReportBundle,
    pub html: String,
}

/// Drives one report run: query, classify, render, then (optionally) send.
///
/// The bundle is computed exactly once per run. The same bundle feeds the
/// renderer and the alert flag handed to the mailer.
pub struct ReportJob<S> {
    run_id: String,
    started_at: DateTime<Utc>,
    queries: ReportQueries<S>,
}

impl<S: RowSource> ReportJob<S> {
    pub fn new(source: S, evaluated_at: NaiveDateTime, failure_window_days: u32) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            queries: ReportQueries::new(source, evaluated_at, failure_window_days),
        }
    }

    /// Fetches all sections and renders the document. Nothing is sent.
    pub fn prepare(&self) -> Result<PreparedReport, ReportError> {
        let bundle = ReportBundle::collect(&self.queries)?;
        let html = render_report(&bundle)?;
        Ok(PreparedReport { bundle, html })
    }

    /// Renders the report without mailing it.
    pub fn preview(&self) -> Result<(PreparedReport, RunSummary), ReportError> {
        let _span = info_span!("report_run", run_id = %self.run_id, mode = "preview").entered();
        info!(evaluated_at = %self.queries.evaluated_at(), "Running report preview");

        let report = self.prepare()?;
        let summary = self.summarize(&report, None);
        Ok((report, summary))
    }

    /// Full run: prepare, then submit a single email through `transport`.
    /// Any failure before submission means nothing is sent.
    pub fn run<T>(&self, transport: &T, settings: &EmailSettings) -> Result<RunSummary, ReportError>
    where
        T: Transport,
        T::Error: std::fmt::Display,
    {
        let _span = info_span!("report_run", run_id = %self.run_id, mode = "send").entered();
        info!(evaluated_at = %self.queries.evaluated_at(), "Running report");

        let report = self.prepare()?;
        mailer::send_with(transport, &report.html, report.bundle.alert(), settings)?;
        Ok(self.summarize(&report, Some(settings.to_email.clone())))
    }

    fn summarize(&self, report: &PreparedReport, delivered_to: Option<String>) -> RunSummary {
        RunSummary::from_bundle(
            &self.run_id,
            self.started_at,
            self.queries.evaluated_at(),
            &report.bundle,
            delivered_to,
        )
    }
}
