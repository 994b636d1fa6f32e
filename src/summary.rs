use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::report::ReportBundle;

/// Row counts for each report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionCounts {
    pub missed: usize,
    pub failed: usize,
    pub overdue: usize,
    pub status: usize,
}

impl SectionCounts {
    pub fn of(bundle: &ReportBundle) -> Self {
        Self {
            missed: bundle.missed().len(),
            failed: bundle.failed().len(),
            overdue: bundle.overdue().len(),
            status: bundle.status().len(),
        }
    }
}

/// Structured record of one report run, printed at completion.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub evaluated_at: NaiveDateTime,
    pub sections: SectionCounts,
    pub alert: bool,
    /// Recipient, when the report was mailed; `None` for previews.
    pub delivered_to: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunSummary {
    /// Closes out a run that started at `started_at`.
    pub fn from_bundle(
        run_id: &str,
        started_at: DateTime<Utc>,
        evaluated_at: NaiveDateTime,
        bundle: &ReportBundle,
        delivered_to: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.to_string(),
            evaluated_at,
            sections: SectionCounts::of(bundle),
            alert: bundle.alert(),
            delivered_to,
            started_at,
            completed_at: now,
            duration_ms: (now - started_at).num_milliseconds(),
        }
    }
}
