use tracing::{debug, warn};

use super::queries::{MissedRun, OverdueProcess, ProcessFailure, ProcessStatus, ReportQueries};
use crate::database::RowSource;
use crate::error::ReportError;

/// The four report sections plus the alert flag derived from them.
///
/// The flag is computed once, from the very rows that will be rendered, so
/// the email priority can never disagree with the report body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBundle {
    missed: Vec<MissedRun>,
    failed: Vec<ProcessFailure>,
    overdue: Vec<OverdueProcess>,
    status: Vec<ProcessStatus>,
    failure_window_days: u32,
    alert: bool,
}

/// True iff any run was missed or any process is overdue. Recent failures
/// alone do not raise the priority.
pub fn evaluate_alert(missed: &[MissedRun], overdue: &[OverdueProcess]) -> bool {
    !missed.is_empty() || !overdue.is_empty()
}

impl ReportBundle {
    pub fn new(
        missed: Vec<MissedRun>,
        failed: Vec<ProcessFailure>,
        overdue: Vec<OverdueProcess>,
        status: Vec<ProcessStatus>,
        failure_window_days: u32,
    ) -> Self {
        let alert = evaluate_alert(&missed, &overdue);
        Self {
            missed,
            failed,
            overdue,
            status,
            failure_window_days,
            alert,
        }
    }

    /// Runs all four queries, one after the other, and assembles the bundle.
    /// The first failing query aborts collection.
    pub fn collect<S: RowSource>(queries: &ReportQueries<S>) -> Result<Self, ReportError> {
        let missed = queries.missed_runs()?;
        let failed = queries.process_failures()?;
        let overdue = queries.overdue_processes()?;
        let status = queries.process_status()?;

        let bundle = Self::new(
            missed,
            failed,
            overdue,
            status,
            queries.failure_window_days(),
        );
        debug!(
            missed = bundle.missed.len(),
            failed = bundle.failed.len(),
            overdue = bundle.overdue.len(),
            status = bundle.status.len(),
            "report bundle collected"
        );
        if bundle.alert {
            warn!(
                missed = bundle.missed.len(),
                overdue = bundle.overdue.len(),
                "missed or overdue processes found, report will be sent with high priority"
            );
        }
        Ok(bundle)
    }

    pub fn missed(&self) -> &[MissedRun] {
        &self.missed
    }

    pub fn failed(&self) -> &[ProcessFailure] {
        &self.failed
    }

    pub fn overdue(&self) -> &[OverdueProcess] {
        &self.overdue
    }

    pub fn status(&self) -> &[ProcessStatus] {
        &self.status
    }

    pub fn failure_window_days(&self) -> u32 {
        self.failure_window_days
    }

    pub fn alert(&self) -> bool {
        self.alert
    }
}
