mod bundle;
mod queries;
mod render;

pub use bundle::ReportBundle;
pub use queries::ReportQueries;
pub use render::render_report;

#[cfg(test)]
pub(crate) use queries::{MissedRun, OverdueProcess};
