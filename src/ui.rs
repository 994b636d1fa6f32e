//! Terminal feedback for a report run: spinner plus coloured outcome line.
//!
//! Uses `indicatif` for the spinner and `console` for styling. Everything
//! here writes to stderr unless told otherwise, so that `preview` can stream
//! HTML on stdout.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::ReportError;
use crate::summary::RunSummary;

/// Spinner shown while the report is queried, rendered and sent.
pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl RunProgress {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow().bold(),
        }
    }

    /// Clears the spinner and prints the outcome of a successful run.
    pub fn complete(&self, summary: &RunSummary) {
        self.pb.finish_and_clear();
        let counts = summary.sections;
        let detail = format!(
            "missed {}, failed {}, overdue {}, status {}",
            counts.missed, counts.failed, counts.overdue, counts.status
        );
        let line = match (&summary.delivered_to, summary.alert) {
            (Some(to), true) => format!(
                "  {} High-priority report sent to {to} ({detail})",
                self.yellow.apply_to("!")
            ),
            (Some(to), false) => format!(
                "  {} Report sent to {to} ({detail})",
                self.green.apply_to("✓")
            ),
            (None, _) => format!("  {} Report rendered ({detail})", self.green.apply_to("✓")),
        };
        eprintln!("{line}");
    }

    /// Clears the spinner and prints the failure.
    pub fn fail(&self, err: &ReportError) {
        self.pb.finish_and_clear();
        eprintln!(
            "  {} Report run failed ({}): {err}",
            self.red.apply_to("✗"),
            err.category()
        );
    }
}

/// Where the JSON summary goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Prints the run summary as pretty JSON on the chosen stream.
pub fn print_summary(summary: &RunSummary, stream: Stream) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(summary)?;
    match stream {
        Stream::Stdout => println!("{json}"),
        Stream::Stderr => eprintln!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportBundle;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn summary_prints_on_either_stream() {
        let evaluated_at = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let bundle = ReportBundle::new(vec![], vec![], vec![], vec![], 7);
        let summary = RunSummary::from_bundle("run-1", Utc::now(), evaluated_at, &bundle, None);
        assert!(print_summary(&summary, Stream::Stdout).is_ok());
        assert!(print_summary(&summary, Stream::Stderr).is_ok());
    }
}
