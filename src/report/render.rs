//! HTML rendering of a [`ReportBundle`] through handlebars templates.
//!
//! Cells and headers are written with `{{...}}`, so the registry's HTML
//! escape applies to every value taken from the database. The document
//! template inserts the already-escaped table fragments with `{{{...}}}`.

use handlebars::Handlebars;
use serde::Serialize;

use super::bundle::ReportBundle;
use super::queries::ReportRecord;
use crate::error::ReportError;

/// Shown instead of a table when a section has no rows.
pub const NO_DATA_PLACEHOLDER: &str = "<p>No data available.</p>";

pub const MISSED_RUNS_HEADING: &str = "Missed runs";
pub const OVERDUE_HEADING: &str = "Overdue processes";
pub const STATUS_HEADING: &str = "Process status";

const TABLE_TEMPLATE: &str = "table";
const REPORT_TEMPLATE: &str = "report";

const TABLE_SOURCE: &str = "{{#if rows}}<table><thead><tr>{{#each columns}}<th>{{this}}</th>{{/each}}</tr></thead><tbody>{{#each rows}}<tr>{{#each this}}<td>{{this}}</td>{{/each}}</tr>{{/each}}</tbody></table>{{else}}<p>No data available.</p>{{/if}}";

const REPORT_SOURCE: &str = r#"<html>
<head>
<meta charset="utf-8">
<style>
    table, th, td {
        border: 1px solid black;
        border-collapse: collapse;
        padding: 8px;
        font-size: 14px;
    }
    h3 {
        font-size: 16px;
    }
    body {
        font-size: 12px;
    }
</style>
</head>
<body>
{{#each sections}}
{{#unless @first}}
<br/><br/>
{{/unless}}
    <h3>{{heading}}</h3>
    {{{fragment}}}
{{/each}}
</body>
</html>
"#;

#[derive(Debug, Serialize)]
struct Table {
    columns: &'static [&'static str],
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct Section {
    heading: String,
    fragment: String,
}

#[derive(Debug, Serialize)]
struct Document {
    sections: Vec<Section>,
}

pub fn failures_heading(window_days: u32) -> String {
    if window_days == 1 {
        "Failed processes (last day)".to_string()
    } else {
        format!("Failed processes (last {window_days} days)")
    }
}

/// Serializes `rows` for the table template. Every row must have exactly one
/// cell per header column.
fn table<R: ReportRecord>(rows: &[R]) -> Result<Table, ReportError> {
    let rows = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let cells = row.cells();
            if cells.len() != R::COLUMNS.len() {
                return Err(ReportError::Render(format!(
                    "row {idx} has {} cells, header has {}",
                    cells.len(),
                    R::COLUMNS.len()
                )));
            }
            Ok(cells)
        })
        .collect::<Result<_, _>>()?;

    Ok(Table {
        columns: R::COLUMNS,
        rows,
    })
}

/// Template registry holding the table and document templates.
pub struct ReportRenderer {
    reg: Handlebars<'static>,
}

impl ReportRenderer {
    pub fn new() -> Result<Self, ReportError> {
        let mut reg = Handlebars::new();
        reg.register_escape_fn(handlebars::html_escape);
        reg.register_template_string(TABLE_TEMPLATE, TABLE_SOURCE)?;
        reg.register_template_string(REPORT_TEMPLATE, REPORT_SOURCE)?;
        Ok(Self { reg })
    }

    /// Renders one section as a `<table>`, or the placeholder when empty.
    pub fn table_fragment<R: ReportRecord>(&self, rows: &[R]) -> Result<String, ReportError> {
        Ok(self.reg.render(TABLE_TEMPLATE, &table(rows)?)?)
    }

    /// Assembles the full report document. Pure: equal bundles give equal
    /// output.
    pub fn render_report(&self, bundle: &ReportBundle) -> Result<String, ReportError> {
        let sections = vec![
            Section {
                heading: MISSED_RUNS_HEADING.to_string(),
                fragment: self.table_fragment(bundle.missed())?,
            },
            Section {
                heading: failures_heading(bundle.failure_window_days()),
                fragment: self.table_fragment(bundle.failed())?,
            },
            Section {
                heading: OVERDUE_HEADING.to_string(),
                fragment: self.table_fragment(bundle.overdue())?,
            },
            Section {
                heading: STATUS_HEADING.to_string(),
                fragment: self.table_fragment(bundle.status())?,
            },
        ];
        Ok(self.reg.render(REPORT_TEMPLATE, &Document { sections })?)
    }
}

pub fn render_report(bundle: &ReportBundle) -> Result<String, ReportError> {
    ReportRenderer::new()?.render_report(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::bundle::tests::{missed_row, overdue_row};
    use crate::report::queries::tests::at;
    use crate::report::queries::{MissedRun, ProcessStatus};

    fn table_fragment<R: ReportRecord>(rows: &[R]) -> Result<String, ReportError> {
        ReportRenderer::new().unwrap().table_fragment(rows)
    }

    struct Broken;

    impl ReportRecord for Broken {
        const COLUMNS: &'static [&'static str] = &["a", "b"];

        fn from_row(_row: &crate::database::Row) -> Result<Self, ReportError> {
            Ok(Broken)
        }

        fn cells(&self) -> Vec<String> {
            vec!["only one".into()]
        }
    }

    #[test]
    fn empty_section_renders_placeholder_only() {
        let html = table_fragment::<MissedRun>(&[]).unwrap();
        assert_eq!(html, NO_DATA_PLACEHOLDER);
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn table_has_one_header_per_column_and_one_row_per_entry() {
        let rows = vec![
            missed_row(),
            MissedRun {
                trigger_name: Some("T9".into()),
                ..missed_row()
            },
        ];
        let html = table_fragment(&rows).unwrap();
        assert_eq!(html.matches("<th>").count(), 4);
        assert_eq!(html.matches("<tr>").count(), 3);
        let first = html.find("<td>T1</td>").unwrap();
        let second = html.find("<td>T9</td>").unwrap();
        assert!(first < second);
    }

    #[test]
    fn cells_are_escaped() {
        let row = MissedRun {
            trigger_name: Some("<script>alert('x')</script>".into()),
            process_name: Some("A & \"B\"".into()),
            ..missed_row()
        };
        let html = table_fragment(&[row]).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"));
        assert!(html.contains("<td>A &amp; &quot;B&quot;</td>"));
    }

    #[test]
    fn mismatched_row_shape_is_render_error() {
        let err = table_fragment(&[Broken]).unwrap_err();
        assert!(matches!(err, ReportError::Render(_)));
    }

    #[test]
    fn scenario_all_sections_empty() {
        let bundle = ReportBundle::new(vec![], vec![], vec![], vec![], 7);
        let html = render_report(&bundle).unwrap();
        assert_eq!(html.matches(NO_DATA_PLACEHOLDER).count(), 4);
        assert!(!html.contains("<table>"));
        assert!(!bundle.alert());
        for heading in [MISSED_RUNS_HEADING, OVERDUE_HEADING, STATUS_HEADING] {
            assert!(html.contains(heading));
        }
        assert!(html.contains("Failed processes (last 7 days)"));
    }

    #[test]
    fn scenario_single_missed_run() {
        let bundle = ReportBundle::new(vec![missed_row()], vec![], vec![], vec![], 7);
        assert!(bundle.alert());

        let html = render_report(&bundle).unwrap();
        let missed_section = &html[html.find(MISSED_RUNS_HEADING).unwrap()
            ..html.find("Failed processes").unwrap()];
        assert_eq!(missed_section.matches("<th>").count(), 4);
        assert!(missed_section.contains(
            "<tr><th>trigger_name</th><th>process_name</th><th>last_run</th><th>next_run</th></tr>"
        ));
        assert!(missed_section.contains(
            "<tr><td>T1</td><td>P1</td><td>2024-01-01 00:00:00</td><td>2024-01-02 00:00:00</td></tr>"
        ));
        assert_eq!(html.matches(NO_DATA_PLACEHOLDER).count(), 3);
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let status = ProcessStatus {
            trigger_name: Some("T4".into()),
            process_status: None,
            next_run: None,
            last_run: Some(at(4, 0)),
        };
        let bundle = ReportBundle::new(vec![], vec![], vec![overdue_row()], vec![status], 3);
        let html = render_report(&bundle).unwrap();
        let positions: Vec<usize> = [
            MISSED_RUNS_HEADING,
            "Failed processes (last 3 days)",
            OVERDUE_HEADING,
            STATUS_HEADING,
        ]
        .iter()
        .map(|h| html.find(h).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn render_is_deterministic() {
        let bundle = ReportBundle::new(vec![missed_row()], vec![], vec![overdue_row()], vec![], 7);
        assert_eq!(
            render_report(&bundle).unwrap(),
            render_report(&bundle.clone()).unwrap()
        );
    }

    #[test]
    fn blank_cells_render_as_empty_td() {
        let row = MissedRun {
            process_name: None,
            ..missed_row()
        };
        let html = table_fragment(&[row]).unwrap();
        assert!(html.contains("<tr><td>T1</td><td></td><td>2024-01-01 00:00:00</td>"));
    }

    #[test]
    fn sections_are_separated_by_breaks() {
        let bundle = ReportBundle::new(vec![], vec![], vec![], vec![], 7);
        let html = render_report(&bundle).unwrap();
        assert_eq!(html.matches("<h3>").count(), 4);
        assert_eq!(html.matches("<br/><br/>").count(), 3);
        assert!(html.starts_with("<html>"));
        assert!(html.contains("border-collapse: collapse;"));
    }
}
