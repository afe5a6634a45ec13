//! Markdown digest of a run: a short header, then one section per view.

use std::fmt::Write;

use super::SheetTable;
use crate::transform::{RunReport, TrackerOutcome};

/// Rows shown per view in the digest.
const MAX_ROWS: usize = 10;

pub fn render_markdown(report: &RunReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Weekly Points Summary");
    let _ = writeln!(
        output,
        "Week {} (target {} house points per staff member)",
        report.week, report.weekly_target
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "- Rows read: {} ({} columns matched by {})",
        report.load.rows,
        report.load.source_headers.len(),
        report.load.strategy
    );
    let _ = writeln!(
        output,
        "- House events: {}, conduct events: {} (split by {})",
        report.house_events, report.conduct_events, report.rule
    );
    if !report.load.missing.is_empty() {
        let _ = writeln!(output, "- Missing columns: {}", report.load.missing.join(", "));
    }
    if report.normalize.coerced_points > 0 {
        let _ = writeln!(
            output,
            "- Non-numeric points counted as 0: {}",
            report.normalize.coerced_points
        );
    }
    match &report.tracker {
        TrackerOutcome::Skipped => {}
        TrackerOutcome::Updated(update) => {
            let _ = writeln!(
                output,
                "- Tracker: {} rows appended to {} ({} total)",
                update.appended,
                update.path.display(),
                update.total_rows
            );
        }
        TrackerOutcome::Failed { path, message } => {
            let _ = writeln!(output, "- Tracker NOT updated ({}): {}", path.display(), message);
        }
    }

    for table in report.tables() {
        let _ = writeln!(output);
        write_section(&mut output, &table);
    }

    output
}

/// One view as a markdown section.
pub fn render_table(table: &SheetTable) -> String {
    let mut output = String::new();
    write_section(&mut output, table);
    output
}

fn write_section(output: &mut String, table: &SheetTable) {
    let _ = writeln!(output, "## {}", table.name);

    if table.is_empty() {
        let _ = writeln!(output, "No data for {}.", table.name.to_lowercase());
        return;
    }

    let _ = writeln!(output, "| {} |", table.headers.join(" | "));
    let _ = writeln!(output, "|{}", "---|".repeat(table.headers.len()));
    for row in table.rows.iter().take(MAX_ROWS) {
        let cells: Vec<String> = row.iter().map(|c| c.to_string().replace('|', "/")).collect();
        let _ = writeln!(output, "| {} |", cells.join(" | "));
    }
    if table.rows.len() > MAX_ROWS {
        let _ = writeln!(output, "_{} more rows_", table.rows.len() - MAX_ROWS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::transform::run_bytes;

    fn report(body: &str) -> RunReport {
        let text = format!(
            "Pupil Name,House,Form,Year,Reward,Category,Points,Date,Reward Description,Teacher,Dep,Subject\n{}",
            body
        );
        let config = PipelineConfig {
            week_label: "W1".into(),
            ..PipelineConfig::default()
        };
        run_bytes(text.as_bytes(), None, &config).unwrap()
    }

    #[test]
    fn test_digest_sections() {
        let text = render_markdown(&report("Ann Lee,B,7A,7,House Point,Effort,5,,,ab,Maths,Maths\n"));

        assert!(text.lines().any(|l| l == "# Weekly Points Summary"));
        assert!(text.contains("## Staff Summary"));
        assert!(text.contains("| AB |"));
        assert!(text.contains("| Brunel | 5 |"));
        assert!(text.contains("No data for conduct totals."));
        assert!(text.contains("## House Points Raw"));
        assert!(text.contains("No data for conduct points raw."));
    }

    #[test]
    fn test_render_table_truncates() {
        use crate::export::totals_table;
        use crate::models::GroupTotal;

        let rows: Vec<GroupTotal> = (0..12)
            .map(|i| GroupTotal { key: format!("K{}", i), value: i })
            .collect();
        let text = render_table(&totals_table("Dept Summary", "Dep", "House Points", &rows));

        assert!(text.starts_with("## Dept Summary\n| Dep | House Points |\n|---|---|\n"));
        assert!(text.contains("| K9 | 9 |"));
        assert!(!text.contains("| K10 |"));
        assert!(text.contains("_2 more rows_"));
    }

    #[test]
    fn test_empty_run_prints_no_data() {
        let text = render_markdown(&report(""));
        assert!(text.contains("No data for staff summary."));
        assert!(text.contains("No data for house totals."));
    }
}
