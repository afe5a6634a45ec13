//! End-to-end run: load → align → normalize → categorize → aggregate → tracker.
//!
//! # Example
//!
//! ```rust,ignore
//! use housepoints::{run_file, PipelineConfig};
//!
//! let report = run_file("rewards.csv", None, &PipelineConfig::from_env())?;
//! println!("{} staff rows", report.summaries.staff.len());
//! ```
//!
//! Only a load failure aborts a run. Schema mismatches, bad values and
//! tracker I/O problems are logged and reported in the [`RunReport`].

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::aggregate::{aggregate, Summaries};
use super::categorize::{categorize, ClassificationRule, Partition};
use super::normalize::{normalize, NormalizeReport};
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::config::{ConductMeasure, PipelineConfig};
use crate::error::PipelineResult;
use crate::export::{stats_table, summary_tables, SheetTable};
use crate::parser::{align_headers, parse_bytes_auto, HeaderStrategy, RawTable};
use crate::roster::Roster;
use crate::tracker::{rows_for_run, CumulativeTracker, TrackerUpdate};

/// How the upload was read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadInfo {
    pub encoding: String,
    pub delimiter: char,
    pub source_headers: Vec<String>,
    pub strategy: HeaderStrategy,
    /// Expected columns that were filled with blanks.
    pub missing: Vec<String>,
    pub rows: usize,
}

/// What happened to the cumulative log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TrackerOutcome {
    /// No tracker path configured.
    Skipped,
    Updated(TrackerUpdate),
    Failed { path: PathBuf, message: String },
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub week: String,
    pub weekly_target: i64,
    pub conduct_measure: ConductMeasure,
    pub load: LoadInfo,
    pub normalize: NormalizeReport,
    pub rule: ClassificationRule,
    pub house_events: usize,
    pub conduct_events: usize,
    /// Roster used for the staff join; derived from the data when none was given.
    pub roster_size: usize,
    pub summaries: Summaries,
    pub partition: Partition,
    pub tracker: TrackerOutcome,
}

impl RunReport {
    /// Exportable views, plus cumulative stats when the tracker was updated.
    pub fn tables(&self) -> Vec<SheetTable> {
        let mut tables = summary_tables(&self.summaries, &self.partition);
        if let TrackerOutcome::Updated(update) = &self.tracker {
            tables.push(stats_table(&update.stats));
        }
        tables
    }
}

/// Run the pipeline over a rewards file on disk.
pub fn run_file<P: AsRef<Path>>(
    path: P,
    roster: Option<&Roster>,
    config: &PipelineConfig,
) -> PipelineResult<RunReport> {
    log_info(format!("📖 Reading {}", path.as_ref().display()));
    let bytes = std::fs::read(path.as_ref()).map_err(crate::error::LoadError::from)?;
    run_bytes(&bytes, roster, config)
}

/// Run the pipeline over raw upload bytes.
pub fn run_bytes(
    bytes: &[u8],
    roster: Option<&Roster>,
    config: &PipelineConfig,
) -> PipelineResult<RunReport> {
    let table = match parse_bytes_auto(bytes) {
        Ok(table) => table,
        Err(e) => {
            log_error(format!("Could not read rewards file: {}", e));
            return Err(e.into());
        }
    };
    Ok(run_table(&table, roster, config))
}

/// Run the pipeline over an already parsed table. Never fails.
pub fn run_table(table: &RawTable, roster: Option<&Roster>, config: &PipelineConfig) -> RunReport {
    log_success(format!("Detected encoding: {}", table.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(table.delimiter)));
    log_success(format!("Read {} rows", table.rows.len()));

    // Columns
    let aligned = align_headers(
        table,
        &config.expected_columns,
        &config.optional_columns,
        config.allow_positional,
    );
    match aligned.strategy {
        HeaderStrategy::ExactName => log_success("Columns matched by name"),
        HeaderStrategy::Positional => {
            log_warning("Column names did not match; columns renamed by position")
        }
        HeaderStrategy::Alias => log_info("Columns matched by alias"),
    }
    if !aligned.missing.is_empty() {
        log_warning(format!(
            "{} expected column(s) missing, left blank:",
            aligned.missing.len()
        ));
        for name in &aligned.missing {
            log_info_indent(name.as_str(), 1);
        }
    }

    // Values
    let (events, normalize_report) = normalize(&aligned, &config.houses);
    if normalize_report.coerced_points > 0 {
        log_warning(format!(
            "{} non-numeric point value(s) counted as 0",
            normalize_report.coerced_points
        ));
    }
    if normalize_report.unknown_dates > 0 {
        log_warning(format!("{} unreadable date(s)", normalize_report.unknown_dates));
    }
    if normalize_report.unmapped_houses > 0 {
        log_warning(format!(
            "{} house value(s) not in the house map",
            normalize_report.unmapped_houses
        ));
    }

    // Subsets
    let partition = categorize(&events);
    match partition.rule {
        ClassificationRule::Keyword => log_success(format!(
            "{} house event(s), {} conduct event(s)",
            partition.house.len(),
            partition.conduct.len()
        )),
        ClassificationRule::PointSign => log_warning(format!(
            "No reward keywords found; split by point sign ({} house, {} conduct)",
            partition.house.len(),
            partition.conduct.len()
        )),
    }

    // Views
    let derived;
    let roster = match roster {
        Some(r) => r,
        None => {
            log_info("No staff roster given; using teachers with house or conduct events");
            derived = Roster::from_events(partition.house.iter().chain(&partition.conduct));
            &derived
        }
    };
    let summaries = aggregate(&partition, roster, config);
    let on_target = summaries.staff.iter().filter(|s| s.on_target).count();
    log_success(format!(
        "{} staff, {} on target ({} points)",
        summaries.staff.len(),
        on_target,
        config.weekly_target
    ));

    let tracker = update_tracker(&summaries, config);

    RunReport {
        week: config.week_label.clone(),
        weekly_target: config.weekly_target,
        conduct_measure: config.conduct_measure,
        load: LoadInfo {
            encoding: table.encoding.clone(),
            delimiter: table.delimiter,
            source_headers: table.headers.clone(),
            strategy: aligned.strategy,
            missing: aligned.missing.clone(),
            rows: table.rows.len(),
        },
        normalize: normalize_report,
        rule: partition.rule,
        house_events: partition.house.len(),
        conduct_events: partition.conduct.len(),
        roster_size: roster.len(),
        summaries,
        partition,
        tracker,
    }
}

/// Best-effort tracker step. Failures are logged and reported, never raised.
fn update_tracker(summaries: &Summaries, config: &PipelineConfig) -> TrackerOutcome {
    let Some(path) = &config.tracker_path else {
        return TrackerOutcome::Skipped;
    };

    let tracker = CumulativeTracker::new(path);
    let rows = rows_for_run(&summaries.staff, &config.week_label);
    match tracker.reconcile(&rows, config.weekly_target) {
        Ok(update) => {
            log_success(format!(
                "Tracker updated: {} row(s) appended, {} total",
                update.appended, update.total_rows
            ));
            TrackerOutcome::Updated(update)
        }
        Err(e) => {
            log_error(format!("Tracker not updated ({}): {}", path.display(), e));
            TrackerOutcome::Failed {
                path: path.clone(),
                message: e.to_string(),
            }
        }
    }
}

fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::models::RosterEntry;
    use tempfile::tempdir;

    const HEADER: &str = "Pupil Name,House,Form,Year,Reward,Category,Points,Date,Reward Description,Teacher,Dep,Subject";

    fn config() -> PipelineConfig {
        PipelineConfig {
            week_label: "2024-09-09".into(),
            ..PipelineConfig::default()
        }
    }

    fn roster(initials: &[&str]) -> Roster {
        Roster::from_entries(initials.iter().map(|i| RosterEntry::from_initials(i)).collect())
    }

    fn upload(rows: &[&str]) -> Vec<u8> {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.into_bytes()
    }

    #[test]
    fn test_house_and_conduct_rows() {
        let bytes = upload(&[
            "Ann Lee,B,7A,7,House Point,Effort,5,01/09/2024,Good work,ab,Maths,Maths",
            "Bob Roe,L,8C,8,Conduct,Late,-3,02/09/2024,Late,cd,Science,Physics",
        ]);

        let report = run_bytes(&bytes, Some(&roster(&["AB", "CD", "ZZ"])), &config()).unwrap();

        assert_eq!(report.load.strategy, HeaderStrategy::ExactName);
        assert_eq!(report.rule, ClassificationRule::Keyword);
        let staff = |t: &str| report.summaries.staff.iter().find(|s| s.teacher == t).unwrap();
        assert_eq!(staff("AB").house_points, 5);
        assert_eq!(staff("CD").conduct_points, 1);
        assert_eq!(staff("ZZ").house_points, 0);
        assert!(!staff("ZZ").on_target);
        assert_eq!(report.tracker, TrackerOutcome::Skipped);
    }

    #[test]
    fn test_sign_fallback_without_keywords() {
        let bytes = upload(&[
            "Ann Lee,B,7A,7,Merit,Effort,2,,,ab,,",
            "Bob Roe,L,8C,8,Demerit,Late,-1,,,ab,,",
        ]);

        let report = run_bytes(&bytes, None, &config()).unwrap();

        assert_eq!(report.rule, ClassificationRule::PointSign);
        assert_eq!(report.house_events, 1);
        assert_eq!(report.conduct_events, 1);
        assert_eq!(report.roster_size, 1);
    }

    #[test]
    fn test_derived_roster_ignores_unclassified_events() {
        let bytes = upload(&[
            "Ann Lee,B,7A,7,House Point,Effort,2,,,ab,,",
            "Bob Roe,L,8C,8,Note,Homework,1,,,ef,,",
        ]);

        let report = run_bytes(&bytes, None, &config()).unwrap();

        assert_eq!(report.rule, ClassificationRule::Keyword);
        assert_eq!(report.roster_size, 1);
        assert!(report.summaries.staff.iter().all(|s| s.teacher != "EF"));
    }

    #[test]
    fn test_empty_file_aborts() {
        let err = run_bytes(b"", None, &config()).unwrap_err();
        assert!(matches!(err, PipelineError::Load(_)));
    }

    #[test]
    fn test_header_only_file_gives_empty_views() {
        let report = run_bytes(HEADER.as_bytes(), Some(&roster(&["AB"])), &config()).unwrap();

        assert!(report.summaries.house_totals.is_empty());
        assert_eq!(report.summaries.staff.len(), 1);
        assert_eq!(report.summaries.staff[0].house_points, 0);
    }

    #[test]
    fn test_tracker_updated() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            tracker_path: Some(dir.path().join("cumulative_tracker.csv")),
            ..config()
        };
        let bytes = upload(&["Ann Lee,B,7A,7,House Point,Effort,5,,,ab,,"]);

        let report = run_bytes(&bytes, None, &config).unwrap();

        match &report.tracker {
            TrackerOutcome::Updated(update) => {
                assert_eq!(update.appended, 1);
                assert_eq!(update.stats[0].total_house_points, 5);
            }
            other => panic!("unexpected tracker outcome: {:?}", other),
        }
        assert!(report.tables().iter().any(|t| t.name == "Cumulative Staff Stats"));
    }

    #[test]
    fn test_tracker_failure_does_not_fail_run() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let config = PipelineConfig {
            tracker_path: Some(blocker.join("log.csv")),
            ..config()
        };
        let bytes = upload(&["Ann Lee,B,7A,7,House Point,Effort,5,,,ab,,"]);

        let report = run_bytes(&bytes, None, &config).unwrap();

        assert!(matches!(report.tracker, TrackerOutcome::Failed { .. }));
        assert_eq!(report.summaries.staff[0].house_points, 5);
    }

    #[test]
    fn test_huge_point_values_are_coerced() {
        let bytes = upload(&[
            "Ann Lee,B,7A,7,House Point,Effort,9223372036854775807,,,ab,,",
            "Ann Lee,B,7A,7,House Point,Effort,1,,,ab,,",
            "Bob Roe,L,8C,8,House Point,Effort,1e30,,,ab,,",
            "Bob Roe,L,8C,8,House Point,Effort,1e30,,,ab,,",
            "Cat Day,D,9B,9,Conduct,Late,-9223372036854775808,,,cd,,",
        ]);
        let config = PipelineConfig {
            conduct_measure: ConductMeasure::Magnitude,
            ..config()
        };

        let report = run_bytes(&bytes, None, &config).unwrap();

        assert_eq!(report.normalize.coerced_points, 4);
        let staff = |t: &str| report.summaries.staff.iter().find(|s| s.teacher == t).unwrap();
        assert_eq!(staff("AB").house_points, 1);
        assert_eq!(staff("CD").conduct_points, 0);
        let house_sum: i64 = report.partition.house.iter().map(|e| e.points).sum();
        let staff_sum: i64 = report.summaries.staff.iter().map(|s| s.house_points).sum();
        assert_eq!(house_sum, staff_sum);
    }

    #[test]
    fn test_run_file_missing() {
        let err = run_file("/no/such/rewards.csv", None, &config()).unwrap_err();
        assert!(matches!(err, PipelineError::Load(_)));
    }
}
