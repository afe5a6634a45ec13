//! Cumulative tracker - append-only weekly log of per-staff totals.
//!
//! The log is a CSV with columns `Teacher, House Points This Week,
//! Conduct Points This Week, Week`. Each run reads the whole file, appends
//! its rows and rewrites it; rows are never updated or de-duplicated.
//! There is no file locking, so only one writer may use a log at a time.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::TrackerResult;
use crate::models::{ContributionStatus, StaffStats, StaffSummaryRow, TrackerRecord};

const COL_TEACHER: &str = "Teacher";
const COL_HOUSE: &str = "House Points This Week";
const COL_CONDUCT: &str = "Conduct Points This Week";
const COL_WEEK: &str = "Week";

/// Result of reconciling one run into the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerUpdate {
    pub path: PathBuf,
    pub appended: usize,
    pub total_rows: usize,
    pub stats: Vec<StaffStats>,
}

/// A cumulative log at a fixed path.
#[derive(Debug, Clone)]
pub struct CumulativeTracker {
    path: PathBuf,
}

impl CumulativeTracker {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row. A missing file is an empty log.
    ///
    /// Columns are found by header name; numbers are parsed leniently
    /// (decimals rounded, anything else 0).
    pub fn read(&self) -> TrackerResult<Vec<TrackerRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let headers = reader.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h == name);
        let (teacher, house, conduct, week) = (
            position(COL_TEACHER),
            position(COL_HOUSE),
            position(COL_CONDUCT),
            position(COL_WEEK),
        );

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let text = |col: Option<usize>| col.and_then(|c| row.get(c)).unwrap_or("").to_string();
            records.push(TrackerRecord {
                teacher: text(teacher).to_uppercase(),
                house_points: lenient_number(&text(house)),
                conduct_points: lenient_number(&text(conduct)),
                week: text(week),
            });
        }

        Ok(records)
    }

    /// Append `rows` and rewrite the whole file. Returns the full log.
    pub fn append(&self, rows: &[TrackerRecord]) -> TrackerResult<Vec<TrackerRecord>> {
        let mut log = self.read()?;
        log.extend_from_slice(rows);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        for record in &log {
            writer.serialize(record)?;
        }
        if log.is_empty() {
            writer.write_record([COL_TEACHER, COL_HOUSE, COL_CONDUCT, COL_WEEK])?;
        }
        writer.flush()?;

        Ok(log)
    }

    /// Append this run's rows and recompute statistics over the full log.
    pub fn reconcile(&self, rows: &[TrackerRecord], target: i64) -> TrackerResult<TrackerUpdate> {
        let log = self.append(rows)?;
        Ok(TrackerUpdate {
            path: self.path.clone(),
            appended: rows.len(),
            total_rows: log.len(),
            stats: staff_stats(&log, target),
        })
    }

    /// Statistics of the existing log without appending.
    pub fn stats(&self, target: i64) -> TrackerResult<Vec<StaffStats>> {
        Ok(staff_stats(&self.read()?, target))
    }
}

/// Tracker rows for one run's staff summary.
pub fn rows_for_run(staff: &[StaffSummaryRow], week: &str) -> Vec<TrackerRecord> {
    staff
        .iter()
        .map(|row| TrackerRecord {
            teacher: row.teacher.clone(),
            house_points: row.house_points,
            conduct_points: row.conduct_points,
            week: week.to_string(),
        })
        .collect()
}

/// Per-staff totals, distinct weeks and mean house points over the log.
///
/// The mean is taken over log rows, so repeated week labels count twice.
pub fn staff_stats(log: &[TrackerRecord], target: i64) -> Vec<StaffStats> {
    let mut groups: BTreeMap<&str, (i64, usize, BTreeSet<&str>)> = BTreeMap::new();
    for record in log {
        let entry = groups.entry(record.teacher.as_str()).or_default();
        entry.0 = entry.0.saturating_add(record.house_points);
        entry.1 += 1;
        entry.2.insert(record.week.as_str());
    }

    let mut stats: Vec<StaffStats> = groups
        .into_iter()
        .map(|(teacher, (total, rows, weeks))| {
            let avg = round2(total as f64 / rows as f64);
            StaffStats {
                teacher: teacher.to_string(),
                total_house_points: total,
                weeks_reported: weeks.len(),
                avg_house_per_week: avg,
                status: if avg >= target as f64 {
                    ContributionStatus::Positive
                } else {
                    ContributionStatus::Negative
                },
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.total_house_points
            .cmp(&a.total_house_points)
            .then_with(|| a.teacher.cmp(&b.teacher))
    });
    stats
}

fn lenient_number(raw: &str) -> i64 {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
        })
        .unwrap_or(0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
