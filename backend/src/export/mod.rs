//! Summary exports.
//!
//! Every view is first flattened into a [`SheetTable`] (named, with header
//! row and typed cells); the writers in this module and in [`xlsx`] /
//! [`markdown`] only deal with those tables.
//!
//! ```text
//! Summaries + Partition ─▶ summary_tables() ─▶ Vec<SheetTable> ─┬─▶ .xlsx (one sheet per view)
//!                                                               ├─▶ <dir>/<slug>.csv
//!                                                               └─▶ markdown digest
//! ```

pub mod markdown;
pub mod xlsx;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ExportResult;
use crate::models::{
    CategoryCount, EventRecord, Field, FormRanking, GroupTotal, StaffStats, StaffSummaryRow,
    StudentSummaryRow,
};
use crate::transform::{Partition, Summaries};

pub use markdown::{render_markdown, render_table};
pub use xlsx::{workbook_bytes, write_workbook};

/// One typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<&String> for Cell {
    fn from(s: &String) -> Self {
        Cell::Text(s.clone())
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Int(n)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Int(n as i64)
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Float(x)
    }
}

/// A named view with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn with_rows(mut self, rows: impl IntoIterator<Item = Vec<Cell>>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// File-system friendly name, e.g. `top-students-house`.
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

fn yes_no(flag: bool) -> Cell {
    Cell::from(if flag { "Yes" } else { "No" })
}

pub fn staff_table(rows: &[StaffSummaryRow]) -> SheetTable {
    SheetTable::new(
        "Staff Summary",
        &["Teacher", "FullName", "Dept", "House Points This Week", "Conduct Points This Week", "On Target"],
    )
    .with_rows(rows.iter().map(|r| {
        vec![
            Cell::from(&r.teacher),
            Cell::from(&r.full_name),
            Cell::from(&r.department),
            Cell::from(r.house_points),
            Cell::from(r.conduct_points),
            yes_no(r.on_target),
        ]
    }))
}

pub fn student_table(rows: &[StudentSummaryRow]) -> SheetTable {
    SheetTable::new("Top Students (House)", &["Pupil Name", "Form", "Year", "House", "House Points"])
        .with_rows(rows.iter().map(|r| {
            vec![
                Cell::from(&r.pupil_name),
                Cell::from(&r.form),
                Cell::from(&r.year),
                Cell::from(&r.house),
                Cell::from(r.house_points),
            ]
        }))
}

pub fn totals_table(name: &str, key: &str, value: &str, rows: &[GroupTotal]) -> SheetTable {
    SheetTable::new(name, &[key, value])
        .with_rows(rows.iter().map(|r| vec![Cell::from(&r.key), Cell::from(r.value)]))
}

pub fn forms_table(name: &str, value: &str, rows: &[FormRanking]) -> SheetTable {
    SheetTable::new(name, &["House", "Rank", "Form", value]).with_rows(rows.iter().map(|r| {
        vec![
            Cell::from(&r.house),
            Cell::from(r.rank),
            Cell::from(&r.form),
            Cell::from(r.value),
        ]
    }))
}

pub fn categories_table(name: &str, rows: &[CategoryCount]) -> SheetTable {
    SheetTable::new(name, &["Category", "Frequency"])
        .with_rows(rows.iter().map(|r| vec![Cell::from(&r.category), Cell::from(r.frequency)]))
}

/// Raw events with the canonical upload columns.
pub fn events_table(name: &str, events: &[EventRecord]) -> SheetTable {
    let headers: Vec<&str> = Field::EXPECTED
        .iter()
        .chain(Field::OPTIONAL.iter())
        .map(|f| f.name())
        .collect();

    SheetTable::new(name, &headers).with_rows(events.iter().map(|e| {
        vec![
            Cell::from(&e.pupil_name),
            Cell::from(&e.house),
            Cell::from(&e.form),
            Cell::from(&e.year),
            Cell::from(&e.reward),
            Cell::from(&e.category),
            Cell::from(e.points),
            Cell::Text(
                e.date
                    .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default(),
            ),
            Cell::from(&e.description),
            Cell::from(&e.teacher),
            Cell::from(&e.department),
            Cell::from(&e.subject),
            Cell::from(&e.email),
        ]
    }))
}

pub fn stats_table(rows: &[StaffStats]) -> SheetTable {
    SheetTable::new(
        "Cumulative Staff Stats",
        &["Teacher", "TotalHousePoints", "WeeksReported", "AvgHousePerWeek", "ContributionStatus"],
    )
    .with_rows(rows.iter().map(|r| {
        vec![
            Cell::from(&r.teacher),
            Cell::from(r.total_house_points),
            Cell::from(r.weeks_reported),
            Cell::from(r.avg_house_per_week),
            Cell::from(r.status.as_str()),
        ]
    }))
}

/// Every summary view of a run, in workbook order.
pub fn summary_tables(summaries: &Summaries, partition: &Partition) -> Vec<SheetTable> {
    vec![
        staff_table(&summaries.staff),
        totals_table("Dept Summary", "Dep", "House Points", &summaries.departments),
        totals_table("Staff Dept Summary", "Dept", "House Points", &summaries.staff_departments),
        student_table(&summaries.students),
        totals_table("House Totals", "House", "House Points", &summaries.house_totals),
        totals_table("Conduct Totals", "House", "Conduct Points", &summaries.conduct_totals),
        forms_table("Top Forms (House)", "House Points", &summaries.top_house_forms),
        forms_table("Top Forms (Conduct)", "Conduct Points", &summaries.top_conduct_forms),
        categories_table("House Categories", &summaries.house_categories),
        categories_table("Conduct Categories", &summaries.conduct_categories),
        events_table("House Points Raw", &partition.house),
        events_table("Conduct Points Raw", &partition.conduct),
    ]
}

/// Write one table as CSV.
pub fn write_csv<W: Write>(table: &SheetTable, writer: W) -> ExportResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&table.headers)?;
    for row in &table.rows {
        csv_writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write each table to `<dir>/<slug>.csv`, creating `dir` if needed.
pub fn write_csv_dir(tables: &[SheetTable], dir: &Path) -> ExportResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(tables.len());
    for table in tables {
        let path = dir.join(format!("{}.csv", table.slug()));
        let file = std::fs::File::create(&path)?;
        write_csv(table, file)?;
        written.push(path);
    }
    Ok(written)
}
