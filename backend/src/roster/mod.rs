//! Staff roster: the left side of the per-staff join.
//!
//! A staff CSV usually carries `First Name, Surname, Initials, Dep`. Each
//! field is taken from the first header that names it, falling back to the
//! column position when no header does.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::error::RosterError;
use crate::models::{EventRecord, RosterEntry};
use crate::parser::{parse_bytes_auto, RawTable};

const FIRST_NAME_HEADERS: [&str; 3] = ["First Name", "FirstName", "Firstname"];
const SURNAME_HEADERS: [&str; 4] = ["Surname", "Last Name", "LastName", "Last"];
const INITIALS_HEADERS: [&str; 3] = ["Initials", "Initial", "Initials."];
const DEPARTMENT_HEADERS: [&str; 4] = ["Dep", "Department", "Dept", "Dept."];

/// Known staff, unique by initials, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Build from entries. Initials are upper-cased; blanks and repeats are dropped.
    pub fn from_entries(entries: Vec<RosterEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .map(|mut e| {
                e.initials = e.initials.trim().to_uppercase();
                e
            })
            .filter(|e| !e.initials.is_empty() && seen.insert(e.initials.clone()))
            .collect();
        Self { entries }
    }

    /// Roster of the distinct teachers found in the events, used when no
    /// staff list is available.
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a EventRecord>,
    {
        let mut teachers: Vec<&str> = events.into_iter().map(|e| e.teacher.as_str()).collect();
        teachers.sort_unstable();
        teachers.dedup();
        Self::from_entries(teachers.into_iter().map(RosterEntry::from_initials).collect())
    }

    /// Parse a staff CSV from bytes.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, RosterError> {
        let table = parse_bytes_auto(bytes)?;
        Ok(Self::from_table(&table))
    }

    /// Parse a staff CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, RosterError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_csv_bytes(&bytes)
    }

    /// Build from an already parsed table.
    pub fn from_table(table: &RawTable) -> Self {
        let first_col = choose_column(table, &FIRST_NAME_HEADERS, 0);
        let surname_col = choose_column(table, &SURNAME_HEADERS, 1);
        let initials_col = choose_column(table, &INITIALS_HEADERS, 2);
        let department_col = choose_column(table, &DEPARTMENT_HEADERS, 3);

        let cell = |row: usize, col: Option<usize>| -> String {
            col.map(|c| table.cell(row, c).trim().to_string())
                .unwrap_or_default()
        };

        let entries = (0..table.rows.len())
            .map(|row| {
                let first_name = cell(row, first_col);
                let surname = cell(row, surname_col);
                RosterEntry {
                    initials: cell(row, initials_col),
                    full_name: format!("{} {}", first_name, surname).trim().to_string(),
                    first_name,
                    surname,
                    department: cell(row, department_col),
                }
            })
            .collect();

        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `initials` (upper case) is on the roster.
    pub fn contains(&self, initials: &str) -> bool {
        self.entries.iter().any(|e| e.initials == initials)
    }

    pub fn get(&self, initials: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.initials == initials)
    }
}

/// Index of the first header in `names`, else `fallback` if the table is wide enough.
fn choose_column(table: &RawTable, names: &[&str], fallback: usize) -> Option<usize> {
    names
        .iter()
        .find_map(|name| table.headers.iter().position(|h| h == name))
        .or_else(|| (fallback < table.headers.len()).then_some(fallback))
}
