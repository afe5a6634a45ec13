//! Header alignment against the expected column list.
//!
//! Three strategies, tried in order:
//!
//! ```text
//! ExactName   header set ⊇ expected       → select + reorder
//! Positional  header count == expected   → rename in file order
//! Alias       otherwise                   → regex alias match per field,
//!                                           blank column when unmatched
//! ```
//!
//! Alignment never fails: a field nothing matches becomes a blank column and
//! is reported in [`AlignedTable::missing`].

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::RawTable;
use crate::models::Field;

/// Which strategy produced the alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderStrategy {
    ExactName,
    Positional,
    Alias,
}

impl std::fmt::Display for HeaderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            HeaderStrategy::ExactName => "exact name",
            HeaderStrategy::Positional => "positional",
            HeaderStrategy::Alias => "alias",
        };
        f.write_str(label)
    }
}

/// One canonical column and the raw values feeding it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedColumn {
    /// Canonical name.
    pub name: String,
    /// Source header, `None` when synthesized blank.
    pub source: Option<String>,
    pub values: Vec<String>,
}

/// Canonical column name → raw values, plus how they were found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedTable {
    pub columns: Vec<AlignedColumn>,
    pub strategy: HeaderStrategy,
    pub row_count: usize,
    /// Expected columns no source header could supply.
    pub missing: Vec<String>,
}

impl AlignedTable {
    /// Values of a canonical column.
    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Raw value of a canonical field at a row, blank if absent.
    pub fn value(&self, field: Field, row: usize) -> &str {
        self.column(field.name())
            .and_then(|values| values.get(row))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Canonical column names in output order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Regex aliases per canonical field, matched against a simplified header
/// (lower case, punctuation collapsed to single spaces).
static ALIASES: Lazy<Vec<(Field, Vec<Regex>)>> = Lazy::new(|| {
    let table: [(Field, &[&str]); 13] = [
        (
            Field::PupilName,
            &[
                r"^(pupil|student|learner|child)( full)? name$",
                r"^(pupil|student|learner)$",
                r"^(full )?name$",
            ],
        ),
        (Field::House, &[r"^house( name| code| group)?$"]),
        (
            Field::Form,
            &[
                r"^form( group| class)?$",
                r"^(tutor|reg|registration) group$",
                r"^class$",
            ],
        ),
        (Field::Year, &[r"^(year|yr)( group)?$", r"^nc year$"]),
        (
            Field::Reward,
            &[r"^reward( type)?$", r"^(award|point) type$", r"^award$", r"^type$"],
        ),
        (Field::Category, &[r"^categor(y|ies)( name)?$", r"^reason$"]),
        (Field::Points, &[r"^points?$", r"^pts$", r"^(points )?value$", r"^score$", r"^amount$"]),
        (Field::Date, &[r"^date( awarded| issued| and time| time)?$", r"^timestamp$", r"^when$"]),
        (
            Field::RewardDescription,
            &[r"^(reward )?description$", r"^comments?$", r"^notes?$", r"^details$"],
        ),
        (
            Field::Teacher,
            &[
                r"^teacher( initials| code| name)?$",
                r"^staff( initials| code| name| member)?$",
                r"^(awarded|issued|recorded) by$",
                r"^initials$",
            ],
        ),
        (Field::Department, &[r"^dep(t|artment)?$", r"^faculty$"]),
        (Field::Subject, &[r"^subject( taught)?$", r"^lesson$"]),
        (Field::Email, &[r"^e ?mail( address)?$"]),
    ];

    table
        .iter()
        .map(|(field, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("alias patterns are valid regexes"))
                .collect();
            (*field, compiled)
        })
        .collect()
});

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));

/// Lower-case a header and collapse punctuation/whitespace runs to one space.
pub fn simplify_header(header: &str) -> String {
    NON_ALNUM
        .replace_all(&header.to_lowercase(), " ")
        .trim()
        .to_string()
}

fn aliases_for(name: &str) -> &'static [Regex] {
    Field::from_name(name)
        .and_then(|field| ALIASES.iter().find(|(f, _)| *f == field))
        .map(|(_, patterns)| patterns.as_slice())
        .unwrap_or(&[])
}

/// Align a parsed table to the expected (and optional) canonical columns.
pub fn align_headers(
    table: &RawTable,
    expected: &[String],
    optional: &[String],
    allow_positional: bool,
) -> AlignedTable {
    let header_set: HashSet<&str> = table.headers.iter().map(String::as_str).collect();

    let (strategy, mapping) = if expected.iter().all(|e| header_set.contains(e.as_str())) {
        let mut mapping: Vec<(String, Option<usize>)> = expected
            .iter()
            .map(|e| (e.clone(), table.headers.iter().position(|h| h == e)))
            .collect();
        let claimed: HashSet<usize> = mapping.iter().filter_map(|(_, i)| *i).collect();
        mapping.extend(match_fields(table, optional, claimed));
        (HeaderStrategy::ExactName, mapping)
    } else if allow_positional && table.headers.len() == expected.len() {
        let mut mapping: Vec<(String, Option<usize>)> = expected
            .iter()
            .enumerate()
            .map(|(i, e)| (e.clone(), Some(i)))
            .collect();
        mapping.extend(optional.iter().map(|o| (o.clone(), None)));
        (HeaderStrategy::Positional, mapping)
    } else {
        let wanted: Vec<String> = expected.iter().chain(optional.iter()).cloned().collect();
        (HeaderStrategy::Alias, match_fields(table, &wanted, HashSet::new()))
    };

    let row_count = table.rows.len();
    let mut missing = Vec::new();
    let columns = mapping
        .into_iter()
        .map(|(name, index)| match index {
            Some(col) => AlignedColumn {
                source: table.headers.get(col).cloned(),
                values: (0..row_count).map(|r| table.cell(r, col).to_string()).collect(),
                name,
            },
            None => {
                if expected.contains(&name) {
                    missing.push(name.clone());
                }
                AlignedColumn {
                    name,
                    source: None,
                    values: vec![String::new(); row_count],
                }
            }
        })
        .collect();

    AlignedTable {
        columns,
        strategy,
        row_count,
        missing,
    }
}

/// Find a source column for each wanted name, never reusing a column.
///
/// Case-insensitive exact names are claimed first so an alias such as
/// `name` cannot steal a column another field names exactly.
fn match_fields(
    table: &RawTable,
    wanted: &[String],
    mut claimed: HashSet<usize>,
) -> Vec<(String, Option<usize>)> {
    let simplified: Vec<String> = table.headers.iter().map(|h| simplify_header(h)).collect();
    let mut found: Vec<Option<usize>> = vec![None; wanted.len()];

    for (slot, name) in wanted.iter().enumerate() {
        let target = simplify_header(name);
        if let Some(col) = (0..simplified.len())
            .find(|col| !claimed.contains(col) && simplified[*col] == target)
        {
            claimed.insert(col);
            found[slot] = Some(col);
        }
    }

    for (slot, name) in wanted.iter().enumerate() {
        if found[slot].is_some() {
            continue;
        }
        'patterns: for pattern in aliases_for(name) {
            for (col, header) in simplified.iter().enumerate() {
                if !claimed.contains(&col) && pattern.is_match(header) {
                    claimed.insert(col);
                    found[slot] = Some(col);
                    break 'patterns;
                }
            }
        }
    }

    wanted.iter().cloned().zip(found).collect()
}
