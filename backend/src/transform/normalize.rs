//! Field normalization: aligned raw strings → [`EventRecord`]s.
//!
//! Parsers return `Result<_, FieldError>`; [`normalize`] is the single place
//! that decides the substitute (0 for points, unknown for dates) and counts
//! each substitution in a [`NormalizeReport`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::HouseMap;
use crate::error::FieldError;
use crate::models::{EventRecord, Field};
use crate::parser::AlignedTable;

/// Date-time layouts seen in rewards exports.
const DATETIME_FORMATS: [&str; 6] = [
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M",
];

/// Date-only layouts seen in rewards exports.
const DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y"];

/// Counts of values replaced by a default during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeReport {
    pub rows: usize,
    /// Non-blank point values that were not numbers (now 0).
    pub coerced_points: usize,
    /// Blank point values (now 0).
    pub blank_points: usize,
    /// Non-blank dates that could not be parsed (now unknown).
    pub unknown_dates: usize,
    /// House values not found in the house map (kept as raw text).
    pub unmapped_houses: usize,
}

/// Largest point magnitude accepted for a single event.
pub const MAX_EVENT_POINTS: i64 = i32::MAX as i64;

/// Parse a point value. Decimal text truncates toward zero.
///
/// Values beyond [`MAX_EVENT_POINTS`] in magnitude are rejected.
pub fn parse_points(raw: &str) -> Result<i64, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FieldError::Blank);
    }
    let points = match value.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => value
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.trunc().abs() <= MAX_EVENT_POINTS as f64)
            .map(|f| f.trunc() as i64),
    };
    points
        .filter(|n| n.unsigned_abs() <= MAX_EVENT_POINTS as u64)
        .ok_or_else(|| FieldError::NotANumber(value.to_string()))
}

/// Parse a calendar date or timestamp.
pub fn parse_date(raw: &str) -> Result<NaiveDateTime, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FieldError::Blank);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }
    Err(FieldError::NotADate(value.to_string()))
}

/// Map a raw house value to its full name.
///
/// Returns `Err` with the uppercased text when the value is not a known code
/// or house name; callers keep that text rather than dropping it.
pub fn resolve_house(raw: &str, houses: &HouseMap) -> Result<String, String> {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return Ok(upper);
    }
    if let Some(name) = houses.name_for_code(&upper) {
        return Ok(name.to_string());
    }
    if let Some(name) = houses.canonical_name(&upper) {
        return Ok(name.to_string());
    }
    Err(upper)
}

/// Title-case a lower-case label for display.
pub fn title_case(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Build one [`EventRecord`] per aligned row.
pub fn normalize(table: &AlignedTable, houses: &HouseMap) -> (Vec<EventRecord>, NormalizeReport) {
    let mut report = NormalizeReport {
        rows: table.row_count,
        ..NormalizeReport::default()
    };
    let mut records = Vec::with_capacity(table.row_count);

    for row in 0..table.row_count {
        let text = |field: Field| table.value(field, row).trim().to_string();

        let points = match parse_points(table.value(Field::Points, row)) {
            Ok(p) => p,
            Err(FieldError::Blank) => {
                report.blank_points += 1;
                0
            }
            Err(_) => {
                report.coerced_points += 1;
                0
            }
        };

        let date = match parse_date(table.value(Field::Date, row)) {
            Ok(dt) => Some(dt),
            Err(FieldError::Blank) => None,
            Err(_) => {
                report.unknown_dates += 1;
                None
            }
        };

        let house = match resolve_house(table.value(Field::House, row), houses) {
            Ok(name) => name,
            Err(raw) => {
                report.unmapped_houses += 1;
                raw
            }
        };

        records.push(EventRecord {
            pupil_name: text(Field::PupilName),
            house,
            form: text(Field::Form),
            year: text(Field::Year),
            reward: text(Field::Reward).to_lowercase(),
            category: text(Field::Category).to_lowercase(),
            points,
            date,
            description: text(Field::RewardDescription),
            teacher: text(Field::Teacher).to_uppercase(),
            department: text(Field::Department),
            subject: text(Field::Subject),
            email: text(Field::Email),
        });
    }

    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::parser::{align_headers, RawTable};

    fn aligned(rows: &[&[&str]]) -> AlignedTable {
        let config = PipelineConfig::default();
        let raw = RawTable {
            headers: config.expected_columns.clone(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            encoding: "utf-8".into(),
            delimiter: ',',
        };
        align_headers(&raw, &config.expected_columns, &config.optional_columns, true)
    }

    #[test]
    fn test_parse_points() {
        assert_eq!(parse_points("5"), Ok(5));
        assert_eq!(parse_points(" -3 "), Ok(-3));
        assert_eq!(parse_points("+2"), Ok(2));
        assert_eq!(parse_points("5.0"), Ok(5));
        assert_eq!(parse_points("-2.7"), Ok(-2));
        assert_eq!(parse_points(""), Err(FieldError::Blank));
        assert_eq!(parse_points("abc"), Err(FieldError::NotANumber("abc".into())));
        assert!(parse_points("NaN").is_err());
    }

    #[test]
    fn test_parse_points_rejects_out_of_range() {
        assert_eq!(parse_points("2147483647"), Ok(MAX_EVENT_POINTS));
        assert_eq!(parse_points("-2147483647"), Ok(-MAX_EVENT_POINTS));
        assert!(parse_points("2147483648").is_err());
        assert!(parse_points("9223372036854775807").is_err());
        assert!(parse_points("-9223372036854775808").is_err());
        assert!(parse_points("1e30").is_err());
        assert!(parse_points("-1e30").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 9, 12).unwrap();
        for raw in ["12/09/2024", "2024-09-12", "12-09-2024", "12.09.2024"] {
            assert_eq!(parse_date(raw).unwrap().date(), expected, "{}", raw);
        }
        let dt = parse_date("12/09/2024 14:35").unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "14:35");
        assert!(parse_date("2024-09-12T08:00:00Z").is_ok());
        assert_eq!(parse_date("soon"), Err(FieldError::NotADate("soon".into())));
        assert_eq!(parse_date(" "), Err(FieldError::Blank));
    }

    #[test]
    fn test_resolve_house() {
        let houses = HouseMap::default();
        assert_eq!(resolve_house("b", &houses), Ok("Brunel".into()));
        assert_eq!(resolve_house(" W ", &houses), Ok("Wilberforce".into()));
        assert_eq!(resolve_house("DICKENS", &houses), Ok("Dickens".into()));
        assert_eq!(resolve_house("x", &houses), Err("X".into()));
        assert_eq!(resolve_house("", &houses), Ok(String::new()));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("house point"), "House Point");
        assert_eq!(title_case("  late   to lesson "), "Late To Lesson");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_normalize_record() {
        let table = aligned(&[&[
            " Ann Lee ", "b", "7A", "7", "House Point", "Excellent Work", "5", "12/09/2024",
            "Great essay", "ab", "English", "English",
        ]]);

        let (records, report) = normalize(&table, &HouseMap::default());

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.pupil_name, "Ann Lee");
        assert_eq!(r.house, "Brunel");
        assert_eq!(r.reward, "house point");
        assert_eq!(r.category, "excellent work");
        assert_eq!(r.points, 5);
        assert!(r.date.is_some());
        assert_eq!(r.teacher, "AB");
        assert_eq!(r.email, "");
        assert_eq!(report, NormalizeReport { rows: 1, ..NormalizeReport::default() });
    }

    #[test]
    fn test_normalize_substitutes_defaults() {
        let table = aligned(&[
            &["A", "Q", "", "", "", "", "lots", "someday", "", "cd", "", ""],
            &["B", "", "", "", "", "", "", "", "", "", "", ""],
        ]);

        let (records, report) = normalize(&table, &HouseMap::default());

        assert_eq!(records[0].points, 0);
        assert_eq!(records[0].date, None);
        assert_eq!(records[0].house, "Q");
        assert_eq!(records[1].points, 0);
        assert_eq!(report.coerced_points, 1);
        assert_eq!(report.blank_points, 1);
        assert_eq!(report.unknown_dates, 1);
        assert_eq!(report.unmapped_houses, 1);
    }
}
