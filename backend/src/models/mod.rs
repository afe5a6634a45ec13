//! Domain models for the house points pipeline.
//!
//! - [`Field`] - Canonical upload columns
//! - [`EventRecord`] - One normalized upload row
//! - [`RosterEntry`] - A known staff member
//! - Aggregate rows ([`StaffSummaryRow`], [`StudentSummaryRow`], ...)
//! - [`TrackerRecord`] / [`StaffStats`] - Cumulative log rows and derived stats

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// =============================================================================
// Canonical Fields
// =============================================================================

/// Canonical column of the rewards export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    PupilName,
    House,
    Form,
    Year,
    Reward,
    Category,
    Points,
    Date,
    RewardDescription,
    Teacher,
    Department,
    Subject,
    Email,
}

impl Field {
    /// Columns expected in every upload, in export order.
    pub const EXPECTED: [Field; 12] = [
        Field::PupilName,
        Field::House,
        Field::Form,
        Field::Year,
        Field::Reward,
        Field::Category,
        Field::Points,
        Field::Date,
        Field::RewardDescription,
        Field::Teacher,
        Field::Department,
        Field::Subject,
    ];

    /// Columns used when present.
    pub const OPTIONAL: [Field; 1] = [Field::Email];

    /// Header text of this column.
    pub fn name(&self) -> &'static str {
        match self {
            Field::PupilName => "Pupil Name",
            Field::House => "House",
            Field::Form => "Form",
            Field::Year => "Year",
            Field::Reward => "Reward",
            Field::Category => "Category",
            Field::Points => "Points",
            Field::Date => "Date",
            Field::RewardDescription => "Reward Description",
            Field::Teacher => "Teacher",
            Field::Department => "Dep",
            Field::Subject => "Subject",
            Field::Email => "Email",
        }
    }

    /// Look up a field by its exact header text.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::EXPECTED
            .iter()
            .chain(Self::OPTIONAL.iter())
            .copied()
            .find(|f| f.name() == name)
    }
}

// =============================================================================
// Event Record
// =============================================================================

/// One row of the upload after normalization.
///
/// Every field is always present; blanks are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub pupil_name: String,
    /// Full house name, or the uppercased raw value when unmapped.
    pub house: String,
    pub form: String,
    pub year: String,
    /// Reward type, lower case.
    pub reward: String,
    /// Category label, lower case.
    pub category: String,
    pub points: i64,
    /// `None` when the date was blank or unparseable.
    pub date: Option<NaiveDateTime>,
    pub description: String,
    /// Staff initials, upper case.
    pub teacher: String,
    pub department: String,
    pub subject: String,
    pub email: String,
}

// =============================================================================
// Roster
// =============================================================================

/// A known staff member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Canonical upper-case initials.
    pub initials: String,
    pub first_name: String,
    pub surname: String,
    pub full_name: String,
    pub department: String,
}

impl RosterEntry {
    /// Entry carrying only initials (display name = initials).
    pub fn from_initials(initials: &str) -> Self {
        let initials = initials.trim().to_uppercase();
        Self {
            full_name: initials.clone(),
            initials,
            ..Self::default()
        }
    }
}

// =============================================================================
// Aggregate Rows
// =============================================================================

/// Per-staff weekly summary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSummaryRow {
    pub teacher: String,
    pub full_name: String,
    pub department: String,
    pub house_points: i64,
    pub conduct_points: i64,
    pub on_target: bool,
    /// False for teachers seen in the data but missing from the roster.
    pub in_roster: bool,
}

/// Per-student house points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummaryRow {
    pub pupil_name: String,
    pub form: String,
    pub year: String,
    pub house: String,
    pub house_points: i64,
}

/// A single keyed measure (house totals, department totals).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotal {
    pub key: String,
    pub value: i64,
}

/// One entry of a per-house top-forms ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRanking {
    pub house: String,
    pub form: String,
    pub value: i64,
    /// 1-based position within the house.
    pub rank: usize,
}

/// How often a category label occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Display (title case) label.
    pub category: String,
    pub frequency: usize,
}

// =============================================================================
// Cumulative Tracker
// =============================================================================

/// One (staff, run) row of the cumulative log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerRecord {
    #[serde(rename = "Teacher")]
    pub teacher: String,
    #[serde(rename = "House Points This Week")]
    pub house_points: i64,
    #[serde(rename = "Conduct Points This Week")]
    pub conduct_points: i64,
    #[serde(rename = "Week")]
    pub week: String,
}

/// Whether a staff member's running average meets the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContributionStatus {
    Positive,
    Negative,
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionStatus::Positive => "Positive",
            ContributionStatus::Negative => "Negative",
        }
    }
}

/// Running statistics for one staff member over the whole log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub teacher: String,
    pub total_house_points: i64,
    pub weeks_reported: usize,
    /// Mean house points per log row, rounded to 2 decimals.
    pub avg_house_per_week: f64,
    pub status: ContributionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::EXPECTED.iter().chain(Field::OPTIONAL.iter()) {
            assert_eq!(Field::from_name(field.name()), Some(*field));
        }
        assert_eq!(Field::from_name("Dept"), None);
    }

    #[test]
    fn test_roster_entry_from_initials() {
        let entry = RosterEntry::from_initials(" ab ");
        assert_eq!(entry.initials, "AB");
        assert_eq!(entry.full_name, "AB");
        assert!(entry.department.is_empty());
    }

    #[test]
    fn test_tracker_record_headers() {
        let record = TrackerRecord {
            teacher: "AB".into(),
            house_points: 10,
            conduct_points: 2,
            week: "W1".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["House Points This Week"], 10);
        assert_eq!(json["Week"], "W1");
    }
}
