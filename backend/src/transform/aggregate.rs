//! Group-by summaries over a [`Partition`].
//!
//! Every view is a full recomputation. Empty input yields an empty `Vec`,
//! never an error. Output order is deterministic: measure descending, then
//! key ascending.

use std::collections::BTreeMap;

use serde::Serialize;

use super::categorize::Partition;
use super::normalize::title_case;
use crate::config::{ConductMeasure, PipelineConfig};
use crate::models::{
    CategoryCount, EventRecord, FormRanking, GroupTotal, StaffSummaryRow, StudentSummaryRow,
};
use crate::roster::Roster;

/// Label used for events without a house.
pub const UNKNOWN_HOUSE: &str = "Unknown";

/// Every summary view of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summaries {
    pub staff: Vec<StaffSummaryRow>,
    pub students: Vec<StudentSummaryRow>,
    pub house_totals: Vec<GroupTotal>,
    pub conduct_totals: Vec<GroupTotal>,
    pub departments: Vec<GroupTotal>,
    pub staff_departments: Vec<GroupTotal>,
    pub top_house_forms: Vec<FormRanking>,
    pub top_conduct_forms: Vec<FormRanking>,
    pub house_categories: Vec<CategoryCount>,
    pub conduct_categories: Vec<CategoryCount>,
}

/// Compute every view.
pub fn aggregate(partition: &Partition, roster: &Roster, config: &PipelineConfig) -> Summaries {
    let measure = config.conduct_measure;
    let staff = staff_summary(partition, roster, measure, config.weekly_target);

    Summaries {
        students: student_summary(&partition.house),
        house_totals: house_totals(&partition.house),
        conduct_totals: conduct_totals(&partition.conduct, measure),
        departments: department_totals(&partition.house),
        staff_departments: staff_department_totals(&staff),
        top_house_forms: top_forms(&partition.house, |e| e.points, config.top_forms),
        top_conduct_forms: top_forms(&partition.conduct, |e| measure.weigh(e.points), config.top_forms),
        house_categories: category_frequency(&partition.house),
        conduct_categories: category_frequency(&partition.conduct),
        staff,
    }
}

fn sum_by<K, F, M>(events: &[EventRecord], key: F, measure: M) -> BTreeMap<K, i64>
where
    K: Ord,
    F: Fn(&EventRecord) -> K,
    M: Fn(&EventRecord) -> i64,
{
    let mut groups = BTreeMap::new();
    for event in events {
        let total = groups.entry(key(event)).or_insert(0i64);
        *total = total.saturating_add(measure(event));
    }
    groups
}

fn house_label(house: &str) -> String {
    if house.is_empty() {
        UNKNOWN_HOUSE.to_string()
    } else {
        house.to_string()
    }
}

fn into_sorted_totals(groups: BTreeMap<String, i64>) -> Vec<GroupTotal> {
    let mut totals: Vec<GroupTotal> = groups
        .into_iter()
        .map(|(key, value)| GroupTotal { key, value })
        .collect();
    totals.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    totals
}

/// Per-staff house sum and conduct measure, joined onto the roster.
///
/// Every roster entry appears exactly once. Teachers found only in the data
/// are kept as extra rows with `in_roster = false`.
pub fn staff_summary(
    partition: &Partition,
    roster: &Roster,
    measure: ConductMeasure,
    target: i64,
) -> Vec<StaffSummaryRow> {
    let house = sum_by(&partition.house, |e| e.teacher.clone(), |e| e.points);
    let conduct = sum_by(&partition.conduct, |e| e.teacher.clone(), |e| measure.weigh(e.points));

    let row = |teacher: &str, full_name: &str, department: &str, in_roster: bool| {
        let house_points = house.get(teacher).copied().unwrap_or(0);
        StaffSummaryRow {
            teacher: teacher.to_string(),
            full_name: full_name.to_string(),
            department: department.to_string(),
            house_points,
            conduct_points: conduct.get(teacher).copied().unwrap_or(0),
            on_target: house_points >= target,
            in_roster,
        }
    };

    let mut rows: Vec<StaffSummaryRow> = roster
        .entries()
        .iter()
        .map(|entry| row(&entry.initials, &entry.full_name, &entry.department, true))
        .collect();

    let mut extras: Vec<&String> = house
        .keys()
        .chain(conduct.keys())
        .filter(|teacher| !roster.contains(teacher))
        .collect();
    extras.sort();
    extras.dedup();
    rows.extend(extras.into_iter().map(|teacher| row(teacher, "", "", false)));

    rows.sort_by(|a, b| {
        b.house_points
            .cmp(&a.house_points)
            .then_with(|| a.teacher.cmp(&b.teacher))
    });
    rows
}

/// House points per (pupil, form, year, house).
pub fn student_summary(house: &[EventRecord]) -> Vec<StudentSummaryRow> {
    let groups = sum_by(
        house,
        |e| (e.pupil_name.clone(), e.form.clone(), e.year.clone(), e.house.clone()),
        |e| e.points,
    );

    let mut rows: Vec<StudentSummaryRow> = groups
        .into_iter()
        .map(|((pupil_name, form, year, house), house_points)| StudentSummaryRow {
            pupil_name,
            form,
            year,
            house,
            house_points,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.house_points
            .cmp(&a.house_points)
            .then_with(|| a.pupil_name.cmp(&b.pupil_name))
    });
    rows
}

/// House points summed per house.
pub fn house_totals(house: &[EventRecord]) -> Vec<GroupTotal> {
    into_sorted_totals(sum_by(house, |e| house_label(&e.house), |e| e.points))
}

/// Conduct measure per house.
pub fn conduct_totals(conduct: &[EventRecord], measure: ConductMeasure) -> Vec<GroupTotal> {
    into_sorted_totals(sum_by(conduct, |e| house_label(&e.house), |e| measure.weigh(e.points)))
}

/// House points summed per department of the event.
pub fn department_totals(house: &[EventRecord]) -> Vec<GroupTotal> {
    into_sorted_totals(sum_by(house, |e| e.department.clone(), |e| e.points))
}

/// Staff house points summed per roster department.
pub fn staff_department_totals(staff: &[StaffSummaryRow]) -> Vec<GroupTotal> {
    let mut groups: BTreeMap<String, i64> = BTreeMap::new();
    for row in staff.iter().filter(|r| r.in_roster) {
        let total = groups.entry(row.department.clone()).or_insert(0);
        *total = total.saturating_add(row.house_points);
    }
    into_sorted_totals(groups)
}

/// Top `n` forms per house by the given measure.
pub fn top_forms<M>(events: &[EventRecord], measure: M, n: usize) -> Vec<FormRanking>
where
    M: Fn(&EventRecord) -> i64,
{
    let groups = sum_by(events, |e| (house_label(&e.house), e.form.clone()), measure);

    let mut by_house: BTreeMap<String, Vec<(String, i64)>> = BTreeMap::new();
    for ((house, form), value) in groups {
        by_house.entry(house).or_default().push((form, value));
    }

    let mut rankings = Vec::new();
    for (house, mut forms) in by_house {
        forms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (i, (form, value)) in forms.into_iter().take(n).enumerate() {
            rankings.push(FormRanking {
                house: house.clone(),
                form,
                value,
                rank: i + 1,
            });
        }
    }
    rankings
}

/// Event count per category label.
pub fn category_frequency(events: &[EventRecord]) -> Vec<CategoryCount> {
    let mut groups: BTreeMap<String, usize> = BTreeMap::new();
    for event in events {
        *groups.entry(event.category.to_lowercase()).or_insert(0) += 1;
    }

    let mut counts: Vec<CategoryCount> = groups
        .into_iter()
        .map(|(category, frequency)| CategoryCount {
            category: title_case(&category),
            frequency,
        })
        .collect();
    counts.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.category.cmp(&b.category))
    });
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RosterEntry;
    use crate::transform::categorize::{categorize, ClassificationRule};

    fn event(teacher: &str, reward: &str, points: i64, house: &str, form: &str) -> EventRecord {
        EventRecord {
            pupil_name: format!("Pupil {}", form),
            house: house.into(),
            form: form.into(),
            year: "7".into(),
            reward: reward.into(),
            category: if reward == "house" { "effort".into() } else { "late".into() },
            points,
            teacher: teacher.into(),
            department: "Maths".into(),
            ..EventRecord::default()
        }
    }

    fn roster(initials: &[&str]) -> Roster {
        Roster::from_entries(initials.iter().map(|i| RosterEntry::from_initials(i)).collect())
    }

    fn sample() -> Vec<EventRecord> {
        vec![
            event("AB", "house", 5, "Brunel", "7A"),
            event("AB", "house", 3, "Brunel", "7B"),
            event("CD", "house", 20, "Dickens", "8A"),
            event("CD", "conduct", 3, "Dickens", "8A"),
            event("CD", "conduct", 2, "Brunel", "7A"),
            event("XY", "house", 1, "", "9C"),
        ]
    }

    #[test]
    fn test_staff_summary_joins_roster() {
        let partition = categorize(&sample());
        let rows = staff_summary(&partition, &roster(&["AB", "CD", "ZZ"]), ConductMeasure::Count, 15);

        assert_eq!(rows.len(), 4);
        let zz = rows.iter().find(|r| r.teacher == "ZZ").unwrap();
        assert_eq!(zz.house_points, 0);
        assert_eq!(zz.conduct_points, 0);
        assert!(!zz.on_target);
        assert!(zz.in_roster);

        let cd = rows.iter().find(|r| r.teacher == "CD").unwrap();
        assert_eq!(cd.house_points, 20);
        assert_eq!(cd.conduct_points, 2);
        assert!(cd.on_target);

        let xy = rows.iter().find(|r| r.teacher == "XY").unwrap();
        assert!(!xy.in_roster);
        assert_eq!(rows[0].teacher, "CD");
    }

    #[test]
    fn test_staff_house_sum_matches_subset_sum() {
        let partition = categorize(&sample());
        let rows = staff_summary(&partition, &roster(&["AB"]), ConductMeasure::Count, 15);

        let staff_total: i64 = rows.iter().map(|r| r.house_points).sum();
        let subset_total: i64 = partition.house.iter().map(|e| e.points).sum();
        assert_eq!(staff_total, subset_total);
    }

    #[test]
    fn test_roster_entries_appear_once() {
        let partition = categorize(&sample());
        let rows = staff_summary(&partition, &roster(&["AB", "CD", "ZZ"]), ConductMeasure::Count, 15);

        for initials in ["AB", "CD", "ZZ"] {
            assert_eq!(rows.iter().filter(|r| r.teacher == initials).count(), 1);
        }
    }

    #[test]
    fn test_conduct_magnitude_measure() {
        let partition = categorize(&sample());
        let rows = staff_summary(&partition, &roster(&["CD"]), ConductMeasure::Magnitude, 15);
        assert_eq!(rows[0].conduct_points, 5);

        let totals = conduct_totals(&partition.conduct, ConductMeasure::Magnitude);
        assert_eq!(totals[0], GroupTotal { key: "Dickens".into(), value: 3 });
    }

    #[test]
    fn test_house_totals_label_unknown() {
        let partition = categorize(&sample());
        let totals = house_totals(&partition.house);

        assert_eq!(totals[0], GroupTotal { key: "Dickens".into(), value: 20 });
        assert_eq!(totals[1], GroupTotal { key: "Brunel".into(), value: 8 });
        assert_eq!(totals[2], GroupTotal { key: UNKNOWN_HOUSE.into(), value: 1 });
    }

    #[test]
    fn test_top_forms_keeps_n_per_house() {
        let events = vec![
            event("AB", "house", 1, "Brunel", "7A"),
            event("AB", "house", 4, "Brunel", "7B"),
            event("AB", "house", 2, "Brunel", "7C"),
            event("AB", "house", 3, "Brunel", "7D"),
            event("AB", "house", 9, "Liddell", "8A"),
        ];

        let rankings = top_forms(&events, |e| e.points, 3);

        let brunel: Vec<&str> = rankings
            .iter()
            .filter(|r| r.house == "Brunel")
            .map(|r| r.form.as_str())
            .collect();
        assert_eq!(brunel, vec!["7B", "7D", "7C"]);
        assert_eq!(rankings.iter().filter(|r| r.house == "Liddell").count(), 1);
        assert_eq!(rankings[0].rank, 1);
    }

    #[test]
    fn test_category_frequency_title_cases() {
        let partition = categorize(&sample());
        let counts = category_frequency(&partition.house);

        assert_eq!(counts, vec![CategoryCount { category: "Effort".into(), frequency: 4 }]);
    }

    #[test]
    fn test_student_and_department_views() {
        let partition = categorize(&sample());

        let students = student_summary(&partition.house);
        assert_eq!(students[0].pupil_name, "Pupil 8A");
        assert_eq!(students[0].house_points, 20);

        let departments = department_totals(&partition.house);
        assert_eq!(departments, vec![GroupTotal { key: "Maths".into(), value: 29 }]);
    }

    #[test]
    fn test_staff_department_totals_use_roster() {
        let mut entry = RosterEntry::from_initials("AB");
        entry.department = "Science".into();
        let roster = Roster::from_entries(vec![entry]);
        let partition = categorize(&sample());
        let staff = staff_summary(&partition, &roster, ConductMeasure::Count, 15);

        let totals = staff_department_totals(&staff);
        assert_eq!(totals, vec![GroupTotal { key: "Science".into(), value: 8 }]);
    }

    #[test]
    fn test_empty_input_gives_empty_views() {
        let partition = Partition {
            house: vec![],
            conduct: vec![],
            rule: ClassificationRule::Keyword,
        };
        let summaries = aggregate(&partition, &Roster::default(), &PipelineConfig::default());

        assert!(summaries.staff.is_empty());
        assert!(summaries.students.is_empty());
        assert!(summaries.house_totals.is_empty());
        assert!(summaries.top_conduct_forms.is_empty());
        assert!(summaries.conduct_categories.is_empty());
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let partition = categorize(&sample());
        let roster = roster(&["AB", "ZZ"]);
        let config = PipelineConfig::default();

        assert_eq!(aggregate(&partition, &roster, &config), aggregate(&partition, &roster, &config));
    }
}
