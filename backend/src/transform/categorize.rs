//! Split normalized events into house and conduct subsets.
//!
//! Keyword rule first; the sign-of-points fallback only runs when the
//! keyword rule matches nothing at all in the file.

use serde::Serialize;

use crate::models::EventRecord;

const HOUSE_KEYWORDS: [&str; 2] = ["house", "reward"];
const CONDUCT_KEYWORDS: [&str; 3] = ["conduct", "behaviour", "behavior"];

/// Rule that produced a [`Partition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassificationRule {
    /// Reward-type / category text matched keywords.
    Keyword,
    /// No keyword matched anywhere; split on the sign of points.
    PointSign,
}

impl std::fmt::Display for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationRule::Keyword => f.write_str("keyword"),
            ClassificationRule::PointSign => f.write_str("point sign"),
        }
    }
}

/// House and conduct subsets of one run.
///
/// Under the keyword rule an event may sit in both subsets. Conduct points
/// are absolute magnitudes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    pub house: Vec<EventRecord>,
    pub conduct: Vec<EventRecord>,
    pub rule: ClassificationRule,
}

fn mentions(event: &EventRecord, keywords: &[&str]) -> bool {
    let reward = event.reward.to_lowercase();
    let category = event.category.to_lowercase();
    keywords
        .iter()
        .any(|k| reward.contains(k) || category.contains(k))
}

/// True when the reward type or category names a house event.
pub fn is_house_event(event: &EventRecord) -> bool {
    mentions(event, &HOUSE_KEYWORDS)
}

/// True when the reward type or category names a conduct event.
pub fn is_conduct_event(event: &EventRecord) -> bool {
    mentions(event, &CONDUCT_KEYWORDS)
}

fn into_conduct(mut event: EventRecord) -> EventRecord {
    event.points = event.points.saturating_abs();
    event
}

/// Partition events into house and conduct subsets.
pub fn categorize(events: &[EventRecord]) -> Partition {
    let house: Vec<EventRecord> = events.iter().filter(|e| is_house_event(e)).cloned().collect();
    let conduct: Vec<EventRecord> = events
        .iter()
        .filter(|e| is_conduct_event(e))
        .cloned()
        .map(into_conduct)
        .collect();

    if !house.is_empty() || !conduct.is_empty() {
        return Partition {
            house,
            conduct,
            rule: ClassificationRule::Keyword,
        };
    }

    // Zero-point events land in the house subset so every event is placed once.
    let (house, conduct): (Vec<EventRecord>, Vec<EventRecord>) =
        events.iter().cloned().partition(|e| e.points >= 0);

    Partition {
        house,
        conduct: conduct.into_iter().map(into_conduct).collect(),
        rule: ClassificationRule::PointSign,
    }
}
