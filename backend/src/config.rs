//! Run configuration.
//!
//! Everything the pipeline needs is passed in through [`PipelineConfig`];
//! nothing is read from module-level state. Defaults can be overridden from
//! the environment (a `.env` file is loaded by the binary) and then by CLI
//! flags or form fields.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::Field;

/// Weekly house points target per staff member.
pub const DEFAULT_WEEKLY_TARGET: i64 = 15;

/// Default cumulative tracker location used by the CLI and server.
pub const DEFAULT_TRACKER_PATH: &str = "./cumulative_tracker.csv";

/// How many forms to keep per house in the top-forms views.
pub const DEFAULT_TOP_FORMS: usize = 3;

/// Environment variable overriding the weekly target.
pub const ENV_TARGET: &str = "HOUSEPOINTS_TARGET";

/// Environment variable overriding the tracker path.
pub const ENV_TRACKER: &str = "HOUSEPOINTS_TRACKER";

/// Environment variable overriding the conduct measure (`count` / `magnitude`).
pub const ENV_CONDUCT_MEASURE: &str = "HOUSEPOINTS_CONDUCT_MEASURE";

/// How conduct events are measured in every conduct aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConductMeasure {
    /// One per event, regardless of its point value.
    #[default]
    Count,
    /// Sum of absolute point values.
    Magnitude,
}

impl ConductMeasure {
    /// Contribution of a single conduct event (points already absolute).
    pub fn weigh(self, points: i64) -> i64 {
        match self {
            ConductMeasure::Count => 1,
            ConductMeasure::Magnitude => points.saturating_abs(),
        }
    }
}

/// House code to full house name lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseMap {
    codes: BTreeMap<String, String>,
}

impl HouseMap {
    /// Build a map from `(code, name)` pairs. Codes are stored upper case.
    pub fn new<I, C, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        let codes = pairs
            .into_iter()
            .map(|(c, n)| (c.into().trim().to_uppercase(), n.into()))
            .collect();
        Self { codes }
    }

    /// Full name for an upper-case code.
    pub fn name_for_code(&self, code: &str) -> Option<&str> {
        self.codes.get(code).map(String::as_str)
    }

    /// Canonical spelling of a full house name, compared case-insensitively.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.codes
            .values()
            .find(|n| n.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// All house names in code order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codes.values().map(String::as_str)
    }
}

impl Default for HouseMap {
    fn default() -> Self {
        Self::new([
            ("B", "Brunel"),
            ("L", "Liddell"),
            ("D", "Dickens"),
            ("W", "Wilberforce"),
        ])
    }
}

/// Options for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Canonical columns the upload must provide, in output order.
    pub expected_columns: Vec<String>,

    /// Canonical columns used when present; never required for a name match.
    pub optional_columns: Vec<String>,

    /// House code lookup.
    pub houses: HouseMap,

    /// House points a staff member must reach to be on target.
    pub weekly_target: i64,

    /// Label identifying this run in exports and the tracker.
    pub week_label: String,

    /// Cumulative tracker CSV; `None` skips the tracker step.
    pub tracker_path: Option<PathBuf>,

    /// Measure used for every conduct aggregate.
    pub conduct_measure: ConductMeasure,

    /// Forms kept per house in the top-forms views.
    pub top_forms: usize,

    /// Rename columns by position when names do not match but the count does.
    pub allow_positional: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expected_columns: Field::EXPECTED.iter().map(|f| f.name().to_string()).collect(),
            optional_columns: Field::OPTIONAL.iter().map(|f| f.name().to_string()).collect(),
            houses: HouseMap::default(),
            weekly_target: DEFAULT_WEEKLY_TARGET,
            week_label: default_week_label(),
            tracker_path: None,
            conduct_measure: ConductMeasure::default(),
            top_forms: DEFAULT_TOP_FORMS,
            allow_positional: true,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with any `HOUSEPOINTS_*` environment variables.
    ///
    /// Unparseable values are ignored and the default kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(target) = std::env::var(ENV_TARGET).ok().and_then(|v| v.trim().parse().ok()) {
            config.weekly_target = target;
        }
        if let Ok(path) = std::env::var(ENV_TRACKER) {
            if !path.trim().is_empty() {
                config.tracker_path = Some(PathBuf::from(path.trim()));
            }
        }
        if let Some(measure) = std::env::var(ENV_CONDUCT_MEASURE)
            .ok()
            .and_then(|v| ConductMeasure::from_str(v.trim(), true).ok())
        {
            config.conduct_measure = measure;
        }

        config
    }

    /// Default export file name for this run.
    ///
    /// Path separators, quotes and control characters in the week label are
    /// replaced with `_`, so the name stays a single file in the current
    /// directory and is safe in a `Content-Disposition` header.
    pub fn export_file_name(&self) -> String {
        let label: String = self
            .week_label
            .chars()
            .map(|c| match c {
                '/' | '\\' | '"' | ':' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        format!("weekly_summary_{}.xlsx", label)
    }
}

/// Today's date as `YYYY-MM-DD`.
pub fn default_week_label() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
