//! # House points - weekly staff summaries from school rewards exports
//!
//! Reads a rewards/conduct export, splits it into house and conduct events,
//! joins per-staff totals onto a roster, keeps a cumulative weekly log and
//! exports every view as a workbook, CSV files or markdown.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │ Rewards CSV │──▶│   Parser    │──▶│  Normalize  │──▶│ Categorize  │──▶│  Aggregate  │
//! │ (any enc.)  │   │ (+ headers) │   │  (events)   │   │ house/cond. │   │   (views)   │
//! └─────────────┘   └─────────────┘   └─────────────┘   └─────────────┘   └──────┬──────┘
//!                                                                              │
//!                                         ┌────────────────┬──────────────────┤
//!                                         ▼                ▼                  ▼
//!                                    ┌─────────┐    ┌────────────┐     ┌────────────┐
//!                                    │ Tracker │    │ xlsx / CSV │     │  Markdown  │
//!                                    └─────────┘    └────────────┘     └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use housepoints::{run_file, PipelineConfig, Roster};
//!
//! let roster = Roster::from_csv_path("staff.csv")?;
//! let report = run_file("rewards.csv", Some(&roster), &PipelineConfig::default())?;
//! println!("{} staff on target", report.summaries.staff.iter().filter(|s| s.on_target).count());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Run configuration and defaults
//! - [`models`] - Events, roster entries and summary rows
//! - [`parser`] - Delimited parsing with auto-detection and header alignment
//! - [`transform`] - Normalize, categorize, aggregate and the pipeline
//! - [`roster`] - Staff roster loading
//! - [`tracker`] - Cumulative weekly log
//! - [`export`] - Workbook, CSV and markdown output
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Reference data and history
pub mod roster;
pub mod tracker;

// Output
pub mod export;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    ExportError, FieldError, LoadError, PipelineError, RosterError, ServerError, TrackerError,
};

// =============================================================================
// Re-exports - Config & Models
// =============================================================================

pub use config::{ConductMeasure, HouseMap, PipelineConfig, DEFAULT_TRACKER_PATH, DEFAULT_WEEKLY_TARGET};

pub use models::{
    CategoryCount, ContributionStatus, EventRecord, Field, FormRanking, GroupTotal, RosterEntry,
    StaffStats, StaffSummaryRow, StudentSummaryRow, TrackerRecord,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    align_headers, decode_content, detect_delimiter, detect_encoding, parse_bytes_auto,
    parse_file_auto, AlignedTable, HeaderStrategy, RawTable,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    aggregate, categorize, normalize, run_bytes, run_file, ClassificationRule, LoadInfo,
    NormalizeReport, Partition, RunReport, Summaries, TrackerOutcome,
};

pub use roster::Roster;
pub use tracker::{CumulativeTracker, TrackerUpdate};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ResponseMetadata, UploadResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
