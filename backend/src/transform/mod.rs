//! Transformation module.
//!
//! - Normalize: aligned columns to typed events
//! - Categorize: house / conduct subsets
//! - Aggregate: summary views
//! - Pipeline: the end-to-end run

pub mod aggregate;
pub mod categorize;
pub mod normalize;
pub mod pipeline;

pub use aggregate::{aggregate, Summaries, UNKNOWN_HOUSE};
pub use categorize::{categorize, ClassificationRule, Partition};
pub use normalize::{normalize, NormalizeReport};
pub use pipeline::{run_bytes, run_file, run_table, LoadInfo, RunReport, TrackerOutcome};
