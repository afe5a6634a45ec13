//! Error types for the house points pipeline.
//!
//! - [`LoadError`] - Unreadable or empty upload (aborts the run)
//! - [`FieldError`] - A single value that could not be parsed
//! - [`RosterError`] - Staff roster file errors
//! - [`TrackerError`] - Cumulative log read/write errors
//! - [`ExportError`] - Spreadsheet / CSV export errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while reading an uploaded events file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid delimited format.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::ParseError(err.to_string())
    }
}

// =============================================================================
// Field Errors
// =============================================================================

/// A single raw value that could not be coerced to its field type.
///
/// The normalizer decides what to substitute; parsers only report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Value was blank.
    #[error("value is blank")]
    Blank,

    /// Value is not a number.
    #[error("'{0}' is not a number")]
    NotANumber(String),

    /// Value is not a recognised date.
    #[error("'{0}' is not a recognised date")]
    NotADate(String),
}

// =============================================================================
// Roster Errors
// =============================================================================

/// Errors while loading the staff roster.
#[derive(Debug, Error)]
pub enum RosterError {
    /// Failed to read file.
    #[error("Failed to read staff file: {0}")]
    IoError(#[from] std::io::Error),

    /// The roster file could not be parsed.
    #[error("Invalid staff file: {0}")]
    Load(#[from] LoadError),
}

// =============================================================================
// Tracker Errors
// =============================================================================

/// Errors from the cumulative tracker log.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// IO error reading or rewriting the log.
    #[error("Tracker IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The log exists but is not valid CSV.
    #[error("Tracker CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing summary exports.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("Export IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV writer error.
    #[error("Export CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Workbook writer error.
    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// Only a load failure aborts a run. Tracker failures are carried in the
/// run report instead of being returned here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upload could not be read.
    #[error("Could not read rewards CSV: {0}")]
    Load(#[from] LoadError),

    /// Roster could not be read.
    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    /// Export failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
