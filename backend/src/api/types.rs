//! REST API response types.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::transform::{RunReport, TrackerOutcome};

/// Response sent after an upload has been processed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready", "warning", "error"
    pub status: String,

    /// Full run report (views, raw subsets, tracker outcome)
    pub report: RunReport,

    pub metadata: ResponseMetadata,
}

/// Short facts about the upload, for display above the tables.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub staff_on_target: usize,
    pub staff_total: usize,
    /// Suggested download name for the workbook.
    pub export_file_name: String,
}

impl UploadResponse {
    pub fn from_report(report: RunReport, export_file_name: String) -> Self {
        // Anything degraded turns the status to "warning".
        let degraded = !report.load.missing.is_empty()
            || report.normalize.coerced_points > 0
            || matches!(report.tracker, TrackerOutcome::Failed { .. });

        let metadata = ResponseMetadata {
            encoding: report.load.encoding.clone(),
            delimiter: report.load.delimiter.to_string(),
            row_count: report.load.rows,
            columns: report.load.source_headers.clone(),
            staff_on_target: report.summaries.staff.iter().filter(|s| s.on_target).count(),
            staff_total: report.summaries.staff.len(),
            export_file_name,
        };

        UploadResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if degraded { "warning" } else { "ready" }.to_string(),
            report,
            metadata,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "report": null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::transform::run_bytes;

    const HEADER: &str = "Pupil Name,House,Form,Year,Reward,Category,Points,Date,Reward Description,Teacher,Dep,Subject";

    #[test]
    fn test_ready_response() {
        let body = format!("{}\nAnn Lee,B,7A,7,House Point,Effort,20,,,ab,,", HEADER);
        let report = run_bytes(body.as_bytes(), None, &PipelineConfig::default()).unwrap();

        let response = UploadResponse::from_report(report, "weekly_summary_W1.xlsx".into());

        assert_eq!(response.status, "ready");
        assert_eq!(response.metadata.staff_on_target, 1);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["report"]["summaries"]["staff"][0]["teacher"], "AB");
        assert_eq!(value["report"]["tracker"]["status"], "skipped");
    }

    #[test]
    fn test_warning_on_coerced_points() {
        let body = format!("{}\nAnn Lee,B,7A,7,House Point,Effort,lots,,,ab,,", HEADER);
        let report = run_bytes(body.as_bytes(), None, &PipelineConfig::default()).unwrap();

        let response = UploadResponse::from_report(report, String::new());
        assert_eq!(response.status, "warning");
    }

    #[test]
    fn test_error_response() {
        let value = error_response("boom");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
    }
}
