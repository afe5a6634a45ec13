//! HTTP server for the weekly points API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | POST   | `/api/upload`     | Upload a rewards file, get the run report |
//! | POST   | `/api/export`     | Same form, returns the `.xlsx` workbook  |
//! | GET    | `/api/logs`       | SSE stream for real-time logs            |
//!
//! Both POST endpoints take a multipart form: `file` (required), `roster`
//! (staff CSV), `week` and `target`.

use std::sync::Arc;
use std::{convert::Infallible, net::SocketAddr, time::Duration};

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{error_response, UploadResponse};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, ServerError};
use crate::export::workbook_bytes;
use crate::roster::Roster;
use crate::transform::{run_bytes, RunReport};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Base configuration; form fields override per request.
    config: Arc<PipelineConfig>,
    /// Held for a whole run so this process never interleaves tracker writes.
    tracker_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config: Arc::new(config),
            tracker_lock: Arc::new(Mutex::new(())),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Load(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(PipelineError::Roster(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        eprintln!("❌ {}", self);
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the router. Split from [`start_server`] so it can be served by tests.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/export", post(export))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = config
        .tracker_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "disabled".to_string());
    let app = router(AppState::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 House points server running on http://localhost:{}", port);
    println!("   POST /api/upload - Upload rewards file, JSON report");
    println!("   POST /api/export - Upload rewards file, xlsx workbook");
    println!("   GET  /api/logs   - SSE log stream");
    println!("   GET  /health     - Health check");
    println!();
    println!("📒 Cumulative tracker: {}", tracker);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "housepoints",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "export": "POST /api/export",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Multipart fields shared by upload and export.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<Vec<u8>>,
    pub file_name: Option<String>,
    pub roster: Option<Vec<u8>>,
    pub week: Option<String>,
    pub target: Option<i64>,
}

impl UploadForm {
    /// Base configuration with the form's overrides applied.
    pub fn config(&self, base: &PipelineConfig) -> PipelineConfig {
        let mut config = base.clone();
        if let Some(week) = self.week.as_ref().filter(|w| !w.trim().is_empty()) {
            config.week_label = week.trim().to_string();
        }
        if let Some(target) = self.target {
            config.weekly_target = target;
        }
        config
    }
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ServerError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;

        match name.as_str() {
            "file" => {
                form.file_name = file_name;
                form.file = Some(data.to_vec());
            }
            "roster" if !data.is_empty() => form.roster = Some(data.to_vec()),
            "week" => form.week = Some(String::from_utf8_lossy(&data).to_string()),
            "target" => {
                let text = String::from_utf8_lossy(&data);
                let target = text
                    .trim()
                    .parse()
                    .map_err(|_| ServerError::BadRequest(format!("Invalid target: {}", text)))?;
                form.target = Some(target);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Run the pipeline for a form on the blocking pool.
async fn process(state: &AppState, form: UploadForm) -> Result<(RunReport, PipelineConfig), ServerError> {
    let config = form.config(&state.config);
    let bytes = form
        .file
        .ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW UPLOAD: {} ({} bytes, week {})",
        form.file_name.as_deref().unwrap_or("unknown"),
        bytes.len(),
        config.week_label
    );
    println!("{}\n", "=".repeat(70));

    let _guard = state.tracker_lock.lock().await;

    let roster_bytes = form.roster;
    let run_config = config.clone();
    let report = tokio::task::spawn_blocking(move || -> Result<RunReport, PipelineError> {
        let roster = match roster_bytes {
            Some(b) => {
                let roster = Roster::from_csv_bytes(&b)?;
                log_info(format!("Staff roster: {} entries", roster.len()));
                Some(roster)
            }
            None => None,
        };
        run_bytes(&bytes, roster.as_ref(), &run_config)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok((report, config))
}

/// Upload endpoint: JSON run report.
async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let form = read_form(multipart).await?;
    let (report, config) = process(&state, form).await?;
    Ok(Json(UploadResponse::from_report(report, config.export_file_name())))
}

/// Export endpoint: the multi-sheet workbook as a download.
async fn export(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ServerError> {
    let form = read_form(multipart).await?;
    let (report, config) = process(&state, form).await?;

    let bytes = workbook_bytes(&report.tables()).map_err(PipelineError::from)?;
    let disposition = format!("attachment; filename=\"{}\"", config.export_file_name());

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_overrides_config() {
        let base = PipelineConfig::default();
        let form = UploadForm {
            week: Some(" W7 ".into()),
            target: Some(20),
            ..UploadForm::default()
        };

        let config = form.config(&base);
        assert_eq!(config.week_label, "W7");
        assert_eq!(config.weekly_target, 20);
        assert_eq!(config.export_file_name(), "weekly_summary_W7.xlsx");
    }

    #[test]
    fn test_blank_week_keeps_default() {
        let base = PipelineConfig {
            week_label: "2024-09-09".into(),
            ..PipelineConfig::default()
        };
        let form = UploadForm {
            week: Some("  ".into()),
            ..UploadForm::default()
        };
        assert_eq!(form.config(&base).week_label, "2024-09-09");
    }

    #[tokio::test]
    async fn test_process_without_file_is_bad_request() {
        let state = AppState::new(PipelineConfig::default());
        let err = process(&state, UploadForm::default()).await.unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_process_runs_pipeline() {
        let state = AppState::new(PipelineConfig::default());
        let form = UploadForm {
            file: Some(
                b"Pupil Name,House,Form,Year,Reward,Category,Points,Date,Reward Description,Teacher,Dep,Subject\nAnn,B,7A,7,House Point,Effort,3,,,ab,,\n"
                    .to_vec(),
            ),
            roster: Some(b"First Name,Surname,Initials,Dep\nAlice,Bell,AB,Maths\n".to_vec()),
            ..UploadForm::default()
        };

        let (report, _) = process(&state, form).await.unwrap();
        assert_eq!(report.summaries.staff[0].full_name, "Alice Bell");
        assert_eq!(report.summaries.staff[0].house_points, 3);
    }

    #[test]
    fn test_status_codes() {
        let response = ServerError::BadRequest("x".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ServerError::Internal("x".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
