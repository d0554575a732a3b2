//! Serve command implementation
//!
//! Runs the prediction form as a small web app:
//! - `GET  /`               input form and CSV upload
//! - `POST /predict`        one form submission, rendered as a result page
//! - `POST /predict/batch`  multipart CSV upload, rendered as a table
//! - `GET  /insights/:n`    image of the n-th model insight
//! - `GET  /health`         health check
//! - `GET  /api/app`        app definition with resolved widgets (JSON)
//! - `POST /api/predict`    JSON record in, JSON prediction out
//!
//! Encoding and input errors answer 422, model failures 500; the server
//! keeps running either way.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use colored::Colorize;
use formcast::app::{AppDefinition, ComparisonOutcome, SectionView};
use formcast::invoke::PredictionResult;
use formcast::record::{RawInputRecord, Value};
use serde::{Deserialize, Serialize};

use super::{batch, parse_alpha, Session, Settings};
use crate::error::{CliError, Result};
use crate::render;

/// Largest accepted request body (CSV uploads).
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the bind address
    pub(crate) fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// State shared by all handlers; read-only after startup.
#[derive(Clone)]
pub(crate) struct AppState {
    session: Arc<Session>,
}

impl AppState {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
        }
    }
}

/// JSON body of `POST /api/predict`.
#[derive(Debug, Deserialize)]
pub(crate) struct PredictRequest {
    /// Feature values by field name
    pub record: HashMap<String, Value>,
    /// Miscoverage level for interval apps
    #[serde(default)]
    pub alpha: Option<f64>,
}

/// JSON answer of `POST /api/predict`.
#[derive(Debug, Serialize)]
pub(crate) struct PredictResponse {
    pub result: PredictionResult,
    pub comparisons: Vec<ComparisonOutcome>,
}

/// JSON answer of `GET /api/app`.
#[derive(Debug, Serialize)]
pub(crate) struct AppInfo {
    pub definition: AppDefinition,
    pub sections: Vec<SectionView>,
    pub result_columns: Vec<String>,
    pub reference_rows: usize,
}

fn status_for(error: &CliError) -> StatusCode {
    match error {
        CliError::ValidationFailed(_) | CliError::EncodingFailed(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CliError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_title(error: &CliError) -> &'static str {
    match error {
        CliError::ValidationFailed(_) => "Please check your inputs",
        CliError::EncodingFailed(_) => "Your inputs could not be encoded",
        CliError::InvalidFormat(_) => "The upload could not be read",
        _ => "Prediction failed",
    }
}

fn html_error(app: &AppDefinition, error: &CliError) -> Response {
    log::warn!("request failed: {error}");
    (
        status_for(error),
        Html(render::error_page(app, error_title(error), &error.to_string())),
    )
        .into_response()
}

fn json_error(error: &CliError) -> Response {
    log::warn!("api request failed: {error}");
    (
        status_for(error),
        Json(serde_json::json!({"error": error.to_string()})),
    )
        .into_response()
}

pub(crate) async fn index(State(state): State<AppState>) -> Html<String> {
    let session = &state.session;
    let sections = session.app.sections_view(&session.frame);
    Html(render::form_page(
        &session.app,
        &sections,
        &session.frame.head(5),
    ))
}

pub(crate) async fn predict_form(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let session = &state.session;
    match session.submit(&form) {
        Ok(outcome) => Html(render::result_page(&session.app, &outcome)).into_response(),
        Err(e) => html_error(&session.app, &e),
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<(Vec<u8>, Option<f64>)> {
    let mut file = None;
    let mut alpha = None;
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| CliError::InvalidFormat(format!("malformed upload: {e}")))?;
        let Some(field) = field else {
            break;
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| CliError::InvalidFormat(format!("malformed upload: {e}")))?;
                file = Some(bytes.to_vec());
            }
            Some("alpha") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| CliError::InvalidFormat(format!("malformed upload: {e}")))?;
                alpha = parse_alpha(Some(text.as_str()))?;
            }
            _ => {}
        }
    }
    let file = file.ok_or_else(|| {
        CliError::ValidationFailed("no CSV file was uploaded".to_string())
    })?;
    Ok((file, alpha))
}

pub(crate) async fn predict_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let session = &state.session;
    let outcome = match read_upload(&mut multipart).await {
        Ok((bytes, alpha)) => batch::predict_upload(session, bytes.as_slice(), alpha),
        Err(e) => Err(e),
    };
    match outcome {
        Ok((upload, results)) => {
            log::info!("predicted {} uploaded rows", results.len());
            Html(render::batch_page(&session.app, &upload, &results)).into_response()
        }
        Err(e) => html_error(&session.app, &e),
    }
}

fn image_content_type(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

pub(crate) async fn insight_image(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Response {
    let Some(insight) = state.session.app.insights.get(index) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(&insight.image).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, image_content_type(&insight.image))],
            bytes,
        )
            .into_response(),
        Err(e) => {
            log::warn!("insight image {} unavailable: {e}", insight.image.display());
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "app": state.session.app.id,
        "model": state.session.model.name,
    }))
}

pub(crate) async fn api_app(State(state): State<AppState>) -> Json<AppInfo> {
    let session = &state.session;
    Json(AppInfo {
        definition: session.app.clone(),
        sections: session.app.sections_view(&session.frame),
        result_columns: session.app.result_columns(),
        reference_rows: session.frame.n_rows(),
    })
}

fn api_predict_inner(session: &Session, request: PredictRequest) -> Result<PredictResponse> {
    let record = request
        .record
        .into_iter()
        .collect::<RawInputRecord>()
        .validate(&session.app.schema)?;
    let (_, result) = session.predict(&record, request.alpha)?;
    Ok(PredictResponse {
        result,
        comparisons: session.app.compare(&session.frame, &record),
    })
}

pub(crate) async fn api_predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Response {
    match api_predict_inner(&state.session, request) {
        Ok(response) => Json(response).into_response(),
        Err(e) => json_error(&e),
    }
}

/// All routes, bound to `state`.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/predict/batch", post(predict_upload))
        .route("/insights/:index", get(insight_image))
        .route("/health", get(health))
        .route("/api/app", get(api_app))
        .route("/api/predict", post(api_predict))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Serve command entry point (blocking)
pub(crate) fn run(settings: &Settings, config: &ServerConfig) -> Result<()> {
    println!("{}", "=== formcast serve ===".cyan().bold());
    println!();

    let session = Session::load(settings)?;
    println!("App: {}", session.app.title);
    println!("Model: {}", session.model.describe());
    println!("Reference rows: {}", session.frame.n_rows());
    println!("Binding: {}", config.bind_addr());

    let state = AppState::new(session);
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Server(format!("Failed to create runtime: {e}")))?;
    let bind_addr = config.bind_addr();

    runtime.block_on(async move {
        let app = router(state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind {bind_addr}: {e}")))?;

        println!();
        println!(
            "{}",
            format!("Server listening on http://{bind_addr}")
                .green()
                .bold()
        );
        println!();
        println!("{}", "Endpoints:".cyan());
        println!("  GET  /               - Prediction form");
        println!("  POST /predict        - Single prediction");
        println!("  POST /predict/batch  - CSV upload");
        println!("  GET  /health         - Health check");
        println!("  GET  /api/app        - App definition (JSON)");
        println!("  POST /api/predict    - Single prediction (JSON)");
        println!();
        println!("{}", "Press Ctrl+C to stop".dimmed());

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| CliError::Server(format!("Server error: {e}")))?;

        println!();
        println!("{}", "Server stopped".yellow());
        Ok(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
}
