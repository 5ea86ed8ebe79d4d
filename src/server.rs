//! Render service – turns posted HTML into a PDF with headless Chromium.
//!
//! `POST /api/generate-pdf` answers with the PDF, `POST /api/generate-pdf-simple`
//! echoes the HTML back for the browser's own print dialog, and
//! `GET /healthz` reports liveness.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{debug, error, info, warn};
use serde_json::json;
use thiserror::Error;
use tokio::process::Command;

use crate::config::ServerConfig;
use crate::error::{ExportError, Result};
use crate::export::{sanitize_filename, ArtifactKind};
use crate::remote::{is_transient_message, ErrorBody, RenderRequest};

/// Message for every non-transient render failure.
pub const GENERIC_FAILURE: &str = "PDF generation failed, please try again later";

const BROWSER_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
    "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
];

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Prints a complete HTML document to PDF.
///
/// Failures are [`ExportError::RemoteUnavailable`] when retrying may help
/// and [`ExportError::Remote`] otherwise.
#[async_trait]
pub trait HtmlRenderer: Send + Sync {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>>;
}

pub struct ChromeRenderer {
    browser: PathBuf,
    timeout: Duration,
    settle_ms: u64,
}

impl ChromeRenderer {
    pub fn new(browser: PathBuf, timeout: Duration, settle_ms: u64) -> Self {
        Self {
            browser,
            timeout,
            settle_ms,
        }
    }

    /// Use the configured browser, or the first candidate that runs.
    pub async fn discover(config: &ServerConfig) -> Result<Self> {
        let browser = match &config.chrome_path {
            Some(path) => path.clone(),
            None => find_browser_path().await.ok_or_else(|| {
                ExportError::Config("no Chrome or Chromium found; set RESUME_FORGE_CHROME".into())
            })?,
        };
        info!("Using browser {}", browser.display());
        Ok(Self::new(
            browser,
            Duration::from_secs(config.render_timeout_secs),
            config.settle_ms,
        ))
    }
}

async fn find_browser_path() -> Option<PathBuf> {
    for candidate in BROWSER_CANDIDATES {
        let probe = Command::new(candidate)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if matches!(probe, Ok(status) if status.success()) {
            return Some(PathBuf::from(candidate));
        }
    }
    None
}

#[async_trait]
impl HtmlRenderer for ChromeRenderer {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>> {
        let dir = tempfile::TempDir::new()?;
        let html_path = dir.path().join("resume.html");
        let pdf_path = dir.path().join("resume.pdf");
        tokio::fs::write(&html_path, html).await?;

        let mut cmd = Command::new(&self.browser);
        cmd.args([
            "--headless",
            "--no-sandbox",
            "--disable-gpu",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--run-all-compositor-stages-before-draw",
            "--no-pdf-header-footer",
        ])
        .arg(format!("--virtual-time-budget={}", self.settle_ms))
        .arg(format!("--print-to-pdf={}", pdf_path.to_string_lossy()))
        .arg(file_url(&html_path))
        .kill_on_drop(true);

        debug!("Running {}", self.browser.display());
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ExportError::RemoteUnavailable(format!("browser failed to start: {e}"))),
            Err(_) => {
                return Err(ExportError::RemoteUnavailable(format!(
                    "browser timed out after {:?}",
                    self.timeout
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            // No exit code means the browser was killed by a signal.
            if output.status.code().is_none() || is_transient_message(&stderr) {
                return Err(ExportError::RemoteUnavailable(format!("browser crashed: {stderr}")));
            }
            return Err(ExportError::Remote(format!("browser PDF generation failed: {stderr}")));
        }

        let pdf = tokio::fs::read(&pdf_path).await?;
        if pdf.is_empty() {
            return Err(ExportError::Remote("browser produced an empty PDF".into()));
        }
        Ok(pdf)
    }
}

fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    if raw.starts_with('/') {
        format!("file://{raw}")
    } else {
        format!("file:///{raw}")
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("html is required")]
    MissingHtml,

    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("renderer unavailable: {0}")]
    Unavailable(String),

    #[error("render failed: {0}")]
    Failed(String),
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::RemoteUnavailable(msg) => ApiError::Unavailable(msg),
            other => {
                let msg = other.to_string();
                if is_transient_message(&msg) {
                    ApiError::Unavailable(msg)
                } else {
                    ApiError::Failed(msg)
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingHtml => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Unavailable(msg) => {
                warn!("Renderer unavailable: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            ApiError::Failed(msg) => {
                error!("PDF generation error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<dyn HtmlRenderer>,
    /// When set, requests must carry `Authorization: Bearer <token>`.
    pub api_token: Option<Arc<str>>,
}

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/api/generate-pdf", post(generate_pdf))
        .route("/api/generate-pdf-simple", post(generate_pdf_simple))
        .route("/healthz", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let renderer = ChromeRenderer::discover(config).await?;
    let state = AppState {
        renderer: Arc::new(renderer),
        api_token: config.api_token.as_deref().map(Arc::from),
    };
    if state.api_token.is_none() {
        warn!("RESUME_FORGE_API_TOKEN is not set; the render service accepts any caller");
    }
    let router = build_router(state, config.body_limit_bytes);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Render service listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> std::result::Result<(), ApiError> {
    let Some(expected) = &state.api_token else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == expected.as_ref() => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

fn parse_request(body: &Bytes) -> std::result::Result<RenderRequest, ApiError> {
    let request: RenderRequest =
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if request.html.trim().is_empty() {
        return Err(ApiError::MissingHtml);
    }
    Ok(request)
}

async fn generate_pdf(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    authorize(&state, &headers)?;
    let request = parse_request(&body)?;
    let filename = sanitize_filename(
        request.filename.as_deref().unwrap_or("resume.pdf"),
        ArtifactKind::Pdf,
    );
    info!("Rendering {filename} ({} bytes of HTML)", request.html.len());

    let pdf = state.renderer.render_pdf(&request.html).await?;
    Ok((
        [
            (header::CONTENT_TYPE, ArtifactKind::Pdf.mime().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        pdf,
    )
        .into_response())
}

async fn generate_pdf_simple(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    authorize(&state, &headers)?;
    let request = parse_request(&body)?;
    let filename = sanitize_filename(
        request.filename.as_deref().unwrap_or("resume.pdf"),
        ArtifactKind::Html,
    );
    Ok((
        [
            (header::CONTENT_TYPE, ArtifactKind::Html.mime().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{filename}\""),
            ),
        ],
        request.html,
    )
        .into_response())
}
