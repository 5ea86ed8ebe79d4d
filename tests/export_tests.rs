//! End-to-end tests for `ExportOrchestrator`: resource failures, the
//! one-export-at-a-time rule, remote rendering and saving.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{http::StatusCode, routing::post, Json, Router};

use resume_forge::config::{ExportConfig, RemoteConfig};
use resume_forge::dom::Document;
use resume_forge::error::{ExportError, Result};
use resume_forge::export::{
    ArtifactKind, ExportArtifact, ExportBackend, ExportOptions, ExportOrchestrator, ExportState,
    InProcessBackend, PrintHtmlBackend, RemoteBackend, RenderJob,
};
use resume_forge::fonts::FontManager;
use resume_forge::geometry::PageGeometry;
use resume_forge::remote::{ErrorBody, RemoteRenderer};
use resume_forge::resources::{decode_data_uri, LoadError, ResourceLoader};
use resume_forge::save::{ArtifactSaver, DialogChoice, NoDialog, SaveDialog, SaveMethod};
use resume_forge::server::{build_router, AppState, HtmlRenderer};
use resume_forge::templates;

// =====================================================================
// Stubs
// =====================================================================

/// Serves `data:` URIs; every other reference is a 404.
struct OfflineLoader;

#[async_trait]
impl ResourceLoader for OfflineLoader {
    async fn fetch_bytes(&self, reference: &str) -> std::result::Result<Vec<u8>, LoadError> {
        if reference.starts_with("data:") {
            decode_data_uri(reference)
        } else {
            Err(LoadError::Status(404))
        }
    }
}

/// Takes a while, then returns a fixed artifact.
struct SlowBackend(Duration);

#[async_trait]
impl ExportBackend for SlowBackend {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn artifact_kind(&self) -> ArtifactKind {
        ArtifactKind::Pdf
    }

    async fn render(&self, _job: RenderJob<'_>) -> Result<ExportArtifact> {
        tokio::time::sleep(self.0).await;
        Ok(ExportArtifact {
            kind: ArtifactKind::Pdf,
            bytes: b"%PDF-1.7 slow".to_vec(),
            pages: Some(1),
        })
    }
}

struct CancelledDialog;

#[async_trait]
impl SaveDialog for CancelledDialog {
    async fn choose(&self, _suggested: &str, _kind: ArtifactKind) -> DialogChoice {
        DialogChoice::Cancelled
    }
}

/// Records the export state seen while the dialog is open.
#[derive(Default)]
struct StateRecordingDialog {
    states: std::sync::Mutex<Option<tokio::sync::watch::Receiver<ExportState>>>,
    seen: std::sync::Mutex<Vec<ExportState>>,
}

#[async_trait]
impl SaveDialog for StateRecordingDialog {
    async fn choose(&self, _suggested: &str, _kind: ArtifactKind) -> DialogChoice {
        if let Some(rx) = self.states.lock().unwrap().as_ref() {
            self.seen.lock().unwrap().push(rx.borrow().clone());
        }
        DialogChoice::Unavailable
    }
}

struct FixedPdf;

#[async_trait]
impl HtmlRenderer for FixedPdf {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>> {
        assert!(html.contains("@page"));
        Ok(b"%PDF-1.7 from the service".to_vec())
    }
}

fn saver(dir: &Path, dialog: Arc<dyn SaveDialog>) -> ArtifactSaver {
    ArtifactSaver::new(dialog, dir.to_path_buf(), Duration::ZERO)
}

fn in_process(config: &ExportConfig, dir: &Path) -> ExportOrchestrator {
    let loader: Arc<dyn ResourceLoader> = Arc::new(OfflineLoader);
    let backend = Arc::new(InProcessBackend::new(
        config.clone(),
        Arc::new(FontManager::default()),
        loader.clone(),
    ));
    ExportOrchestrator::new(config, loader, backend, saver(dir, Arc::new(NoDialog)))
}

async fn spawn_service(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/generate-pdf")
}

fn remote(url: String, dir: &Path) -> ExportOrchestrator {
    let config = ExportConfig::default();
    let renderer = RemoteRenderer::new(&RemoteConfig {
        url,
        ..RemoteConfig::default()
    })
    .unwrap();
    ExportOrchestrator::new(
        &config,
        Arc::new(OfflineLoader),
        Arc::new(RemoteBackend::new(renderer, config.geometry)),
        saver(dir, Arc::new(NoDialog)),
    )
}

// =====================================================================
// In-process
// =====================================================================

#[tokio::test]
async fn unreachable_stylesheet_does_not_fail_the_export() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = in_process(&ExportConfig::default(), dir.path());
    let mut doc = Document::parse(&templates::document_with_stylesheet(
        "https://cdn.example.com/missing.css",
    ));

    let outcome = orchestrator
        .export_resume(&mut doc, ExportOptions::default())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.filename, "resume.pdf");
    assert_eq!(outcome.method, SaveMethod::Download);
    assert!(outcome.pages.unwrap() >= 1);
    let bytes = std::fs::read(&outcome.saved_to).unwrap();
    assert_eq!(&bytes[..5], b"%PDF-");
    assert_eq!(
        orchestrator.state(),
        ExportState::Succeeded {
            filename: "resume.pdf".into()
        }
    );
}

#[tokio::test]
async fn missing_preview_reports_failure_state() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = in_process(&ExportConfig::default(), dir.path());
    let mut doc = Document::parse(templates::document_without_preview());

    let err = orchestrator
        .export_resume(&mut doc, ExportOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::RootNotFound(_)));
    assert_eq!(
        orchestrator.state(),
        ExportState::Failed {
            reason: err.user_message()
        }
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    orchestrator.reset();
    assert_eq!(orchestrator.state(), ExportState::Idle);
}

#[tokio::test]
async fn requested_filename_is_sanitized() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = in_process(&ExportConfig::default(), dir.path());
    let mut doc = Document::parse(&templates::resume_document());

    let outcome = orchestrator
        .export_resume(
            &mut doc,
            ExportOptions {
                filename: Some("../Ada Lovelace".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.filename, "Ada Lovelace.pdf");
    assert_eq!(outcome.saved_to, dir.path().join("Ada Lovelace.pdf"));
}

// =====================================================================
// Concurrency and state
// =====================================================================

#[tokio::test]
async fn second_export_while_busy_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig::default();
    let orchestrator = ExportOrchestrator::new(
        &config,
        Arc::new(OfflineLoader),
        Arc::new(SlowBackend(Duration::from_millis(200))),
        saver(dir.path(), Arc::new(NoDialog)),
    );
    let mut first_doc = Document::parse(&templates::resume_document());
    let mut second_doc = Document::parse(&templates::resume_document());

    let (first, second) = tokio::join!(
        orchestrator.export_resume(&mut first_doc, ExportOptions::default()),
        orchestrator.export_resume(&mut second_doc, ExportOptions::default()),
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(ExportError::Busy)));
    // Only the first export produced a file.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn subscribers_see_progress_and_the_final_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig::default();
    let orchestrator = ExportOrchestrator::new(
        &config,
        Arc::new(OfflineLoader),
        Arc::new(SlowBackend(Duration::from_millis(50))),
        saver(dir.path(), Arc::new(NoDialog)),
    );
    let mut states = orchestrator.subscribe();
    let mut doc = Document::parse(&templates::resume_document());

    let export = orchestrator.export_resume(&mut doc, ExportOptions::default());
    let watch = async {
        let mut saw_progress = false;
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            if state.is_exporting() {
                saw_progress = true;
            }
            if matches!(state, ExportState::Succeeded { .. }) {
                break;
            }
        }
        saw_progress
    };
    let (outcome, saw_progress) = tokio::join!(export, watch);

    assert!(outcome.is_ok());
    assert!(saw_progress);
}

// =====================================================================
// Saving
// =====================================================================

#[tokio::test]
async fn cancelled_dialog_falls_back_to_download() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig::default();
    let orchestrator = ExportOrchestrator::new(
        &config,
        Arc::new(OfflineLoader),
        Arc::new(SlowBackend(Duration::ZERO)),
        saver(dir.path(), Arc::new(CancelledDialog)),
    );
    let mut doc = Document::parse(&templates::resume_document());

    let outcome = orchestrator
        .export_resume(&mut doc, ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.method, SaveMethod::Download);
    assert_eq!(std::fs::read(outcome.saved_to).unwrap(), b"%PDF-1.7 slow");
}

#[tokio::test]
async fn rendered_progress_is_visible_while_choosing_a_destination() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig::default();
    let dialog = Arc::new(StateRecordingDialog::default());
    let orchestrator = ExportOrchestrator::new(
        &config,
        Arc::new(OfflineLoader),
        Arc::new(SlowBackend(Duration::ZERO)),
        saver(dir.path(), dialog.clone()),
    );
    *dialog.states.lock().unwrap() = Some(orchestrator.subscribe());
    let mut doc = Document::parse(&templates::resume_document());

    orchestrator
        .export_resume(&mut doc, ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(
        *dialog.seen.lock().unwrap(),
        vec![ExportState::Exporting { progress: 70 }]
    );
}

#[tokio::test]
async fn print_html_backend_saves_an_html_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig::default();
    let orchestrator = ExportOrchestrator::new(
        &config,
        Arc::new(OfflineLoader),
        Arc::new(PrintHtmlBackend::new(PageGeometry::A4)),
        saver(dir.path(), Arc::new(NoDialog)),
    );
    let mut doc = Document::parse(&templates::resume_document());

    let outcome = orchestrator
        .export_resume(&mut doc, ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.filename, "resume.html");
    let html = std::fs::read_to_string(outcome.saved_to).unwrap();
    assert!(html.contains("window.print()"));
    assert!(html.contains("resume-preview"));
}

// =====================================================================
// Remote
// =====================================================================

#[tokio::test]
async fn remote_protocol_error_is_reported_as_unavailable() {
    let router = Router::new().route(
        "/api/generate-pdf",
        post(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody {
                    error: "Protocol error (Page.printToPDF): Target closed".into(),
                }),
            )
        }),
    );
    let url = spawn_service(router).await;
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = remote(url, dir.path());
    let mut doc = Document::parse(&templates::resume_document());

    let err = orchestrator
        .export_resume(&mut doc, ExportOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::RemoteUnavailable(_)));
    let generic = ExportError::Remote("x".into()).user_message();
    match orchestrator.state() {
        ExportState::Failed { reason } => assert_ne!(reason, generic),
        other => panic!("unexpected state {other:?}"),
    }
}

#[tokio::test]
async fn remote_generic_failure_uses_generic_message() {
    let router = Router::new().route(
        "/api/generate-pdf",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "PDF generation failed, please try again later".into(),
                }),
            )
        }),
    );
    let url = spawn_service(router).await;
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = remote(url, dir.path());
    let mut doc = Document::parse(&templates::resume_document());

    let err = orchestrator
        .export_resume(&mut doc, ExportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Remote(_)));
}

#[tokio::test]
async fn remote_export_through_the_render_service() {
    let state = AppState {
        renderer: Arc::new(FixedPdf),
        api_token: None,
    };
    let url = spawn_service(build_router(state, 1024 * 1024)).await;
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = remote(url, dir.path());
    let mut doc = Document::parse(&templates::resume_document());

    let outcome = orchestrator
        .export_resume(&mut doc, ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.pages, None);
    assert_eq!(
        std::fs::read(outcome.saved_to).unwrap(),
        b"%PDF-1.7 from the service"
    );
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = remote(format!("http://{addr}/api/generate-pdf"), dir.path());
    let mut doc = Document::parse(&templates::resume_document());

    let err = orchestrator
        .export_resume(&mut doc, ExportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::RemoteUnavailable(_)));
}
