//! ExportOrchestrator – the public entry point for exporting a résumé.
//!
//! Owns the export state machine, runs one export at a time, picks the
//! backend that renders the artifact and hands the result to the saver.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use serde::Serialize;
use tokio::sync::watch;

use crate::compose::{compose_export_html, compose_print_html};
use crate::config::{BackendKind, ExportConfig};
use crate::dom::Document;
use crate::error::{ExportError, Result};
use crate::fonts::FontManager;
use crate::geometry::PageGeometry;
use crate::inline::{StyleInliner, StyleSnapshot};
use crate::normalize::LayoutNormalizer;
use crate::pipeline;
use crate::remote::RemoteRenderer;
use crate::resources::{DefaultLoader, ImageCache, ResourceLoader};
use crate::save::{ArtifactSaver, SaveDialog, SaveMethod};

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Pdf,
    Html,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Html => "html",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "application/pdf",
            ArtifactKind::Html => "text/html",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "PDF",
            ArtifactKind::Html => "print-ready HTML",
        }
    }
}

/// A rendered export on its way to being saved.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
    /// Known for in-process PDFs only.
    pub pages: Option<usize>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ExportState {
    Idle,
    Exporting { progress: u8 },
    Succeeded { filename: String },
    Failed { reason: String },
}

impl ExportState {
    pub fn is_exporting(&self) -> bool {
        matches!(self, ExportState::Exporting { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Suggested file name; the configured default when `None`.
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    pub success: bool,
    pub filename: String,
    pub saved_to: PathBuf,
    pub method: SaveMethod,
    pub pages: Option<usize>,
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// What a backend gets to work with.
pub struct RenderJob<'a> {
    pub document: &'a mut Document,
    pub root_id: &'a str,
    pub snapshot: &'a StyleSnapshot,
    pub filename: &'a str,
}

#[async_trait]
pub trait ExportBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn artifact_kind(&self) -> ArtifactKind;

    async fn render(&self, job: RenderJob<'_>) -> Result<ExportArtifact>;
}

/// Rasterize, slice and assemble in this process.
pub struct InProcessBackend {
    config: ExportConfig,
    fonts: Arc<FontManager>,
    loader: Arc<dyn ResourceLoader>,
}

impl InProcessBackend {
    pub fn new(config: ExportConfig, fonts: Arc<FontManager>, loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            config,
            fonts,
            loader,
        }
    }
}

#[async_trait]
impl ExportBackend for InProcessBackend {
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn artifact_kind(&self) -> ArtifactKind {
        ArtifactKind::Pdf
    }

    async fn render(&self, job: RenderJob<'_>) -> Result<ExportArtifact> {
        let images = match job.document.find_by_id(job.root_id) {
            Some(root) => ImageCache::prefetch(root, self.loader.as_ref()).await,
            None => return Err(ExportError::RootNotFound(job.root_id.to_string())),
        };
        let mut config = self.config.clone();
        config.root_id = job.root_id.to_string();
        let out = pipeline::render_pdf(job.document, job.snapshot, &images, &self.fonts, &config)?;
        Ok(ExportArtifact {
            kind: ArtifactKind::Pdf,
            pages: Some(out.pdf.pages),
            bytes: out.pdf.bytes,
        })
    }
}

/// Send composed HTML to the render service.
pub struct RemoteBackend {
    renderer: RemoteRenderer,
    geometry: PageGeometry,
}

impl RemoteBackend {
    pub fn new(renderer: RemoteRenderer, geometry: PageGeometry) -> Self {
        Self { renderer, geometry }
    }
}

#[async_trait]
impl ExportBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn artifact_kind(&self) -> ArtifactKind {
        ArtifactKind::Pdf
    }

    async fn render(&self, job: RenderJob<'_>) -> Result<ExportArtifact> {
        let normalizer = LayoutNormalizer::new(self.geometry, job.root_id);
        let html = compose_export_html(job.document, job.root_id, job.snapshot, &normalizer)?;
        let bytes = self.renderer.render(&html, job.filename).await?;
        Ok(ExportArtifact {
            kind: ArtifactKind::Pdf,
            bytes,
            pages: None,
        })
    }
}

/// A print-ready HTML document for the browser's print dialog.
pub struct PrintHtmlBackend {
    geometry: PageGeometry,
}

impl PrintHtmlBackend {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }
}

#[async_trait]
impl ExportBackend for PrintHtmlBackend {
    fn name(&self) -> &'static str {
        "print-html"
    }

    fn artifact_kind(&self) -> ArtifactKind {
        ArtifactKind::Html
    }

    async fn render(&self, job: RenderJob<'_>) -> Result<ExportArtifact> {
        let normalizer = LayoutNormalizer::new(self.geometry, job.root_id);
        let html = compose_print_html(job.document, job.root_id, job.filename, job.snapshot, &normalizer)?;
        Ok(ExportArtifact {
            kind: ArtifactKind::Html,
            bytes: html.into_bytes(),
            pages: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct ExportOrchestrator {
    root_id: String,
    default_filename: String,
    inliner: StyleInliner,
    backend: Arc<dyn ExportBackend>,
    saver: ArtifactSaver,
    state: watch::Sender<ExportState>,
}

impl ExportOrchestrator {
    pub fn new(
        config: &ExportConfig,
        loader: Arc<dyn ResourceLoader>,
        backend: Arc<dyn ExportBackend>,
        saver: ArtifactSaver,
    ) -> Self {
        let (state, _) = watch::channel(ExportState::Idle);
        Self {
            root_id: config.root_id.clone(),
            default_filename: config.default_filename.clone(),
            inliner: StyleInliner::new(loader),
            backend,
            saver,
            state,
        }
    }

    /// Wire up the configured backend, the default resource loader and a
    /// saver around `dialog`.
    pub fn from_config(config: &ExportConfig, dialog: Arc<dyn SaveDialog>) -> Result<Self> {
        let loader: Arc<dyn ResourceLoader> = Arc::new(DefaultLoader::new(&config.resources)?);
        let backend: Arc<dyn ExportBackend> = match config.backend {
            BackendKind::InProcess => Arc::new(InProcessBackend::new(
                config.clone(),
                Arc::new(FontManager::from_config(&config.fonts)),
                loader.clone(),
            )),
            BackendKind::Remote => Arc::new(RemoteBackend::new(
                RemoteRenderer::new(&config.remote)?,
                config.geometry,
            )),
            BackendKind::PrintHtml => Arc::new(PrintHtmlBackend::new(config.geometry)),
        };
        let download_dir = match &config.save.download_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let saver = ArtifactSaver::new(
            dialog,
            download_dir,
            Duration::from_millis(config.save.release_delay_ms),
        );
        Ok(Self::new(config, loader, backend, saver))
    }

    pub fn subscribe(&self) -> watch::Receiver<ExportState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ExportState {
        self.state.borrow().clone()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Back to `Idle` unless an export is running.
    pub fn reset(&self) {
        self.state.send_if_modified(|s| {
            if s.is_exporting() || *s == ExportState::Idle {
                false
            } else {
                *s = ExportState::Idle;
                true
            }
        });
    }

    /// Export the résumé in `document` and save it.
    ///
    /// Fails with [`ExportError::Busy`] while another export on this
    /// orchestrator is running; that call leaves the state untouched.
    pub async fn export_resume(
        &self,
        document: &mut Document,
        options: ExportOptions,
    ) -> Result<ExportOutcome> {
        let acquired = self.state.send_if_modified(|s| {
            if s.is_exporting() {
                false
            } else {
                *s = ExportState::Exporting { progress: 0 };
                true
            }
        });
        if !acquired {
            return Err(ExportError::Busy);
        }

        let requested = options
            .filename
            .unwrap_or_else(|| self.default_filename.clone());
        let filename = sanitize_filename(&requested, self.backend.artifact_kind());
        info!("Exporting #{} as {filename} via {}", self.root_id, self.backend.name());

        match self.run(document, &filename).await {
            Ok(outcome) => {
                self.progress(100);
                info!("Export finished: {}", outcome.saved_to.display());
                self.state.send_replace(ExportState::Succeeded {
                    filename: outcome.filename.clone(),
                });
                Ok(outcome)
            }
            Err(e) => {
                error!("Export failed: {e}");
                self.state.send_replace(ExportState::Failed {
                    reason: e.user_message(),
                });
                Err(e)
            }
        }
    }

    async fn run(&self, document: &mut Document, filename: &str) -> Result<ExportOutcome> {
        if document.find_by_id(&self.root_id).is_none() {
            return Err(ExportError::RootNotFound(self.root_id.clone()));
        }
        self.progress(10);

        let snapshot = self.inliner.snapshot(document).await;
        self.progress(30);

        let artifact = self
            .backend
            .render(RenderJob {
                document,
                root_id: &self.root_id,
                snapshot: &snapshot,
                filename,
            })
            .await?;
        self.progress(70);

        let pages = artifact.pages;
        let saved = self
            .saver
            .save_with_progress(artifact, filename, || self.progress(90))
            .await?;
        let filename = saved
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());

        Ok(ExportOutcome {
            success: true,
            filename,
            saved_to: saved.path,
            method: saved.method,
            pages,
        })
    }

    fn progress(&self, progress: u8) {
        self.state.send_replace(ExportState::Exporting { progress });
    }
}

/// Strip directories and characters that are unsafe in file names, and
/// give the name the artifact's extension.
pub fn sanitize_filename(raw: &str, kind: ArtifactKind) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let mut stem = cleaned.trim().trim_matches('.').trim().to_string();
    for ext in [".pdf", ".html", ".htm"] {
        if stem.len() > ext.len() && stem.to_ascii_lowercase().ends_with(ext) {
            stem.truncate(stem.len() - ext.len());
            break;
        }
    }
    let stem = stem.trim();
    let stem = if stem.is_empty() { "resume" } else { stem };
    format!("{stem}.{}", kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("resume.pdf", ArtifactKind::Pdf), "resume.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd", ArtifactKind::Pdf), "passwd.pdf");
        assert_eq!(sanitize_filename("C:\\Users\\ada\\cv.PDF", ArtifactKind::Pdf), "cv.pdf");
        assert_eq!(sanitize_filename("resume.pdf", ArtifactKind::Html), "resume.html");
        assert_eq!(sanitize_filename("  ", ArtifactKind::Pdf), "resume.pdf");
        assert_eq!(sanitize_filename("a:b*c?.pdf", ArtifactKind::Pdf), "abc.pdf");
        assert_eq!(sanitize_filename("Ada Lovelace", ArtifactKind::Pdf), "Ada Lovelace.pdf");
    }

    #[test]
    fn state_serializes_with_tag() {
        let json = serde_json::to_string(&ExportState::Exporting { progress: 30 }).unwrap();
        assert_eq!(json, r#"{"state":"exporting","progress":30}"#);
    }
}
