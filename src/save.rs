//! Saving an export: a save-as dialog first, a direct download otherwise.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{ExportError, Result};
use crate::export::{ArtifactKind, ExportArtifact};

/// Answer from a save-as dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogChoice {
    Path(PathBuf),
    Cancelled,
    /// No dialog can be shown here.
    Unavailable,
}

#[async_trait]
pub trait SaveDialog: Send + Sync {
    async fn choose(&self, suggested_name: &str, kind: ArtifactKind) -> DialogChoice;
}

/// Never shows a dialog; every save is a direct download.
pub struct NoDialog;

#[async_trait]
impl SaveDialog for NoDialog {
    async fn choose(&self, _suggested_name: &str, _kind: ArtifactKind) -> DialogChoice {
        DialogChoice::Unavailable
    }
}

/// A dialog that was answered up front, e.g. `--save-as PATH`.
pub struct FixedPath(pub PathBuf);

#[async_trait]
impl SaveDialog for FixedPath {
    async fn choose(&self, _suggested_name: &str, _kind: ArtifactKind) -> DialogChoice {
        DialogChoice::Path(self.0.clone())
    }
}

/// Asks on the terminal. An empty answer cancels.
pub struct TerminalPrompt;

#[async_trait]
impl SaveDialog for TerminalPrompt {
    async fn choose(&self, suggested_name: &str, kind: ArtifactKind) -> DialogChoice {
        let mut stderr = tokio::io::stderr();
        let prompt = format!(
            "Save {} as [{suggested_name}] (empty to cancel): ",
            kind.description()
        );
        if stderr.write_all(prompt.as_bytes()).await.is_err() || stderr.flush().await.is_err() {
            return DialogChoice::Unavailable;
        }
        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(0) | Err(_) => DialogChoice::Unavailable,
            Ok(_) => match line.trim() {
                "" => DialogChoice::Cancelled,
                "." => DialogChoice::Path(PathBuf::from(suggested_name)),
                answer => DialogChoice::Path(PathBuf::from(answer)),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveMethod {
    Dialog,
    Download,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub method: SaveMethod,
}

pub struct ArtifactSaver {
    dialog: Arc<dyn SaveDialog>,
    download_dir: PathBuf,
    release_delay: Duration,
}

impl ArtifactSaver {
    pub fn new(dialog: Arc<dyn SaveDialog>, download_dir: PathBuf, release_delay: Duration) -> Self {
        Self {
            dialog,
            download_dir,
            release_delay,
        }
    }

    /// Write the artifact, preferring the dialog. Dialog problems are never
    /// errors: they fall back to a download that never overwrites.
    pub async fn save(&self, artifact: ExportArtifact, filename: &str) -> Result<SavedArtifact> {
        self.save_with_progress(artifact, filename, || {}).await
    }

    /// Like [`save`](Self::save); `on_writing` runs once the destination is
    /// settled, right before any bytes are written.
    pub async fn save_with_progress(
        &self,
        artifact: ExportArtifact,
        filename: &str,
        on_writing: impl FnOnce() + Send,
    ) -> Result<SavedArtifact> {
        let choice = self.dialog.choose(filename, artifact.kind).await;
        on_writing();
        let saved = match choice {
            DialogChoice::Path(path) => match tokio::fs::write(&path, &artifact.bytes).await {
                Ok(()) => Some(SavedArtifact {
                    path,
                    method: SaveMethod::Dialog,
                }),
                Err(e) => {
                    warn!("Save-as to {} failed ({e}), downloading instead", path.display());
                    None
                }
            },
            DialogChoice::Cancelled => {
                debug!("Save-as cancelled, downloading instead");
                None
            }
            DialogChoice::Unavailable => None,
        };

        let saved = match saved {
            Some(s) => s,
            None => SavedArtifact {
                path: download(&self.download_dir, filename, &artifact.bytes).await?,
                method: SaveMethod::Download,
            },
        };
        info!("Saved {} bytes to {}", artifact.bytes.len(), saved.path.display());

        self.release_later(artifact);
        Ok(saved)
    }

    /// Keep the buffer alive a little longer so a reader that started from
    /// it can finish.
    fn release_later(&self, artifact: ExportArtifact) {
        let delay = self.release_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    debug!("Released {} byte export buffer", artifact.bytes.len());
                    drop(artifact);
                });
            }
            Err(_) => drop(artifact),
        }
    }
}

/// Create `dir/filename`, or `name (1).ext`, `name (2).ext`… if taken.
async fn download(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let (stem, ext) = split_extension(filename);
    for n in 0u32.. {
        let name = if n == 0 {
            filename.to_string()
        } else {
            format!("{stem} ({n}){ext}")
        };
        let path = dir.join(name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => {
                write_or_remove(file, &path, bytes).await?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(ExportError::Io(e)),
        }
    }
    Err(ExportError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "no free download name",
    )))
}

/// Write all of `bytes`; a partial file at `path` is removed on failure.
async fn write_or_remove<W>(mut file: W, path: &Path, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    drop(file);
    if let Err(e) = written {
        warn!("Download to {} failed ({e}), removing the partial file", path.display());
        if let Err(rm) = tokio::fs::remove_file(path).await {
            debug!("Could not remove {}: {rm}", path.display());
        }
        return Err(ExportError::Io(e));
    }
    Ok(())
}

/// `("resume", ".pdf")`; dotfiles keep their leading dot in the stem.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(i) if i > 0 => filename.split_at(i),
        _ => (filename, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(bytes: &[u8]) -> ExportArtifact {
        ExportArtifact {
            kind: ArtifactKind::Pdf,
            bytes: bytes.to_vec(),
            pages: Some(1),
        }
    }

    #[tokio::test]
    async fn downloads_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let saver = ArtifactSaver::new(Arc::new(NoDialog), dir.path().to_path_buf(), Duration::ZERO);
        let a = saver.save(pdf(b"one"), "resume.pdf").await.unwrap();
        let b = saver.save(pdf(b"two"), "resume.pdf").await.unwrap();
        let c = saver.save(pdf(b"three"), "resume.pdf").await.unwrap();
        assert_eq!(a.path, dir.path().join("resume.pdf"));
        assert_eq!(b.path, dir.path().join("resume (1).pdf"));
        assert_eq!(c.path, dir.path().join("resume (2).pdf"));
        assert_eq!(std::fs::read(&a.path).unwrap(), b"one");
        assert_eq!(a.method, SaveMethod::Download);
    }

    #[tokio::test]
    async fn dialog_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("chosen.pdf");
        let saver = ArtifactSaver::new(
            Arc::new(FixedPath(target.clone())),
            dir.path().join("downloads"),
            Duration::ZERO,
        );
        let saved = saver.save(pdf(b"x"), "resume.pdf").await.unwrap();
        assert_eq!(saved.method, SaveMethod::Dialog);
        assert_eq!(saved.path, target);
    }

    #[tokio::test]
    async fn failed_dialog_write_falls_back_to_download() {
        let dir = tempfile::tempdir().unwrap();
        let unwritable = dir.path().join("missing-dir").join("chosen.pdf");
        let downloads = dir.path().join("downloads");
        let saver = ArtifactSaver::new(Arc::new(FixedPath(unwritable)), downloads.clone(), Duration::ZERO);
        let saved = saver.save(pdf(b"x"), "resume.pdf").await.unwrap();
        assert_eq!(saved.method, SaveMethod::Download);
        assert_eq!(saved.path, downloads.join("resume.pdf"));
    }

    /// Accepts nothing.
    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::Error::new(ErrorKind::BrokenPipe, "disk gone")))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_download_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, b"").unwrap();
        let err = write_or_remove(BrokenPipe, &path, b"%PDF-1.7").await.unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn progress_hook_runs_after_the_dialog() {
        let dir = tempfile::tempdir().unwrap();
        let saver = ArtifactSaver::new(Arc::new(NoDialog), dir.path().to_path_buf(), Duration::ZERO);
        let called = std::sync::atomic::AtomicBool::new(false);
        saver
            .save_with_progress(pdf(b"x"), "resume.pdf", || {
                called.store(true, std::sync::atomic::Ordering::SeqCst)
            })
            .await
            .unwrap();
        assert!(called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn extension_split() {
        assert_eq!(split_extension("resume.pdf"), ("resume", ".pdf"));
        assert_eq!(split_extension("resume"), ("resume", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }
}
