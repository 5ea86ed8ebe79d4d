//! Error types for the export pipeline.

use std::io;
use thiserror::Error;

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors that can end an export attempt.
///
/// Partial-resource failures (an unreachable stylesheet, an undecodable
/// image) never show up here: they are logged and the export continues.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The export root element is not present in the document.
    #[error("preview element not found (#{0})")]
    RootNotFound(String),

    /// Another export is still running on this orchestrator.
    #[error("an export is already in progress")]
    Busy,

    /// Capturing the document as a bitmap failed.
    #[error("rasterization failed: {0}")]
    Rasterize(String),

    /// Building the PDF from page images failed.
    #[error("document assembly failed: {0}")]
    Assemble(String),

    /// The remote renderer hit a transient failure (crash, protocol error).
    #[error("remote renderer unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote renderer rejected the request or failed permanently.
    #[error("remote renderer failed: {0}")]
    Remote(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while reading input or writing the artifact.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExportError {
    /// The single message surfaced to the user when an export fails.
    pub fn user_message(&self) -> String {
        match self {
            ExportError::RootNotFound(_) => {
                "Resume preview element not found; make sure the preview panel is open".to_string()
            }
            ExportError::Busy => "An export is already running, please wait".to_string(),
            ExportError::RemoteUnavailable(_) => {
                "The PDF service is temporarily unavailable; please retry or use the in-process export"
                    .to_string()
            }
            ExportError::Config(msg) => format!("Export is misconfigured: {msg}"),
            ExportError::Rasterize(_)
            | ExportError::Assemble(_)
            | ExportError::Remote(_)
            | ExportError::Io(_) => "PDF generation failed, please try again later".to_string(),
        }
    }

    /// Whether retrying the same export may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExportError::Busy | ExportError::RemoteUnavailable(_) | ExportError::Rasterize(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_and_generic_remote_messages_differ() {
        let transient = ExportError::RemoteUnavailable("Protocol error".into());
        let generic = ExportError::Remote("boom".into());
        assert_ne!(transient.user_message(), generic.user_message());
        assert!(transient.is_retryable());
        assert!(!generic.is_retryable());
    }

    #[test]
    fn root_not_found_names_the_preview() {
        let err = ExportError::RootNotFound("resume-preview".into());
        assert!(err.to_string().contains("preview element not found"));
        assert!(!err.is_retryable());
    }
}
