//! Client for the remote render service (`POST /api/generate-pdf`).

use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::error::{ExportError, Result};

/// Renderer messages that mean "try again", not "this document is broken".
pub const TRANSIENT_MARKERS: &[&str] = &["Protocol error", "Target closed", "Session closed"];

/// Request body shared by the client and the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// `{ "error": "..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Whether a renderer failure message names a transient condition.
pub fn is_transient_message(message: &str) -> bool {
    TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
}

/// Map a failed render call onto the error taxonomy.
pub fn classify_failure(status: Option<u16>, message: &str) -> ExportError {
    let detail = match status {
        Some(code) => format!("HTTP {code}: {message}"),
        None => message.to_string(),
    };
    if status == Some(503) || is_transient_message(message) {
        ExportError::RemoteUnavailable(detail)
    } else {
        ExportError::Remote(detail)
    }
}

#[derive(Clone)]
pub struct RemoteRenderer {
    client: Client,
    url: String,
    token: Option<String>,
}

impl RemoteRenderer {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExportError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send composed HTML and return the PDF bytes.
    pub async fn render(&self, html: &str, filename: &str) -> Result<Vec<u8>> {
        let body = RenderRequest {
            html: html.to_string(),
            filename: Some(filename.to_string()),
        };
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        debug!("POST {} ({} bytes of HTML)", self.url, html.len());
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_connect() || e.is_timeout() => {
                warn!("Render service unreachable: {e}");
                return Err(ExportError::RemoteUnavailable(e.to_string()));
            }
            Err(e) => return Err(ExportError::Remote(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            warn!("Render service returned {status}: {message}");
            return Err(classify_failure(Some(status.as_u16()), &message));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_failure(None, &e.to_string()))?;
        debug!("Render service returned {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_unavailable_is_transient() {
        let err = classify_failure(Some(503), "busy");
        assert!(matches!(err, ExportError::RemoteUnavailable(_)));
    }

    #[test]
    fn renderer_crash_messages_are_transient() {
        for msg in ["Protocol error (Page.printToPDF): Target closed", "Session closed. Most likely"] {
            assert!(matches!(
                classify_failure(Some(500), msg),
                ExportError::RemoteUnavailable(_)
            ));
        }
    }

    #[test]
    fn other_failures_are_generic() {
        let err = classify_failure(Some(500), "PDF generation failed, please try again later");
        assert!(matches!(err, ExportError::Remote(_)));
        assert!(matches!(classify_failure(Some(400), "html is required"), ExportError::Remote(_)));
    }

    #[test]
    fn request_omits_missing_filename() {
        let json = serde_json::to_string(&RenderRequest {
            html: "<p>x</p>".into(),
            filename: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"html":"<p>x</p>"}"#);
        let parsed: RenderRequest = serde_json::from_str("{}").unwrap();
        assert!(parsed.html.is_empty());
    }
}
