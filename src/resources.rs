//! Resource loading – stylesheets and images referenced by the résumé page.
//!
//! Every fetch here is soft: callers log failures and carry on without the
//! resource. Nothing in this module can fail an export on its own.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use image::RgbaImage;
use log::{debug, warn};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::{DomNode, ElementNode, Tag};
use crate::error::{ExportError, Result};

/// Why a single resource could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed data URI: {0}")]
    DataUri(String),

    #[error("cannot resolve '{0}' without a base URL or base directory")]
    Unresolvable(String),
}

/// Where relative references are resolved against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Base URL of the live page, e.g. `https://resume.example.com/`.
    pub base_url: Option<String>,
    /// Local directory holding the page's assets.
    pub base_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            base_dir: None,
            timeout_secs: 15,
        }
    }
}

/// Fetches the bytes behind a stylesheet `href` or image `src`.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    async fn fetch_bytes(&self, reference: &str) -> std::result::Result<Vec<u8>, LoadError>;

    async fn fetch_text(&self, reference: &str) -> std::result::Result<String, LoadError> {
        let bytes = self.fetch_bytes(reference).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Loader for `http(s)://`, `data:`, `file://` and relative references.
pub struct DefaultLoader {
    client: Client,
    base_url: Option<Url>,
    base_dir: Option<PathBuf>,
}

impl DefaultLoader {
    pub fn new(config: &ResourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExportError::Config(format!("HTTP client: {e}")))?;
        let base_url = match &config.base_url {
            Some(raw) => Some(
                Url::parse(raw)
                    .map_err(|e| ExportError::Config(format!("invalid base_url '{raw}': {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            client,
            base_url,
            base_dir: config.base_dir.clone(),
        })
    }

    async fn fetch_url(&self, url: Url) -> std::result::Result<Vec<u8>, LoadError> {
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| LoadError::Unresolvable(url.to_string()))?;
            return Ok(tokio::fs::read(path).await?);
        }
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ResourceLoader for DefaultLoader {
    async fn fetch_bytes(&self, reference: &str) -> std::result::Result<Vec<u8>, LoadError> {
        let reference = reference.trim();
        if reference.starts_with("data:") {
            return decode_data_uri(reference);
        }
        if let Ok(url) = Url::parse(reference) {
            return self.fetch_url(url).await;
        }
        if let Some(rest) = reference.strip_prefix("//") {
            if let Ok(url) = Url::parse(&format!("https://{rest}")) {
                return self.fetch_url(url).await;
            }
        }
        if let Some(base) = &self.base_url {
            if let Ok(url) = base.join(reference) {
                return self.fetch_url(url).await;
            }
        }
        if let Some(dir) = &self.base_dir {
            let relative = reference
                .split(['?', '#'])
                .next()
                .unwrap_or(reference)
                .trim_start_matches('/');
            return Ok(tokio::fs::read(dir.join(relative)).await?);
        }
        Err(LoadError::Unresolvable(reference.to_string()))
    }
}

/// Decode `data:[<mime>][;base64],<payload>`.
pub fn decode_data_uri(uri: &str) -> std::result::Result<Vec<u8>, LoadError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| LoadError::DataUri("missing data: prefix".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| LoadError::DataUri("missing ','".into()))?;
    if meta.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        BASE64_STD
            .decode(compact)
            .map_err(|e| LoadError::DataUri(e.to_string()))
    } else {
        percent_decode(payload)
    }
}

fn percent_decode(s: &str) -> std::result::Result<Vec<u8>, LoadError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s
                .get(i + 1..i + 3)
                .ok_or_else(|| LoadError::DataUri("truncated escape".into()))?;
            let v = u8::from_str_radix(hex, 16)
                .map_err(|_| LoadError::DataUri(format!("bad escape %{hex}")))?;
            out.push(v);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Image cache
// ---------------------------------------------------------------------------

/// Decoded images keyed by their `src` attribute, filled before rasterizing.
#[derive(Default)]
pub struct ImageCache {
    images: HashMap<String, RgbaImage>,
}

impl ImageCache {
    /// Fetch and decode every `<img src>` under `root`. Sources that fail to
    /// load or decode are left out and logged.
    pub async fn prefetch(root: &ElementNode, loader: &dyn ResourceLoader) -> Self {
        let mut sources = Vec::new();
        collect_image_sources(root, &mut sources);

        let mut cache = Self::default();
        for src in sources {
            if cache.images.contains_key(&src) {
                continue;
            }
            match loader.fetch_bytes(&src).await {
                Ok(bytes) => {
                    cache.insert_bytes(&src, &bytes);
                }
                Err(e) => warn!("Skipping image {}: {e}", short(&src)),
            }
        }
        cache
    }

    /// Decode and store an image. Returns `false` for undecodable bytes.
    pub fn insert_bytes(&mut self, src: &str, bytes: &[u8]) -> bool {
        match image::load_from_memory(bytes) {
            Ok(img) => {
                self.images.insert(src.to_string(), img.to_rgba8());
                true
            }
            Err(e) => {
                warn!("Skipping undecodable image {}: {e}", short(src));
                false
            }
        }
    }

    pub fn get(&self, src: &str) -> Option<&RgbaImage> {
        self.images.get(src)
    }

    pub fn dimensions(&self, src: &str) -> Option<(u32, u32)> {
        self.images.get(src).map(|img| img.dimensions())
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn collect_image_sources(element: &ElementNode, out: &mut Vec<String>) {
    if element.tag == Tag::Img {
        if let Some(src) = element.src() {
            if !src.is_empty() {
                out.push(src.to_string());
            }
        }
    }
    for child in &element.children {
        if let DomNode::Element(e) = child {
            collect_image_sources(e, out);
        }
    }
}

/// Data URIs make unreadable log lines.
fn short(src: &str) -> String {
    if src.len() > 64 {
        let cut = src
            .char_indices()
            .nth(64)
            .map(|(i, _)| i)
            .unwrap_or(src.len());
        format!("{}…", &src[..cut])
    } else {
        src.to_string()
    }
}
