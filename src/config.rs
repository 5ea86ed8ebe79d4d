//! Export configuration: a TOML file with defaults for every field, plus
//! environment overrides. Tokens are read from the environment only.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::fonts::FontConfig;
use crate::geometry::PageGeometry;
use crate::pagination::SlicingPolicy;
use crate::raster::RasterOptions;
use crate::resources::ResourceConfig;

pub const ENV_BACKEND: &str = "RESUME_FORGE_BACKEND";
pub const ENV_REMOTE_URL: &str = "RESUME_FORGE_REMOTE_URL";
pub const ENV_REMOTE_TOKEN: &str = "RESUME_FORGE_REMOTE_TOKEN";
pub const ENV_API_TOKEN: &str = "RESUME_FORGE_API_TOKEN";
pub const ENV_CHROME: &str = "RESUME_FORGE_CHROME";

/// Which renderer produces the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Rasterize, slice and assemble in this process.
    #[default]
    InProcess,
    /// POST the composed HTML to the render service.
    Remote,
    /// Print-ready HTML for the browser's print dialog.
    PrintHtml,
}

impl std::str::FromStr for BackendKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-process" | "inprocess" | "local" => Ok(Self::InProcess),
            "remote" => Ok(Self::Remote),
            "print-html" | "print" => Ok(Self::PrintHtml),
            other => Err(ExportError::Config(format!("unknown backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Full URL of the render endpoint.
    pub url: String,
    pub timeout_secs: u64,
    /// Bearer token; environment only.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000/api/generate-pdf".to_string(),
            timeout_secs: 90,
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Where direct downloads land. Defaults to the working directory.
    pub download_dir: Option<PathBuf>,
    /// How long the artifact buffer is held after saving.
    pub release_delay_ms: u64,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            release_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Chromium binary; discovered when unset.
    pub chrome_path: Option<PathBuf>,
    pub render_timeout_secs: u64,
    /// Virtual time Chromium waits for fonts and images before printing.
    pub settle_ms: u64,
    pub body_limit_bytes: usize,
    /// Required bearer token; environment only.
    #[serde(skip)]
    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            chrome_path: None,
            render_timeout_secs: 60,
            settle_ms: 1000,
            body_limit_bytes: 25 * 1024 * 1024,
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Id of the export root element.
    pub root_id: String,
    /// PDF document title.
    pub title: String,
    pub default_filename: String,
    pub backend: BackendKind,
    pub geometry: PageGeometry,
    pub raster: RasterOptions,
    pub slicing: SlicingPolicy,
    pub fonts: FontConfig,
    pub resources: ResourceConfig,
    pub remote: RemoteConfig,
    pub save: SaveConfig,
    pub server: ServerConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            root_id: "resume-preview".to_string(),
            title: "Resume".to_string(),
            default_filename: "resume.pdf".to_string(),
            backend: BackendKind::default(),
            geometry: PageGeometry::A4,
            raster: RasterOptions::default(),
            slicing: SlicingPolicy::default(),
            fonts: FontConfig::default(),
            resources: ResourceConfig::default(),
            remote: RemoteConfig::default(),
            save: SaveConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Defaults, then `path` if given, then the environment (and `.env`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = match path {
            Some(p) => Self::from_toml(&std::fs::read_to_string(p)?)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ExportError::Config(e.to_string()))
    }

    /// Apply overrides from `lookup`; empty values count as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(backend) = get(ENV_BACKEND) {
            self.backend = backend.parse()?;
        }
        if let Some(url) = get(ENV_REMOTE_URL) {
            self.remote.url = url;
        }
        if let Some(token) = get(ENV_REMOTE_TOKEN) {
            self.remote.token = Some(token);
        }
        if let Some(token) = get(ENV_API_TOKEN) {
            self.server.api_token = Some(token);
        }
        if let Some(chrome) = get(ENV_CHROME) {
            self.server.chrome_path = Some(PathBuf::from(chrome));
        }
        Ok(())
    }

    /// The page geometry, device scale and slicing margin form the visual
    /// contract; reject anything that would quietly break it.
    pub fn validate(&self) -> Result<()> {
        let g = &self.geometry;
        if g.margin_mm < 0.0 || g.content_width_mm() <= 0.0 || g.content_height_mm() <= 0.0 {
            return Err(ExportError::Config(format!(
                "margin {} mm leaves no content area on a {}x{} mm page",
                g.margin_mm, g.page_width_mm, g.page_height_mm
            )));
        }
        if self.raster.device_scale < 2.0 {
            return Err(ExportError::Config(format!(
                "device_scale must be at least 2, got {}",
                self.raster.device_scale
            )));
        }
        let margin = self.slicing.safety_margin_mm;
        if margin < 0.0 || margin >= g.content_height_mm() {
            return Err(ExportError::Config(format!(
                "safety margin {margin} mm must be in [0, {}) mm",
                g.content_height_mm()
            )));
        }
        if self.root_id.trim().is_empty() {
            return Err(ExportError::Config("root_id must not be empty".into()));
        }
        Ok(())
    }
}
