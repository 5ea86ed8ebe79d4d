//! # resume-forge – export an HTML résumé preview as a paginated PDF
//!
//! The in-process export runs these stages:
//!
//! 1. **Inline** – snapshot every stylesheet the page uses ([`inline`])
//! 2. **Normalize** – unclip the preview and pin it to the A4 content width ([`normalize`])
//! 3. **Rasterize** – lay out and paint the preview as one tall bitmap ([`raster`])
//! 4. **Slice** – cut the bitmap into page-height strips ([`pagination`])
//! 5. **Assemble** – place each strip on an A4 PDF page ([`render`])
//!
//! [`export::ExportOrchestrator`] drives one export at a time and saves the
//! result. The same document can instead be sent to the headless-browser
//! render service in [`server`] via [`remote`], or composed as print-ready
//! HTML.

pub mod compose;
pub mod config;
pub mod css;
pub mod dom;
pub mod error;
pub mod export;
pub mod fonts;
pub mod geometry;
pub mod inline;
pub mod layout;
pub mod normalize;
pub mod pagination;
pub mod pipeline;
pub mod raster;
pub mod remote;
pub mod render;
pub mod resources;
pub mod save;
pub mod server;
pub mod style;
pub mod templates;

// Re-exports for convenience
pub use config::{BackendKind, ExportConfig};
pub use error::{ExportError, Result};
pub use export::{ExportOptions, ExportOrchestrator, ExportOutcome, ExportState};
pub use geometry::PageGeometry;
pub use pagination::{PagePlan, SlicingPolicy};
pub use pipeline::generate_pdf_from_html;
