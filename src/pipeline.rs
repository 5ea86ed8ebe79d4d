//! Pipeline – ties together capture, slicing and assembly into a single
//! synchronous call. Resource fetching happens before this runs.

use std::time::Instant;

use log::{debug, info};

use crate::config::ExportConfig;
use crate::dom::Document;
use crate::error::Result;
use crate::fonts::FontManager;
use crate::inline::StyleSnapshot;
use crate::pagination::{PagePlan, PageSlicer};
use crate::raster::{DomRasterizer, RasterImage};
use crate::render::{AssembledPdf, DocumentAssembler};
use crate::resources::ImageCache;

/// Everything the in-process export produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub pdf: AssembledPdf,
    pub plan: PagePlan,
    pub raster_width_px: u32,
    pub raster_height_px: u32,
}

/// Capture the export root of `doc`.
pub fn capture(
    doc: &mut Document,
    snapshot: &StyleSnapshot,
    images: &ImageCache,
    fonts: &FontManager,
    config: &ExportConfig,
) -> Result<RasterImage> {
    DomRasterizer::new(fonts, config.geometry, config.raster).rasterize(
        doc,
        &config.root_id,
        snapshot,
        images,
    )
}

/// Full in-process chain: capture → slice → assemble.
pub fn render_pdf(
    doc: &mut Document,
    snapshot: &StyleSnapshot,
    images: &ImageCache,
    fonts: &FontManager,
    config: &ExportConfig,
) -> Result<PipelineOutput> {
    let started = Instant::now();

    // 1. Capture
    let raster = capture(doc, snapshot, images, fonts, config)?;
    debug!(
        "Captured {}x{} px ({:.1} mm) after {:?}",
        raster.width_px(),
        raster.height_px(),
        raster.height_mm(),
        started.elapsed()
    );

    // 2. Slice
    let sequence = PageSlicer::new(config.geometry, config.slicing).slice(&raster)?;

    // 3. Assemble
    let pdf = DocumentAssembler::new(config.geometry, &config.title).assemble(&sequence)?;
    info!(
        "Rendered {} page(s) from a {:.1} mm capture in {:?}",
        pdf.pages,
        raster.height_mm(),
        started.elapsed()
    );

    Ok(PipelineOutput {
        pdf,
        plan: sequence.plan,
        raster_width_px: raster.width_px(),
        raster_height_px: raster.height_px(),
    })
}

/// Only the page plan; nothing is assembled.
pub fn plan_document(
    doc: &mut Document,
    snapshot: &StyleSnapshot,
    images: &ImageCache,
    fonts: &FontManager,
    config: &ExportConfig,
) -> Result<PagePlan> {
    let raster = capture(doc, snapshot, images, fonts, config)?;
    PageSlicer::new(config.geometry, config.slicing).plan(&raster)
}

/// Convenience: HTML string → PDF bytes with the default configuration,
/// inline `<style>` blocks only and heuristic font metrics.
pub fn generate_pdf_from_html(html: &str) -> Result<Vec<u8>> {
    let mut doc = Document::parse(html);
    let snapshot = StyleSnapshot {
        fragments: doc
            .style_sources()
            .into_iter()
            .filter_map(|s| match s {
                crate::dom::StyleSource::Inline(css) => Some(css),
                crate::dom::StyleSource::Link(_) => None,
            })
            .collect(),
        skipped: Vec::new(),
    };
    let out = render_pdf(
        &mut doc,
        &snapshot,
        &ImageCache::default(),
        &FontManager::default(),
        &ExportConfig::default(),
    )?;
    Ok(out.pdf.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;

    #[test]
    fn pipeline_basic() {
        let html = r#"<div id="resume-preview"><h1>Hello</h1><p>World</p></div>"#;
        let bytes = generate_pdf_from_html(html).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn page_count_matches_plan() {
        let html = r#"<div id="resume-preview"><div style="height: 2000px"></div></div>"#;
        let mut doc = Document::parse(html);
        let out = render_pdf(
            &mut doc,
            &StyleSnapshot::default(),
            &ImageCache::default(),
            &FontManager::default(),
            &ExportConfig::default(),
        )
        .unwrap();
        assert_eq!(out.pdf.pages, out.plan.page_count());
        assert!(out.pdf.pages >= 3);
        assert_eq!(out.raster_height_px, 4000);
    }

    #[test]
    fn missing_root_fails() {
        let err = generate_pdf_from_html("<p>no preview</p>").unwrap_err();
        assert!(matches!(err, ExportError::RootNotFound(_)));
    }
}
