//! Integration tests for the in-process export chain.
//!
//! These tests validate:
//! - Page counts for short, tall and exactly-one-page résumés
//! - The PDF page count always matches the page plan
//! - The live document is restored after every capture
//! - Captures are deterministic

use sha2::{Digest, Sha256};

use resume_forge::config::ExportConfig;
use resume_forge::dom::Document;
use resume_forge::error::ExportError;
use resume_forge::fonts::FontManager;
use resume_forge::inline::StyleSnapshot;
use resume_forge::pagination::plan_pages;
use resume_forge::pipeline::{capture, plan_document, render_pdf};
use resume_forge::resources::ImageCache;
use resume_forge::templates;

// =====================================================================
// Helpers
// =====================================================================

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

/// Inline `<style>` blocks only, no network.
fn inline_snapshot(doc: &Document) -> StyleSnapshot {
    StyleSnapshot {
        fragments: doc
            .style_sources()
            .into_iter()
            .filter_map(|s| match s {
                resume_forge::dom::StyleSource::Inline(css) => Some(css),
                resume_forge::dom::StyleSource::Link(_) => None,
            })
            .collect(),
        skipped: Vec::new(),
    }
}

fn page_count(html: &str) -> usize {
    let mut doc = Document::parse(html);
    let snapshot = inline_snapshot(&doc);
    let out = render_pdf(
        &mut doc,
        &snapshot,
        &ImageCache::default(),
        &FontManager::default(),
        &ExportConfig::default(),
    )
    .unwrap();
    assert_valid_pdf(&out.pdf.bytes);
    assert_eq!(out.pdf.pages, out.plan.page_count());
    out.pdf.pages
}

fn content_height_px() -> f32 {
    ExportConfig::default().geometry.content_height_css_px()
}

// =====================================================================
// Page counts
// =====================================================================

#[test]
fn short_resume_is_one_page() {
    assert_eq!(page_count(&templates::block_document(300.0)), 1);
}

#[test]
fn content_exactly_one_page_tall_stays_one_page() {
    assert_eq!(page_count(&templates::block_document(content_height_px())), 1);
}

#[test]
fn nested_scroll_container_does_not_truncate_the_capture() {
    let html = r#"<div id="resume-preview"><div style="overflow: auto; max-height: 100px"><div style="height: 400px; background-color: #ff0000"></div></div></div>"#;
    let mut doc = Document::parse(html);
    let raster = capture(
        &mut doc,
        &StyleSnapshot::default(),
        &ImageCache::default(),
        &FontManager::default(),
        &ExportConfig::default(),
    )
    .unwrap();
    assert!((raster.css_height - 400.0).abs() < 0.5);
}

#[test]
fn content_2_3_pages_tall_makes_three_pages() {
    let height = content_height_px() * 2.3;
    assert_eq!(page_count(&templates::block_document(height)), 3);
}

#[test]
fn long_resume_paginates() {
    let pages = page_count(&templates::long_resume_document(40));
    assert!(pages >= 2, "expected several pages, got {pages}");
}

#[test]
fn sample_resume_renders() {
    assert_eq!(page_count(&templates::resume_document()), 1);
}

#[test]
fn page_plan_matches_pure_planner() {
    let config = ExportConfig::default();
    let mut doc = Document::parse(&templates::block_document(content_height_px() * 1.7));
    let plan = plan_document(
        &mut doc,
        &StyleSnapshot::default(),
        &ImageCache::default(),
        &FontManager::default(),
        &config,
    )
    .unwrap();
    let expected = plan_pages(
        plan.source_height_mm,
        config.geometry.content_height_mm(),
        &config.slicing,
    )
    .unwrap();
    assert_eq!(plan, expected);
    assert_eq!(plan.offsets_mm[0], 0.0);
}

// =====================================================================
// Failure and restoration
// =====================================================================

#[test]
fn missing_preview_fails_without_pdf() {
    let mut doc = Document::parse(templates::document_without_preview());
    let err = render_pdf(
        &mut doc,
        &StyleSnapshot::default(),
        &ImageCache::default(),
        &FontManager::default(),
        &ExportConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ExportError::RootNotFound(ref id) if id == "resume-preview"));
}

#[test]
fn preview_styles_are_restored_after_export() {
    let mut doc = Document::parse(&templates::resume_document());
    let before = doc.to_html();
    let snapshot = inline_snapshot(&doc);
    render_pdf(
        &mut doc,
        &snapshot,
        &ImageCache::default(),
        &FontManager::default(),
        &ExportConfig::default(),
    )
    .unwrap();
    assert_eq!(doc.to_html(), before);
}

#[test]
fn preview_styles_are_restored_after_failed_capture() {
    let mut config = ExportConfig::default();
    config.raster.max_height_px = 100;
    let mut doc = Document::parse(&templates::long_resume_document(10));
    let before = doc.to_html();
    let err = render_pdf(
        &mut doc,
        &StyleSnapshot::default(),
        &ImageCache::default(),
        &FontManager::default(),
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, ExportError::Rasterize(_)));
    assert_eq!(doc.to_html(), before);
}

// =====================================================================
// Determinism
// =====================================================================

#[test]
fn captures_are_pixel_identical() {
    let hash = || {
        let mut doc = Document::parse(&templates::resume_document());
        let snapshot = inline_snapshot(&doc);
        let raster = capture(
            &mut doc,
            &snapshot,
            &ImageCache::default(),
            &FontManager::default(),
            &ExportConfig::default(),
        )
        .unwrap();
        Sha256::digest(raster.pixels.as_raw())
    };
    assert_eq!(hash(), hash());
}

#[test]
fn capture_ignores_preview_transform_and_clip() {
    let mut doc = Document::parse(&templates::resume_document());
    let snapshot = inline_snapshot(&doc);
    let config = ExportConfig::default();
    let raster = capture(
        &mut doc,
        &snapshot,
        &ImageCache::default(),
        &FontManager::default(),
        &config,
    )
    .unwrap();
    let expected_width =
        (config.geometry.content_width_css_px() * config.raster.device_scale).round() as u32;
    assert_eq!(raster.width_px(), expected_width);
    assert!(raster.height_px() > 0);
}
