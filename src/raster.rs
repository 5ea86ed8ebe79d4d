//! DomRasterizer – captures the export root as one tall bitmap.
//!
//! The root is styled with the page's CSS plus the export overrides, laid
//! out at the print content width and painted with tiny-skia at a fixed
//! device scale. Text comes from ttf-parser glyph outlines.

use std::time::Instant;

use image::RgbaImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tiny_skia::{
    FillRule, FilterQuality, IntSize, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

use crate::css::Stylesheet;
use crate::dom::Document;
use crate::error::{ExportError, Result};
use crate::fonts::{FontKey, FontManager};
use crate::geometry::{css_px_to_mm, PageGeometry, CSS_PX_PER_MM};
use crate::inline::StyleSnapshot;
use crate::layout::{layout_root, BoxContent, PositionedBox, TextFragment};
use crate::normalize::LayoutNormalizer;
use crate::resources::ImageCache;
use crate::style::{self, ColorAdjust, ComputedStyle, Overflow, TextDecoration};

/// Gap between a list marker and its item.
const MARKER_GAP: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterOptions {
    /// Device pixels per CSS pixel. Must be at least 2.
    pub device_scale: f32,
    /// Captures taller than this many device pixels fail.
    pub max_height_px: u32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            device_scale: 2.0,
            max_height_px: 60_000,
        }
    }
}

/// The captured export root. Never mutated after capture.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// Opaque RGBA pixels.
    pub pixels: RgbaImage,
    pub device_scale: f32,
    pub css_width: f32,
    pub css_height: f32,
    /// Vertical `(top, bottom)` spans of avoid-split sections, CSS px.
    pub section_spans: Vec<(f32, f32)>,
}

impl RasterImage {
    /// Wrap already painted pixels.
    pub fn from_pixels(pixels: RgbaImage, device_scale: f32, section_spans: Vec<(f32, f32)>) -> Self {
        let (w, h) = pixels.dimensions();
        Self {
            css_width: w as f32 / device_scale,
            css_height: h as f32 / device_scale,
            pixels,
            device_scale,
            section_spans,
        }
    }

    pub fn width_px(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height_px(&self) -> u32 {
        self.pixels.height()
    }

    pub fn height_mm(&self) -> f32 {
        css_px_to_mm(self.css_height)
    }

    pub fn pixels_per_mm(&self) -> f32 {
        self.device_scale * CSS_PX_PER_MM
    }

    pub fn section_spans_mm(&self) -> Vec<(f32, f32)> {
        self.section_spans
            .iter()
            .map(|&(top, bottom)| (css_px_to_mm(top), css_px_to_mm(bottom)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Capture guard
// ---------------------------------------------------------------------------

/// Holds the export root's capture style for as long as it lives and puts
/// the original `style` attribute back on drop, including when it was
/// absent.
pub struct CaptureGuard<'d> {
    doc: &'d mut Document,
    path: Vec<usize>,
    original: Option<String>,
}

impl<'d> CaptureGuard<'d> {
    pub fn apply(doc: &'d mut Document, path: &[usize], capture_style: String) -> Result<Self> {
        let element = doc
            .element_at_mut(path)
            .ok_or_else(|| ExportError::Rasterize("export root moved during capture".into()))?;
        let original = element.attr("style").map(str::to_string);
        element.set_attr("style", capture_style);
        Ok(Self {
            doc,
            path: path.to_vec(),
            original,
        })
    }

    pub fn document(&self) -> &Document {
        self.doc
    }
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        if let Some(element) = self.doc.element_at_mut(&self.path) {
            match self.original.take() {
                Some(style) => element.set_attr("style", style),
                None => {
                    element.remove_attr("style");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rasterizer
// ---------------------------------------------------------------------------

pub struct DomRasterizer<'a> {
    fonts: &'a FontManager,
    geometry: PageGeometry,
    options: RasterOptions,
}

impl<'a> DomRasterizer<'a> {
    pub fn new(fonts: &'a FontManager, geometry: PageGeometry, options: RasterOptions) -> Self {
        Self {
            fonts,
            geometry,
            options,
        }
    }

    /// Capture the element with `root_id` at the print content width.
    ///
    /// The root's inline style is overridden only while capturing; the
    /// document is left exactly as it was on every exit path.
    pub fn rasterize(
        &self,
        doc: &mut Document,
        root_id: &str,
        snapshot: &StyleSnapshot,
        images: &ImageCache,
    ) -> Result<RasterImage> {
        if self.options.device_scale < 2.0 {
            return Err(ExportError::Config(format!(
                "device scale {} is below 2",
                self.options.device_scale
            )));
        }
        let path = doc
            .path_to_id(root_id)
            .ok_or_else(|| ExportError::RootNotFound(root_id.to_string()))?;

        let started = Instant::now();
        let normalizer = LayoutNormalizer::new(self.geometry, root_id);
        let original = doc.element_at(&path).and_then(|e| e.attr("style"));
        let capture_style = normalizer.capture_style(original);

        let mut css = snapshot.to_css();
        css.push('\n');
        css.push_str(&normalizer.override_css());
        let sheet = Stylesheet::parse(&css);

        let guard = CaptureGuard::apply(doc, &path, capture_style)?;
        let styled = style::style_subtree(guard.document(), &path, &sheet)
            .ok_or_else(|| ExportError::RootNotFound(root_id.to_string()))?;
        let width = self.geometry.content_width_css_px();
        let layout = layout_root(&styled, width, self.fonts, images)?;
        debug!(
            "Laid out #{root_id}: {:.1} x {:.1} css px in {:?}",
            layout.width,
            layout.height,
            started.elapsed()
        );

        let scale = self.options.device_scale;
        let width_px = (width * scale).round() as u32;
        let height_px = (layout.height * scale).ceil() as u32;
        if height_px > self.options.max_height_px {
            return Err(ExportError::Rasterize(format!(
                "capture is {height_px} px tall, limit is {} px",
                self.options.max_height_px
            )));
        }

        let pixels = if height_px == 0 {
            RgbaImage::new(width_px, 0)
        } else {
            let mut painter = Painter::new(self.fonts, images, width_px, height_px, scale)?;
            painter.paint_box(&layout.root, None);
            painter.finish()?
        };
        debug!("Rasterized {width_px}x{height_px} px in {:?}", started.elapsed());

        Ok(RasterImage {
            pixels,
            device_scale: scale,
            css_width: width,
            css_height: layout.height,
            section_spans: layout.root.avoid_split_spans(),
        })
    }
}

// ---------------------------------------------------------------------------
// Painter
// ---------------------------------------------------------------------------

struct Painter<'a> {
    fonts: &'a FontManager,
    images: &'a ImageCache,
    pixmap: Pixmap,
    transform: Transform,
    warned_placeholder: bool,
}

impl<'a> Painter<'a> {
    fn new(
        fonts: &'a FontManager,
        images: &'a ImageCache,
        width: u32,
        height: u32,
        scale: f32,
    ) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            ExportError::Rasterize(format!("cannot allocate a {width}x{height} canvas"))
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);
        Ok(Self {
            fonts,
            images,
            pixmap,
            transform: Transform::from_scale(scale, scale),
            warned_placeholder: false,
        })
    }

    /// The canvas is opaque, so premultiplied and straight RGBA agree.
    fn finish(self) -> Result<RgbaImage> {
        let (w, h) = (self.pixmap.width(), self.pixmap.height());
        RgbaImage::from_raw(w, h, self.pixmap.take())
            .ok_or_else(|| ExportError::Rasterize("canvas size mismatch".into()))
    }

    fn paint_box(&mut self, b: &PositionedBox, clip: Option<&Mask>) {
        let s = &b.style;

        // Print mode: only exact-colour boxes keep their backgrounds.
        if s.print_color_adjust == ColorAdjust::Exact && !s.background_color.is_transparent() {
            self.fill_rect(b.x, b.y, b.width, b.height, &s.background_color, clip);
        }
        if s.has_border() {
            self.paint_borders(b, clip);
        }

        match &b.content {
            BoxContent::Text { lines } => {
                for line in lines {
                    let baseline = b.y + line.y + line.baseline;
                    for frag in &line.fragments {
                        self.paint_fragment(frag, b.x + line.x + frag.x, baseline, clip);
                    }
                }
            }
            BoxContent::Image { src } => self.paint_image(src, b, clip),
            BoxContent::None => {}
        }

        if let Some(marker) = &b.marker {
            self.paint_marker(marker, b, clip);
        }

        let own_clip = if s.overflow == Overflow::Clip {
            self.clip_mask(b, clip)
        } else {
            None
        };
        let child_clip = own_clip.as_ref().or(clip);
        for child in &b.children {
            self.paint_box(child, child_clip);
        }
    }

    fn clip_mask(&self, b: &PositionedBox, parent: Option<&Mask>) -> Option<Mask> {
        let rect = Rect::from_xywh(b.x, b.y, b.width.max(0.0), b.height.max(0.0))?;
        let path = PathBuilder::from_rect(rect);
        match parent {
            Some(p) => {
                let mut mask = p.clone();
                mask.intersect_path(&path, FillRule::Winding, false, self.transform);
                Some(mask)
            }
            None => {
                let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
                mask.fill_path(&path, FillRule::Winding, false, self.transform);
                Some(mask)
            }
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: &style::Color, clip: Option<&Mask>) {
        if w <= 0.0 || h <= 0.0 || color.is_transparent() {
            return;
        }
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            let paint = solid(color);
            self.pixmap.fill_rect(rect, &paint, self.transform, clip);
        }
    }

    fn paint_borders(&mut self, b: &PositionedBox, clip: Option<&Mask>) {
        let s = &b.style;
        let c = s.border_color;
        self.fill_rect(b.x, b.y, b.width, s.border_top_width, &c, clip);
        self.fill_rect(
            b.x,
            b.y + b.height - s.border_bottom_width,
            b.width,
            s.border_bottom_width,
            &c,
            clip,
        );
        self.fill_rect(b.x, b.y, s.border_left_width, b.height, &c, clip);
        self.fill_rect(
            b.x + b.width - s.border_right_width,
            b.y,
            s.border_right_width,
            b.height,
            &c,
            clip,
        );
    }

    fn paint_image(&mut self, src: &str, b: &PositionedBox, clip: Option<&Mask>) {
        let Some(img) = self.images.get(src) else {
            warn!("Image not available for capture, leaving it blank");
            return;
        };
        let (iw, ih) = img.dimensions();
        let Some(pixmap) = to_pixmap(img) else {
            return;
        };
        if iw == 0 || ih == 0 || b.width <= 0.0 || b.height <= 0.0 {
            return;
        }
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        let transform = self
            .transform
            .pre_translate(b.x, b.y)
            .pre_scale(b.width / iw as f32, b.height / ih as f32);
        self.pixmap
            .draw_pixmap(0, 0, pixmap.as_ref(), &paint, transform, clip);
    }

    fn paint_marker(&mut self, marker: &str, b: &PositionedBox, clip: Option<&Mask>) {
        let s = &b.style;
        let bold = s.font_weight == style::FontWeight::Bold;
        let italic = s.font_style == style::FontStyle::Italic;
        let width = self
            .fonts
            .measure_text_width(marker, s.font_size, bold, italic, &s.font_family);
        let baseline = first_baseline(b).unwrap_or_else(|| {
            b.y + self
                .fonts
                .ascender_px(s.font_size, bold, italic, &s.font_family)
        });
        let mut marker_style = s.clone();
        marker_style.text_decoration = TextDecoration::None;
        self.paint_text(marker, b.x - MARKER_GAP - width, baseline, &marker_style, clip);
    }

    fn paint_fragment(&mut self, frag: &TextFragment, x: f32, baseline: f32, clip: Option<&Mask>) {
        self.paint_text(&frag.text, x, baseline, &frag.style, clip);
        if frag.style.text_decoration == TextDecoration::Underline {
            let fs = frag.style.font_size;
            let thickness = (fs / 16.0).max(1.0);
            self.fill_rect(x, baseline + fs * 0.1, frag.width, thickness, &frag.style.color, clip);
        }
    }

    fn paint_text(&mut self, text: &str, x: f32, baseline: f32, s: &ComputedStyle, clip: Option<&Mask>) {
        let bold = s.font_weight == style::FontWeight::Bold;
        let italic = s.font_style == style::FontStyle::Italic;
        let data = self.fonts.get(&FontKey::new(&s.font_family, bold, italic));
        let paint = solid(&s.color);

        let Some(face) = data.face() else {
            if !self.warned_placeholder {
                warn!("No font file loaded; text is captured as placeholder bars");
                self.warned_placeholder = true;
            }
            self.paint_placeholder(text, x, baseline, s, clip);
            return;
        };

        let scale = s.font_size / data.units_per_em;
        let mut pen = x;
        for ch in text.chars() {
            let Some(gid) = face.glyph_index(ch) else {
                pen += s.font_size * 0.5;
                continue;
            };
            if let Some(path) = glyph_path(&face, gid, pen, baseline, scale) {
                self.pixmap
                    .fill_path(&path, &paint, FillRule::Winding, self.transform, clip);
            }
            pen += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale;
        }
    }

    /// One bar per word, at x-height.
    fn paint_placeholder(&mut self, text: &str, x: f32, baseline: f32, s: &ComputedStyle, clip: Option<&Mask>) {
        let bold = s.font_weight == style::FontWeight::Bold;
        let italic = s.font_style == style::FontStyle::Italic;
        let fs = s.font_size;
        let mut bar_color = s.color;
        bar_color.a *= 0.6;

        let mut pen = x;
        let mut word_start: Option<f32> = None;
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            let w = self
                .fonts
                .measure_text_width(ch.encode_utf8(&mut buf), fs, bold, italic, &s.font_family);
            if ch.is_whitespace() {
                if let Some(start) = word_start.take() {
                    self.fill_rect(start, baseline - fs * 0.55, pen - start, fs * 0.5, &bar_color, clip);
                }
            } else if word_start.is_none() {
                word_start = Some(pen);
            }
            pen += w;
        }
        if let Some(start) = word_start {
            self.fill_rect(start, baseline - fs * 0.55, pen - start, fs * 0.5, &bar_color, clip);
        }
    }
}

fn solid(color: &style::Color) -> Paint<'static> {
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut paint = Paint::default();
    paint.set_color_rgba8(to_u8(color.r), to_u8(color.g), to_u8(color.b), to_u8(color.a));
    paint.anti_alias = true;
    paint
}

fn first_baseline(b: &PositionedBox) -> Option<f32> {
    if let BoxContent::Text { lines } = &b.content {
        if let Some(line) = lines.first() {
            return Some(b.y + line.y + line.baseline);
        }
    }
    b.children.iter().find_map(first_baseline)
}

/// Premultiplied copy of a decoded image.
fn to_pixmap(img: &RgbaImage) -> Option<Pixmap> {
    let (w, h) = img.dimensions();
    let mut data = Vec::with_capacity((w as usize) * (h as usize) * 4);
    for px in img.pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as f32 / 255.0;
        data.push((r as f32 * alpha).round() as u8);
        data.push((g as f32 * alpha).round() as u8);
        data.push((b as f32 * alpha).round() as u8);
        data.push(a);
    }
    Pixmap::from_vec(data, IntSize::from_wh(w, h)?)
}

/// Font units are y-up; the canvas is y-down.
fn glyph_path(
    face: &ttf_parser::Face<'_>,
    gid: ttf_parser::GlyphId,
    x: f32,
    baseline: f32,
    scale: f32,
) -> Option<tiny_skia::Path> {
    struct Outline {
        builder: PathBuilder,
        x: f32,
        y: f32,
        scale: f32,
    }

    impl Outline {
        fn pt(&self, px: f32, py: f32) -> (f32, f32) {
            (self.x + px * self.scale, self.y - py * self.scale)
        }
    }

    impl ttf_parser::OutlineBuilder for Outline {
        fn move_to(&mut self, x: f32, y: f32) {
            let (x, y) = self.pt(x, y);
            self.builder.move_to(x, y);
        }

        fn line_to(&mut self, x: f32, y: f32) {
            let (x, y) = self.pt(x, y);
            self.builder.line_to(x, y);
        }

        fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
            let (x1, y1) = self.pt(x1, y1);
            let (x, y) = self.pt(x, y);
            self.builder.quad_to(x1, y1, x, y);
        }

        fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
            let (x1, y1) = self.pt(x1, y1);
            let (x2, y2) = self.pt(x2, y2);
            let (x, y) = self.pt(x, y);
            self.builder.cubic_to(x1, y1, x2, y2, x, y);
        }

        fn close(&mut self) {
            self.builder.close();
        }
    }

    let mut outline = Outline {
        builder: PathBuilder::new(),
        x,
        y: baseline,
        scale,
    };
    face.outline_glyph(gid, &mut outline)?;
    outline.builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_BANNER: &str = r#"<html><body>
        <div id="resume-preview" style="max-height: 50px">
          <div style="background-color: #ff0000; height: 100px"></div>
          <section class="resume-section" style="height: 200px">Body</section>
        </div>
      </body></html>"#;

    fn rasterize(html: &str, options: RasterOptions) -> (Document, Result<RasterImage>) {
        let mut doc = Document::parse(html);
        let fonts = FontManager::default();
        let images = ImageCache::default();
        let result = DomRasterizer::new(&fonts, PageGeometry::A4, options).rasterize(
            &mut doc,
            "resume-preview",
            &StyleSnapshot::default(),
            &images,
        );
        (doc, result)
    }

    #[test]
    fn captures_full_height_at_content_width() {
        let (_, raster) = rasterize(RED_BANNER, RasterOptions::default());
        let raster = raster.unwrap();
        assert_eq!(raster.width_px(), 1285);
        assert!((raster.css_height - 300.0).abs() < 0.5);
        assert_eq!(raster.height_px(), 600);
        assert_eq!(raster.section_spans.len(), 1);
        let (top, bottom) = raster.section_spans[0];
        assert!((top - 100.0).abs() < 0.5 && (bottom - 300.0).abs() < 0.5);
    }

    #[test]
    fn exact_color_backgrounds_are_painted() {
        let (_, raster) = rasterize(RED_BANNER, RasterOptions::default());
        let raster = raster.unwrap();
        assert_eq!(raster.pixels.get_pixel(20, 20).0, [255, 0, 0, 255]);
        assert_eq!(raster.pixels.get_pixel(20, 500).0, [255, 255, 255, 255]);
    }

    #[test]
    fn nested_scroll_container_is_captured_in_full() {
        let html = r#"<div id="resume-preview"><div style="overflow: auto; max-height: 100px"><div style="height: 400px; background-color: #ff0000"></div></div></div>"#;
        let (_, raster) = rasterize(html, RasterOptions::default());
        let raster = raster.unwrap();
        assert!((raster.css_height - 400.0).abs() < 0.5);
        assert_eq!(raster.height_px(), 800);
        assert_eq!(raster.pixels.get_pixel(20, 700).0, [255, 0, 0, 255]);
    }

    #[test]
    fn missing_root_is_reported() {
        let (_, result) = rasterize("<div id='other'></div>", RasterOptions::default());
        assert!(matches!(result, Err(ExportError::RootNotFound(id)) if id == "resume-preview"));
    }

    #[test]
    fn height_limit_fails_and_restores_style() {
        let options = RasterOptions {
            max_height_px: 100,
            ..RasterOptions::default()
        };
        let (doc, result) = rasterize(RED_BANNER, options);
        assert!(matches!(result, Err(ExportError::Rasterize(_))));
        let root = doc.find_by_id("resume-preview").unwrap();
        assert_eq!(root.attr("style"), Some("max-height: 50px"));
    }

    #[test]
    fn scale_below_two_is_rejected() {
        let options = RasterOptions {
            device_scale: 1.0,
            ..RasterOptions::default()
        };
        let (_, result) = rasterize(RED_BANNER, options);
        assert!(matches!(result, Err(ExportError::Config(_))));
    }

    #[test]
    fn empty_root_gives_zero_height_raster() {
        let (_, raster) = rasterize(r#"<div id="resume-preview"></div>"#, RasterOptions::default());
        let raster = raster.unwrap();
        assert_eq!(raster.height_px(), 0);
        assert_eq!(raster.height_mm(), 0.0);
    }

    #[test]
    fn guard_restores_absent_style_on_unwind() {
        let mut doc = Document::parse(r#"<div id="r" class="a">x</div>"#);
        let before = doc.to_html();
        let path = doc.path_to_id("r").unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let guard = CaptureGuard::apply(&mut doc, &path, "width: 1px".into()).unwrap();
            assert!(guard.document().to_html().contains("width: 1px"));
            panic!("capture failed");
        }));
        assert!(result.is_err());
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn pixels_per_mm_follows_scale() {
        let raster = RasterImage::from_pixels(RgbaImage::new(10, 40), 2.0, Vec::new());
        assert_eq!(raster.css_height, 20.0);
        assert!((raster.pixels_per_mm() - 2.0 * CSS_PX_PER_MM).abs() < 1e-4);
    }
}
