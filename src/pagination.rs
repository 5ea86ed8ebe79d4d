//! PageSlicer – cuts a tall capture into page-sized image slices.
//!
//! Every page shows a window of one content height but advances by the
//! content height minus a safety margin, so neighbouring pages overlap by
//! that margin and nothing at a page edge is ever lost. Trailing content
//! shorter than the margin is already shown on the previous page and does
//! not get a page of its own.

use image::RgbaImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::geometry::PageGeometry;
use crate::raster::RasterImage;

/// Absorbs float drift in the tail-page comparison, in mm.
pub const EPSILON_MM: f32 = 0.01;

/// How pages are stepped through the capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicingPolicy {
    /// Overlap between consecutive pages, in mm.
    pub safety_margin_mm: f32,
    /// Pages allowed beyond `ceil(height / content height)`.
    pub extra_page_allowance: usize,
}

impl Default for SlicingPolicy {
    fn default() -> Self {
        Self {
            safety_margin_mm: 15.0,
            extra_page_allowance: 3,
        }
    }
}

/// Page offsets for one capture. Pure data; serializable for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePlan {
    pub source_height_mm: f32,
    pub content_height_mm: f32,
    pub step_mm: f32,
    /// Top of each page's window in the capture, in mm.
    pub offsets_mm: Vec<f32>,
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        self.offsets_mm.len()
    }
}

/// Plan the page offsets for a capture `source_height_mm` tall.
pub fn plan_pages(
    source_height_mm: f32,
    content_height_mm: f32,
    policy: &SlicingPolicy,
) -> Result<PagePlan> {
    let margin = policy.safety_margin_mm;
    let step = content_height_mm - margin;
    if !step.is_finite() || step <= 0.0 {
        return Err(ExportError::Config(format!(
            "safety margin {margin} mm leaves no room on a {content_height_mm} mm page"
        )));
    }
    let height = if source_height_mm.is_finite() {
        source_height_mm.max(0.0)
    } else {
        0.0
    };

    let limit = (height / content_height_mm).ceil() as usize + policy.extra_page_allowance;
    let mut offsets = vec![0.0];
    let mut remaining = height - step;
    while remaining > margin + EPSILON_MM && offsets.len() < limit {
        offsets.push(height - remaining);
        remaining -= step;
    }

    Ok(PagePlan {
        source_height_mm: height,
        content_height_mm,
        step_mm: step,
        offsets_mm: offsets,
    })
}

// ---------------------------------------------------------------------------
// Slicing
// ---------------------------------------------------------------------------

/// One page's part of the capture.
#[derive(Debug, Clone)]
pub struct PageSlice {
    pub index: usize,
    pub offset_mm: f32,
    /// Height of `image` in mm; at most one content height.
    pub height_mm: f32,
    /// `None` when the capture has nothing at this offset.
    pub image: Option<RgbaImage>,
}

/// Slices in physical page order.
#[derive(Debug, Clone)]
pub struct PageSequence {
    pub plan: PagePlan,
    pub slices: Vec<PageSlice>,
}

impl PageSequence {
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

pub struct PageSlicer {
    geometry: PageGeometry,
    policy: SlicingPolicy,
}

impl PageSlicer {
    pub fn new(geometry: PageGeometry, policy: SlicingPolicy) -> Self {
        Self { geometry, policy }
    }

    pub fn plan(&self, raster: &RasterImage) -> Result<PagePlan> {
        plan_pages(
            raster.height_mm(),
            self.geometry.content_height_mm(),
            &self.policy,
        )
    }

    pub fn slice(&self, raster: &RasterImage) -> Result<PageSequence> {
        let plan = self.plan(raster)?;
        let content = plan.content_height_mm;
        let ppm = raster.pixels_per_mm();
        let (width_px, height_px) = raster.pixels.dimensions();
        let sections = raster.section_spans_mm();

        let mut slices = Vec::with_capacity(plan.page_count());
        for (index, &offset) in plan.offsets_mm.iter().enumerate() {
            let top = ((offset * ppm).round() as u32).min(height_px);
            let bottom = (((offset + content) * ppm).round() as u32).min(height_px);
            let image = (bottom > top && width_px > 0).then(|| {
                image::imageops::crop_imm(&raster.pixels, 0, top, width_px, bottom - top).to_image()
            });

            let cut = offset + content;
            if cut < plan.source_height_mm {
                for (s_top, s_bottom) in sections.iter().filter(|(t, b)| *t < cut && cut < *b) {
                    debug!(
                        "Page {} ends inside a section ({s_top:.1}-{s_bottom:.1} mm) at {cut:.1} mm",
                        index + 1
                    );
                }
            }

            slices.push(PageSlice {
                index,
                offset_mm: offset,
                height_mm: (bottom - top) as f32 / ppm,
                image,
            });
        }
        debug!(
            "Sliced {:.1} mm into {} page(s), step {:.1} mm",
            plan.source_height_mm,
            slices.len(),
            plan.step_mm
        );
        Ok(PageSequence { plan, slices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: f32 = 257.0;

    fn plan(h: f32) -> PagePlan {
        plan_pages(h, C, &SlicingPolicy::default()).unwrap()
    }

    #[test]
    fn content_height_or_less_is_one_page() {
        for h in [0.0, 1.0, 100.0, 242.0, 256.99, 257.0] {
            assert_eq!(plan(h).page_count(), 1, "height {h}");
        }
    }

    #[test]
    fn two_point_three_pages() {
        let p = plan(2.3 * C);
        assert_eq!(p.page_count(), 3);
        for (got, want) in p.offsets_mm.iter().zip([0.0, 242.0, 484.0]) {
            assert!((got - want).abs() < 0.01);
        }
    }

    #[test]
    fn tail_within_safety_margin_adds_no_page() {
        // Page two's window ends at 242 + 257 mm.
        assert_eq!(plan(257.0 + 15.0).page_count(), 2);
        assert_eq!(plan(242.0 + 257.0).page_count(), 2);
        assert_eq!(plan(242.0 + 257.0 + 1.0).page_count(), 3);
    }

    #[test]
    fn page_count_bounds_and_monotonic_offsets() {
        let step = C - 15.0;
        let mut h = 0.0;
        while h < 5000.0 {
            let p = plan(h);
            let upper = (h / step).ceil().max(1.0) as usize + 3;
            assert!(p.page_count() >= 1 && p.page_count() <= upper, "height {h}");
            for pair in p.offsets_mm.windows(2) {
                assert!((pair[1] - pair[0] - step).abs() < 0.01);
            }
            h += 37.3;
        }
    }

    #[test]
    fn allowance_caps_page_count() {
        let policy = SlicingPolicy {
            safety_margin_mm: 200.0,
            extra_page_allowance: 0,
        };
        let p = plan_pages(1000.0, C, &policy).unwrap();
        assert_eq!(p.page_count(), 4);
    }

    #[test]
    fn deterministic() {
        assert_eq!(plan(1234.5), plan(1234.5));
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let policy = SlicingPolicy {
            safety_margin_mm: C,
            ..SlicingPolicy::default()
        };
        assert!(matches!(plan_pages(500.0, C, &policy), Err(ExportError::Config(_))));
    }

    #[test]
    fn slices_cover_the_capture() {
        let scale = 2.0;
        let ppm = scale * crate::geometry::CSS_PX_PER_MM;
        let height_px = (300.0 * ppm).round() as u32;
        let raster = RasterImage::from_pixels(RgbaImage::new(40, height_px), scale, Vec::new());
        let seq = PageSlicer::new(PageGeometry::A4, SlicingPolicy::default())
            .slice(&raster)
            .unwrap();

        assert_eq!(seq.len(), 2);
        let first = seq.slices[0].image.as_ref().unwrap();
        assert_eq!(first.width(), 40);
        assert!((first.height() as f32 - C * ppm).abs() <= 1.0);

        let last = &seq.slices[1];
        let top = (last.offset_mm * ppm).round() as u32;
        assert_eq!(top + last.image.as_ref().unwrap().height(), height_px);
        assert!(last.height_mm < C);
    }

    #[test]
    fn empty_capture_gives_one_blank_page() {
        let raster = RasterImage::from_pixels(RgbaImage::new(40, 0), 2.0, Vec::new());
        let seq = PageSlicer::new(PageGeometry::A4, SlicingPolicy::default())
            .slice(&raster)
            .unwrap();
        assert_eq!(seq.len(), 1);
        assert!(seq.slices[0].image.is_none());
    }
}
