//! Page geometry – the fixed physical page and margin constants that define
//! the visual contract of an export.

use serde::{Deserialize, Serialize};

/// CSS reference pixels per millimetre (96 dpi).
pub const CSS_PX_PER_MM: f32 = 96.0 / 25.4;

/// PDF points per millimetre (72 dpi).
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Physical page size and uniform margin, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
}

impl PageGeometry {
    /// A4 portrait with a 20 mm margin on every side.
    pub const A4: PageGeometry = PageGeometry {
        page_width_mm: 210.0,
        page_height_mm: 297.0,
        margin_mm: 20.0,
    };

    pub fn content_width_mm(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    pub fn content_height_mm(&self) -> f32 {
        self.page_height_mm - 2.0 * self.margin_mm
    }

    /// Content width expressed in CSS pixels; the width the export root is
    /// laid out at before capture.
    pub fn content_width_css_px(&self) -> f32 {
        self.content_width_mm() * CSS_PX_PER_MM
    }

    pub fn content_height_css_px(&self) -> f32 {
        self.content_height_mm() * CSS_PX_PER_MM
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * PT_PER_MM
}

pub fn css_px_to_mm(px: f32) -> f32 {
    px / CSS_PX_PER_MM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_content_box() {
        let g = PageGeometry::A4;
        assert_eq!(g.content_width_mm(), 170.0);
        assert_eq!(g.content_height_mm(), 257.0);
        assert!((g.content_width_css_px() - 642.52).abs() < 0.01);
    }

    #[test]
    fn unit_conversions() {
        assert!((mm_to_pt(210.0) - 595.28).abs() < 0.01);
        assert!((css_px_to_mm(96.0) - 25.4).abs() < 0.001);
    }
}
