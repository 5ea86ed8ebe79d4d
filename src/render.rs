//! DocumentAssembler – places page slices on A4 pages using `printpdf`
//! (v0.8 ops-based API).

use std::io::Cursor;

use log::debug;
use printpdf::*;

use crate::error::{ExportError, Result};
use crate::geometry::{mm_to_pt, PageGeometry};
use crate::pagination::PageSequence;

/// A finished PDF and how many pages it has.
#[derive(Debug, Clone)]
pub struct AssembledPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

pub struct DocumentAssembler {
    geometry: PageGeometry,
    title: String,
}

impl DocumentAssembler {
    pub fn new(geometry: PageGeometry, title: impl Into<String>) -> Self {
        Self {
            geometry,
            title: title.into(),
        }
    }

    /// One page per slice, each slice fitted to the content width at the
    /// top-left margin. An empty sequence still yields one blank page.
    pub fn assemble(&self, sequence: &PageSequence) -> Result<AssembledPdf> {
        let g = &self.geometry;
        let page_w = Mm(g.page_width_mm);
        let page_h = Mm(g.page_height_mm);
        let page_h_pt = mm_to_pt(g.page_height_mm);
        let margin_pt = mm_to_pt(g.margin_mm);
        let content_w_pt = mm_to_pt(g.content_width_mm());

        let mut doc = PdfDocument::new(&self.title);
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let mut pages = Vec::with_capacity(sequence.len().max(1));

        for slice in &sequence.slices {
            let mut ops = Vec::new();
            if let Some(img) = &slice.image {
                let (px_w, px_h) = img.dimensions();
                let mut png = Vec::new();
                img.write_to(&mut Cursor::new(&mut png), ::image::ImageFormat::Png)
                    .map_err(|e| ExportError::Assemble(format!("page {}: {e}", slice.index + 1)))?;
                let raw = RawImage::decode_from_bytes(&png, &mut warnings)
                    .map_err(|e| ExportError::Assemble(format!("page {}: {e}", slice.index + 1)))?;
                let xobj_id = doc.add_image(&raw);

                // At 72 dpi one image pixel is one point before scaling.
                let scale = content_w_pt / px_w as f32;
                let height_pt = px_h as f32 * scale;
                ops.push(Op::UseXobject {
                    id: xobj_id,
                    transform: XObjectTransform {
                        translate_x: Some(Pt(margin_pt)),
                        translate_y: Some(Pt(page_h_pt - margin_pt - height_pt)),
                        dpi: Some(72.0),
                        scale_x: Some(scale),
                        scale_y: Some(scale),
                        rotate: None,
                    },
                });
            }
            pages.push(PdfPage::new(page_w, page_h, ops));
        }

        // Ensure at least one page.
        if pages.is_empty() {
            pages.push(PdfPage::new(page_w, page_h, Vec::new()));
        }

        let count = pages.len();
        doc.with_pages(pages);
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        debug!("Assembled {count} page(s), {} bytes", bytes.len());
        Ok(AssembledPdf {
            bytes,
            pages: count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{PagePlan, PageSlice};
    use ::image::{Rgba, RgbaImage};

    fn sequence(slices: Vec<Option<RgbaImage>>) -> PageSequence {
        let offsets: Vec<f32> = (0..slices.len()).map(|i| i as f32 * 242.0).collect();
        PageSequence {
            plan: PagePlan {
                source_height_mm: 0.0,
                content_height_mm: 257.0,
                step_mm: 242.0,
                offsets_mm: offsets.clone(),
            },
            slices: slices
                .into_iter()
                .enumerate()
                .map(|(index, image)| PageSlice {
                    index,
                    offset_mm: offsets[index],
                    height_mm: 10.0,
                    image,
                })
                .collect(),
        }
    }

    #[test]
    fn one_page_per_slice() {
        let img = RgbaImage::from_pixel(64, 32, Rgba([20, 40, 200, 255]));
        let seq = sequence(vec![Some(img.clone()), Some(img), None]);
        let pdf = DocumentAssembler::new(PageGeometry::A4, "Resume")
            .assemble(&seq)
            .unwrap();
        assert_eq!(pdf.pages, 3);
        assert_eq!(&pdf.bytes[0..5], b"%PDF-");
    }

    #[test]
    fn empty_sequence_still_has_a_page() {
        let seq = sequence(Vec::new());
        let pdf = DocumentAssembler::new(PageGeometry::A4, "Resume")
            .assemble(&seq)
            .unwrap();
        assert_eq!(pdf.pages, 1);
        assert!(pdf.bytes.len() > 100);
    }
}
