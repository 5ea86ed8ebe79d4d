//! LayoutNormalizer – the override stylesheet applied only while exporting.
//!
//! The live page's stylesheets are never edited. Instead the export gets an
//! extra sheet of `!important` rules that pin the root's dimensions, turn
//! off scrolling and clipping, force exact colours, keep résumé sections in
//! one piece, and restate the utility classes the templates rely on so that
//! a page captured without its build-time CSS still looks right.

use std::fmt::Write as _;

use crate::geometry::PageGeometry;

/// Classes that mark a résumé section or item that should not be split
/// across pages.
pub const SECTION_CLASSES: &[&str] = &[
    "resume-section",
    "project-section",
    "custom-section",
    "project-item",
    "custom-item",
];

/// Spacing scale: utility suffix → rem.
const SPACING: &[(&str, f32)] = &[
    ("0", 0.0),
    ("1", 0.25),
    ("2", 0.5),
    ("3", 0.75),
    ("4", 1.0),
    ("5", 1.25),
    ("6", 1.5),
    ("8", 2.0),
    ("10", 2.5),
    ("12", 3.0),
];

/// Spacing utilities in cascade order: shorthands before single sides.
const SPACING_UTILITIES: &[(&str, &[&str])] = &[
    ("p", &["padding"]),
    ("px", &["padding-left", "padding-right"]),
    ("py", &["padding-top", "padding-bottom"]),
    ("pt", &["padding-top"]),
    ("pr", &["padding-right"]),
    ("pb", &["padding-bottom"]),
    ("pl", &["padding-left"]),
    ("m", &["margin"]),
    ("mx", &["margin-left", "margin-right"]),
    ("my", &["margin-top", "margin-bottom"]),
    ("mt", &["margin-top"]),
    ("mr", &["margin-right"]),
    ("mb", &["margin-bottom"]),
    ("ml", &["margin-left"]),
    ("gap", &["gap"]),
    ("gap-x", &["column-gap"]),
    ("gap-y", &["row-gap"]),
];

/// Colour palette: name → hex.
const PALETTE: &[(&str, &str)] = &[
    ("white", "#ffffff"),
    ("black", "#000000"),
    ("gray-50", "#f9fafb"),
    ("gray-100", "#f3f4f6"),
    ("gray-200", "#e5e7eb"),
    ("gray-300", "#d1d5db"),
    ("gray-400", "#9ca3af"),
    ("gray-500", "#6b7280"),
    ("gray-600", "#4b5563"),
    ("gray-700", "#374151"),
    ("gray-800", "#1f2937"),
    ("gray-900", "#111827"),
    ("blue-100", "#dbeafe"),
    ("blue-600", "#2563eb"),
    ("blue-800", "#1e40af"),
    ("green-100", "#dcfce7"),
    ("green-600", "#16a34a"),
    ("green-800", "#166534"),
    ("purple-100", "#f3e8ff"),
    ("purple-600", "#9333ea"),
    ("red-600", "#dc2626"),
    ("yellow-100", "#fef3c7"),
    ("yellow-800", "#92400e"),
];

/// Font sizes: suffix → (font-size rem, line-height rem).
const FONT_SIZES: &[(&str, f32, f32)] = &[
    ("xs", 0.75, 1.0),
    ("sm", 0.875, 1.25),
    ("base", 1.0, 1.5),
    ("lg", 1.125, 1.75),
    ("xl", 1.25, 1.75),
    ("2xl", 1.5, 2.0),
    ("3xl", 1.875, 2.25),
    ("4xl", 2.25, 2.5),
];

const FONT_WEIGHTS: &[(&str, u32)] = &[
    ("thin", 100),
    ("extralight", 200),
    ("light", 300),
    ("normal", 400),
    ("medium", 500),
    ("semibold", 600),
    ("bold", 700),
    ("extrabold", 800),
    ("black", 900),
];

/// Layout, border and text helpers that are not generated from a scale.
const FIXED_UTILITIES: &[(&str, &str)] = &[
    ("block", "display: block"),
    ("inline-block", "display: inline-block"),
    ("flex", "display: flex"),
    ("grid", "display: grid"),
    ("hidden", "display: none"),
    ("flex-row", "flex-direction: row"),
    ("flex-col", "flex-direction: column"),
    ("flex-wrap", "flex-wrap: wrap"),
    ("flex-1", "flex: 1 1 0%"),
    ("flex-shrink-0", "flex-shrink: 0"),
    ("items-start", "align-items: flex-start"),
    ("items-center", "align-items: center"),
    ("items-end", "align-items: flex-end"),
    ("justify-start", "justify-content: flex-start"),
    ("justify-center", "justify-content: center"),
    ("justify-end", "justify-content: flex-end"),
    ("justify-between", "justify-content: space-between"),
    ("grid-cols-1", "grid-template-columns: repeat(1, minmax(0, 1fr))"),
    ("grid-cols-2", "grid-template-columns: repeat(2, minmax(0, 1fr))"),
    ("grid-cols-3", "grid-template-columns: repeat(3, minmax(0, 1fr))"),
    ("grid-cols-4", "grid-template-columns: repeat(4, minmax(0, 1fr))"),
    ("w-full", "width: 100%"),
    ("w-1\\/2", "width: 50%"),
    ("w-1\\/3", "width: 33.333333%"),
    ("w-2\\/3", "width: 66.666667%"),
    ("w-20", "width: 5rem"),
    ("w-32", "width: 8rem"),
    ("w-40", "width: 10rem"),
    ("h-20", "height: 5rem"),
    ("max-w-2xl", "max-width: 42rem"),
    ("max-w-4xl", "max-width: 56rem"),
    ("border", "border-width: 1px; border-style: solid"),
    ("border-2", "border-width: 2px; border-style: solid"),
    ("border-t", "border-top-width: 1px"),
    ("border-b", "border-bottom-width: 1px"),
    ("border-b-2", "border-bottom-width: 2px"),
    ("border-l-2", "border-left-width: 2px"),
    ("border-l-4", "border-left-width: 4px"),
    ("text-left", "text-align: left"),
    ("text-center", "text-align: center"),
    ("text-right", "text-align: right"),
    ("italic", "font-style: italic"),
    ("underline", "text-decoration: underline"),
    ("leading-tight", "line-height: 1.25"),
    ("leading-normal", "line-height: 1.5"),
    ("leading-relaxed", "line-height: 1.625"),
    ("list-disc", "list-style-type: disc"),
    ("list-decimal", "list-style-type: decimal"),
    ("list-none", "list-style-type: none"),
];

/// Builds the export-only stylesheets for one export root and page geometry.
#[derive(Debug, Clone)]
pub struct LayoutNormalizer {
    geometry: PageGeometry,
    root_id: String,
}

impl LayoutNormalizer {
    pub fn new(geometry: PageGeometry, root_id: impl Into<String>) -> Self {
        Self {
            geometry,
            root_id: root_id.into(),
        }
    }

    /// Inline declarations appended to the root's `style` attribute during
    /// capture.
    pub fn capture_overrides(&self) -> String {
        format!(
            "position: relative; left: 0; top: 0; width: {:.2}px; height: auto; transform: none; overflow: visible",
            self.geometry.content_width_css_px()
        )
    }

    /// The root's original inline style followed by the capture overrides.
    pub fn capture_style(&self, original: Option<&str>) -> String {
        match original.map(str::trim).filter(|s| !s.is_empty()) {
            Some(orig) => format!(
                "{}; {}",
                orig.trim_end_matches(';'),
                self.capture_overrides()
            ),
            None => self.capture_overrides(),
        }
    }

    /// The full override sheet used by the in-process rasterizer.
    pub fn override_css(&self) -> String {
        let mut css = String::new();
        self.write_unclipped(&mut css);
        write_exact_colors(&mut css);
        write_sections(&mut css);

        // Typography
        for (name, size, leading) in FONT_SIZES {
            rule(
                &mut css,
                &format!(".text-{name}"),
                &format!("font-size: {size}rem; line-height: {leading}rem"),
            );
        }
        for (name, weight) in FONT_WEIGHTS {
            rule(&mut css, &format!(".font-{name}"), &format!("font-weight: {weight}"));
        }

        // Spacing
        for (prefix, properties) in SPACING_UTILITIES {
            for (suffix, rem) in SPACING {
                let decls: Vec<String> = properties
                    .iter()
                    .map(|p| format!("{p}: {rem}rem"))
                    .collect();
                rule(&mut css, &format!(".{prefix}-{suffix}"), &decls.join("; "));
            }
        }
        for (suffix, rem) in SPACING {
            rule(
                &mut css,
                &format!(".space-y-{suffix} > * + *"),
                &format!("margin-top: {rem}rem"),
            );
            rule(
                &mut css,
                &format!(".space-x-{suffix} > * + *"),
                &format!("margin-left: {rem}rem"),
            );
        }

        // Colour
        for (name, hex) in PALETTE {
            rule(&mut css, &format!(".text-{name}"), &format!("color: {hex}"));
            rule(&mut css, &format!(".bg-{name}"), &format!("background-color: {hex}"));
            rule(&mut css, &format!(".border-{name}"), &format!("border-color: {hex}"));
        }

        for (class, decls) in FIXED_UTILITIES {
            rule(&mut css, &format!(".{class}"), decls);
        }

        // Lists and links
        rule(&mut css, "ul, ol", "padding-left: 1.5rem; margin-bottom: 1rem");
        rule(&mut css, "li", "margin-bottom: 0.5rem; line-height: 1.6");
        rule(&mut css, "a", "color: #000000; text-decoration: none");
        css
    }

    /// The reduced sheet sent along with HTML to the remote renderer, which
    /// paginates by itself.
    pub fn remote_override_css(&self) -> String {
        let g = &self.geometry;
        let mut css = format!(
            "@page {{ size: {}mm {}mm; margin: {}mm; }}\n",
            g.page_width_mm, g.page_height_mm, g.margin_mm
        );
        self.write_unclipped(&mut css);
        rule(&mut css, "html, body", "margin: 0");
        write_exact_colors(&mut css);
        write_sections(&mut css);
        css
    }

    fn write_unclipped(&self, css: &mut String) {
        rule(
            css,
            &format!("#{}, html, body", self.root_id),
            "overflow: visible; height: auto; max-height: none",
        );
        // Nested scroll containers keep their own height but stop clipping.
        rule(
            css,
            &format!("#{} *", self.root_id),
            "overflow: visible; max-height: none",
        );
    }
}

fn write_exact_colors(css: &mut String) {
    rule(
        css,
        "*",
        "print-color-adjust: exact; -webkit-print-color-adjust: exact",
    );
}

fn write_sections(css: &mut String) {
    let selector = SECTION_CLASSES
        .iter()
        .map(|c| format!(".{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    rule(
        css,
        &selector,
        "break-inside: avoid; page-break-inside: avoid",
    );
}

/// Append `selector { decl !important; ... }`.
fn rule(css: &mut String, selector: &str, declarations: &str) {
    let body = declarations
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| format!("{d} !important;"))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(css, "{selector} {{ {body} }}");
}
