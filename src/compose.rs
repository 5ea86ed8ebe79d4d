//! Stand-alone HTML documents built from the live page, for renderers that
//! work outside it: the remote render service and the print-dialog export.

use crate::dom::{escape_text, Document};
use crate::error::{ExportError, Result};
use crate::inline::StyleSnapshot;
use crate::normalize::LayoutNormalizer;

const PRINT_SCRIPT: &str = r#"<script>
window.onload = function () {
  window.print();
  setTimeout(function () { window.close(); }, 1000);
};
</script>"#;

/// The export root with the page's head, every captured stylesheet and the
/// remote overrides inlined, ready to be loaded by a headless browser.
pub fn compose_export_html(
    doc: &Document,
    root_id: &str,
    snapshot: &StyleSnapshot,
    normalizer: &LayoutNormalizer,
) -> Result<String> {
    let root = doc
        .find_by_id(root_id)
        .ok_or_else(|| ExportError::RootNotFound(root_id.to_string()))?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1" />
{head}
<style>
{css}
{overrides}
h1, h2, h3, h4, h5, h6 {{ page-break-after: avoid !important; }}
</style>
</head>
<body style="background:transparent; margin:0; padding:0;">
{body}
</body>
</html>"#,
        head = doc.head_html(),
        css = snapshot.to_css(),
        overrides = normalizer.remote_override_css(),
        body = root.outer_html(),
    ))
}

/// A print-ready document that opens the browser's print dialog on load.
pub fn compose_print_html(
    doc: &Document,
    root_id: &str,
    title: &str,
    snapshot: &StyleSnapshot,
    normalizer: &LayoutNormalizer,
) -> Result<String> {
    let root = doc
        .find_by_id(root_id)
        .ok_or_else(|| ExportError::RootNotFound(root_id.to_string()))?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>{title}</title>
<style>
{css}
{overrides}
@media print {{
  #{root_id} {{ box-shadow: none !important; border: none !important; margin: 0 !important; }}
}}
</style>
</head>
<body>
{body}
{script}
</body>
</html>"#,
        title = escape_text(title),
        css = snapshot.to_css(),
        overrides = normalizer.remote_override_css(),
        body = root.outer_html(),
        script = PRINT_SCRIPT,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageGeometry;

    const PAGE: &str = r#"<html><head><title>Editor</title></head>
        <body><nav>menu</nav><div id="resume-preview" class="p-4"><h1>Ada</h1></div></body></html>"#;

    fn normalizer() -> LayoutNormalizer {
        LayoutNormalizer::new(PageGeometry::A4, "resume-preview")
    }

    #[test]
    fn export_html_inlines_styles_and_keeps_only_the_root() {
        let doc = Document::parse(PAGE);
        let snapshot = StyleSnapshot {
            fragments: vec![".p-4 { padding: 1rem }".into()],
            skipped: Vec::new(),
        };
        let html = compose_export_html(&doc, "resume-preview", &snapshot, &normalizer()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Editor</title>"));
        assert!(html.contains(".p-4 { padding: 1rem }"));
        assert!(html.contains("@page { size: 210mm 297mm; margin: 20mm; }"));
        assert!(html.contains(r#"<div id="resume-preview" class="p-4"><h1>Ada</h1></div>"#));
        assert!(!html.contains("<nav>"));
    }

    #[test]
    fn print_html_escapes_title_and_prints_on_load() {
        let doc = Document::parse(PAGE);
        let html = compose_print_html(
            &doc,
            "resume-preview",
            "Ada <CV>",
            &StyleSnapshot::default(),
            &normalizer(),
        )
        .unwrap();
        assert!(html.contains("<title>Ada &lt;CV&gt;</title>"));
        assert!(html.contains("window.print()"));
    }

    #[test]
    fn missing_root() {
        let doc = Document::parse("<p>nothing</p>");
        let err = compose_export_html(&doc, "resume-preview", &StyleSnapshot::default(), &normalizer())
            .unwrap_err();
        assert!(matches!(err, ExportError::RootNotFound(_)));
    }
}
