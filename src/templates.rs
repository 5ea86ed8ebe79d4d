//! Sample résumé documents for tests and demos.
//!
//! Every document wraps the résumé in the `#resume-preview` element the
//! export looks for, the way the editor's preview panel does.

/// Root id used by every sample.
pub const PREVIEW_ID: &str = "resume-preview";

const HEAD: &str = r##"<head>
    <meta charset="utf-8">
    <title>Resume</title>
    <style>
        body { font-family: Helvetica, Arial, sans-serif; color: #1f2937; }
        .resume-section { margin-bottom: 16px; }
        .section-title { font-size: 18px; font-weight: bold; border-bottom: 1px solid #d1d5db; margin-bottom: 8px; }
        .preview-panel { max-height: 640px; overflow: hidden; }
    </style>
</head>"##;

const BASIC_SECTIONS: &str = r##"
        <div class="resume-section">
            <h1 class="text-3xl font-bold">Ada Lovelace</h1>
            <p class="text-sm text-gray-600">London · ada@example.com · analytical-engine.dev</p>
        </div>

        <div class="resume-section">
            <h2 class="section-title">Summary</h2>
            <p class="text-sm">
                Mathematician with a focus on mechanical computation and the
                <span class="font-bold">first published algorithm</span> intended
                for a general-purpose machine.
            </p>
        </div>

        <div class="resume-section">
            <h2 class="section-title">Experience</h2>
            <div class="project-item mb-2">
                <p class="font-bold">Analyst, Analytical Engine</p>
                <ul class="list-disc">
                    <li>Translated and annotated Menabrea's memoir</li>
                    <li>Described a method for computing Bernoulli numbers</li>
                </ul>
            </div>
        </div>

        <div class="resume-section">
            <h2 class="section-title">Skills</h2>
            <div class="flex gap-2">
                <span class="bg-blue-100 text-blue-800 px-2">Mathematics</span>
                <span class="bg-blue-100 text-blue-800 px-2">Algorithms</span>
                <span class="bg-blue-100 text-blue-800 px-2">Technical writing</span>
            </div>
        </div>
"##;

/// A one-page résumé inside a clipped, scaled preview panel.
pub fn resume_document() -> String {
    format!(
        r##"<!DOCTYPE html>
<html>
{HEAD}
<body>
    <div class="preview-panel">
        <div id="{PREVIEW_ID}" class="p-6" style="transform: scale(0.8); width: 500px">
{BASIC_SECTIONS}
        </div>
    </div>
</body>
</html>"##
    )
}

/// A résumé long enough to need several pages: `projects` project entries
/// after the basic sections.
pub fn long_resume_document(projects: usize) -> String {
    let mut items = String::new();
    for n in 1..=projects {
        items.push_str(&format!(
            r##"
            <div class="project-item mb-4">
                <p class="font-bold">Project {n}</p>
                <p class="text-sm">
                    Designed and delivered subsystem {n}, coordinating with three
                    teams and documenting every interface along the way.
                </p>
                <ul class="list-disc">
                    <li>Reduced build times for component {n}</li>
                    <li>Wrote the operations guide for release {n}</li>
                </ul>
            </div>"##
        ));
    }
    format!(
        r##"<!DOCTYPE html>
<html>
{HEAD}
<body>
    <div id="{PREVIEW_ID}" class="p-6">
{BASIC_SECTIONS}
        <div class="project-section">
            <h2 class="section-title">Projects</h2>
{items}
        </div>
    </div>
</body>
</html>"##
    )
}

/// A preview whose only content is a block `height_px` CSS pixels tall.
pub fn block_document(height_px: f32) -> String {
    format!(
        r##"<html><body><div id="{PREVIEW_ID}"><div style="height: {height_px}px"></div></div></body></html>"##
    )
}

/// The basic résumé plus a `<link rel="stylesheet">` pointing at `href`.
pub fn document_with_stylesheet(href: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html>
<head>
    <link rel="stylesheet" href="{href}">
    <style>.section-title {{ font-weight: bold; }}</style>
</head>
<body>
    <div id="{PREVIEW_ID}">
{BASIC_SECTIONS}
    </div>
</body>
</html>"##
    )
}

/// A document without a preview element.
pub fn document_without_preview() -> &'static str {
    r#"<html><body><div id="editor"><p>Nothing to export</p></div></body></html>"#
}
