//! StyleInliner – captures every stylesheet the live page uses as one CSS
//! string, so the export can be styled outside the page context.

use std::sync::Arc;

use log::{debug, warn};

use crate::dom::{Document, StyleSource};
use crate::resources::ResourceLoader;

/// The page's CSS at one point in time, one fragment per `<link>` or
/// `<style>` in document order. Built fresh for each export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSnapshot {
    pub fragments: Vec<String>,
    /// `href`s that could not be fetched.
    pub skipped: Vec<String>,
}

impl StyleSnapshot {
    /// All fragments concatenated in document order.
    pub fn to_css(&self) -> String {
        self.fragments.join("\n")
    }
}

pub struct StyleInliner {
    loader: Arc<dyn ResourceLoader>,
}

impl StyleInliner {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self { loader }
    }

    /// Collect the text of every stylesheet link and style block. A link that
    /// fails to load is logged and recorded in `skipped`; it never fails the
    /// snapshot.
    pub async fn snapshot(&self, doc: &Document) -> StyleSnapshot {
        let mut snapshot = StyleSnapshot::default();
        for source in doc.style_sources() {
            match source {
                StyleSource::Inline(css) => snapshot.fragments.push(css),
                StyleSource::Link(href) => match self.loader.fetch_text(&href).await {
                    Ok(css) => {
                        debug!("Inlined stylesheet {href} ({} bytes)", css.len());
                        snapshot.fragments.push(css);
                    }
                    Err(e) => {
                        warn!("Skipping stylesheet {href}: {e}");
                        snapshot.skipped.push(href);
                    }
                },
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::LoadError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapLoader(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl ResourceLoader for MapLoader {
        async fn fetch_bytes(&self, reference: &str) -> Result<Vec<u8>, LoadError> {
            self.0
                .get(reference)
                .map(|s| s.as_bytes().to_vec())
                .ok_or(LoadError::Status(404))
        }
    }

    #[tokio::test]
    async fn fragments_in_document_order_and_missing_links_skipped() {
        let doc = Document::parse(
            r#"<html><head>
            <link rel="stylesheet" href="/a.css">
            <style>.inline{}</style>
            <link rel="stylesheet" href="/gone.css">
            </head><body><style>.late{}</style></body></html>"#,
        );
        let loader = MapLoader(HashMap::from([("/a.css", ".a{}")]));
        let snapshot = StyleInliner::new(Arc::new(loader)).snapshot(&doc).await;
        assert_eq!(snapshot.fragments, vec![".a{}", ".inline{}", ".late{}"]);
        assert_eq!(snapshot.skipped, vec!["/gone.css".to_string()]);
        assert_eq!(snapshot.to_css(), ".a{}\n.inline{}\n.late{}");
    }

    #[tokio::test]
    async fn no_stylesheets_gives_empty_snapshot() {
        let doc = Document::parse("<div>plain</div>");
        let snapshot = StyleInliner::new(Arc::new(MapLoader(HashMap::new())))
            .snapshot(&doc)
            .await;
        assert!(snapshot.fragments.is_empty());
        assert_eq!(snapshot.to_css(), "");
    }
}
