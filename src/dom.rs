//! HTML parser – converts a résumé page into a small DOM tree that can be
//! queried, mutated in a scoped way, and serialised back to HTML.
//!
//! We support the subset of HTML that résumé templates produce:
//! - Structural: div, section, header, footer, article, p, h1-h6, ul, ol, li,
//!   table, tr, td, th, img, br, hr
//! - Inline: span, a, strong, b, em, i
//! - Document: html, head, body, link, style, script, meta, title
//!
//! `<style>` and `<script>` bodies are kept verbatim (raw text elements).

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    Section,
    Header,
    Footer,
    Article,
    P,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Ul,
    Ol,
    Li,
    Table,
    Tr,
    Td,
    Th,
    Span,
    A,
    Strong,
    B,
    Em,
    I,
    Img,
    Br,
    Hr,
    Body,
    Html,
    Head,
    Link,
    Style,
    Script,
    Meta,
    Title,
    /// Any other tag – laid out like a div.
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" => Tag::Div,
            "section" => Tag::Section,
            "header" => Tag::Header,
            "footer" => Tag::Footer,
            "article" => Tag::Article,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "h5" => Tag::H5,
            "h6" => Tag::H6,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" => Tag::Span,
            "a" => Tag::A,
            "strong" => Tag::Strong,
            "b" => Tag::B,
            "em" => Tag::Em,
            "i" => Tag::I,
            "img" => Tag::Img,
            "br" => Tag::Br,
            "hr" => Tag::Hr,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            "link" => Tag::Link,
            "style" => Tag::Style,
            "script" => Tag::Script,
            "meta" => Tag::Meta,
            "title" => Tag::Title,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lower-case tag name, as used by type selectors and serialisation.
    pub fn name(&self) -> &str {
        match self {
            Tag::Div => "div",
            Tag::Section => "section",
            Tag::Header => "header",
            Tag::Footer => "footer",
            Tag::Article => "article",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::H5 => "h5",
            Tag::H6 => "h6",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Span => "span",
            Tag::A => "a",
            Tag::Strong => "strong",
            Tag::B => "b",
            Tag::Em => "em",
            Tag::I => "i",
            Tag::Img => "img",
            Tag::Br => "br",
            Tag::Hr => "hr",
            Tag::Body => "body",
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Link => "link",
            Tag::Style => "style",
            Tag::Script => "script",
            Tag::Meta => "meta",
            Tag::Title => "title",
            Tag::Unknown(name) => name,
        }
    }

    /// Elements that never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::Img | Tag::Br | Tag::Hr | Tag::Link | Tag::Meta)
            || matches!(self, Tag::Unknown(n) if n == "input")
    }

    /// Elements whose body is raw text rather than markup.
    pub fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style | Tag::Script)
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Tag::Span | Tag::A | Tag::Strong | Tag::B | Tag::Em | Tag::I | Tag::Br
        )
    }

    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 | Tag::H5 | Tag::H6
        )
    }

    pub fn is_table_part(&self) -> bool {
        matches!(self, Tag::Table | Tag::Tr | Tag::Td | Tag::Th)
    }

    /// Metadata elements that never render.
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            Tag::Head | Tag::Link | Tag::Style | Tag::Script | Tag::Meta | Tag::Title
        )
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes (in source order), and children.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its original position when it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attributes
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| *c == class)
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                DomNode::Text(t) => out.push_str(t),
                DomNode::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }

    /// Serialise this element, its attributes and its subtree.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        if self.tag.is_raw_text() {
            out.push_str(&self.text_content());
        } else {
            for child in &self.children {
                write_node(child, &mut out);
            }
        }
        out
    }
}

/// An element together with its previous element sibling; the unit selector
/// matching walks over.
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    pub element: &'a ElementNode,
    pub prev_sibling: Option<&'a ElementNode>,
}

/// A stylesheet reference found in the document, in DOM order.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleSource {
    /// `<link rel="stylesheet" href="...">`
    Link(String),
    /// Body of an inline `<style>` block.
    Inline(String),
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A parsed HTML page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub nodes: Vec<DomNode>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            nodes: parse_html(html),
        }
    }

    /// Index path (child positions from the top level) to the first element
    /// carrying `id`.
    pub fn path_to_id(&self, id: &str) -> Option<Vec<usize>> {
        fn walk(nodes: &[DomNode], id: &str, path: &mut Vec<usize>) -> bool {
            for (i, node) in nodes.iter().enumerate() {
                if let DomNode::Element(e) = node {
                    path.push(i);
                    if e.id() == Some(id) || walk(&e.children, id, path) {
                        return true;
                    }
                    path.pop();
                }
            }
            false
        }
        let mut path = Vec::new();
        walk(&self.nodes, id, &mut path).then_some(path)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&ElementNode> {
        let path = self.path_to_id(id)?;
        self.element_at(&path)
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&ElementNode> {
        let (first, rest) = path.split_first()?;
        let mut current = match self.nodes.get(*first)? {
            DomNode::Element(e) => e,
            DomNode::Text(_) => return None,
        };
        for idx in rest {
            current = match current.children.get(*idx)? {
                DomNode::Element(e) => e,
                DomNode::Text(_) => return None,
            };
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut ElementNode> {
        let (first, rest) = path.split_first()?;
        let mut current = match self.nodes.get_mut(*first)? {
            DomNode::Element(e) => e,
            DomNode::Text(_) => return None,
        };
        for idx in rest {
            current = match current.children.get_mut(*idx)? {
                DomNode::Element(e) => e,
                DomNode::Text(_) => return None,
            };
        }
        Some(current)
    }

    /// The chain of elements from the top level down to (and including) the
    /// element at `path`, each with its previous element sibling.
    pub fn ancestry(&self, path: &[usize]) -> Option<Vec<ElementRef<'_>>> {
        let mut chain = Vec::with_capacity(path.len());
        let mut siblings: &[DomNode] = &self.nodes;
        for &idx in path {
            let element = match siblings.get(idx)? {
                DomNode::Element(e) => e,
                DomNode::Text(_) => return None,
            };
            chain.push(ElementRef {
                element,
                prev_sibling: previous_element(siblings, idx),
            });
            siblings = &element.children;
        }
        Some(chain)
    }

    /// Every stylesheet link and inline style block, in document order.
    pub fn style_sources(&self) -> Vec<StyleSource> {
        fn walk(nodes: &[DomNode], out: &mut Vec<StyleSource>) {
            for node in nodes {
                if let DomNode::Element(e) = node {
                    match e.tag {
                        Tag::Link => {
                            let is_sheet = e
                                .attr("rel")
                                .map(|r| {
                                    r.split_whitespace()
                                        .any(|t| t.eq_ignore_ascii_case("stylesheet"))
                                })
                                .unwrap_or(false);
                            if let (true, Some(href)) = (is_sheet, e.attr("href")) {
                                out.push(StyleSource::Link(href.to_string()));
                            }
                        }
                        Tag::Style => out.push(StyleSource::Inline(e.text_content())),
                        _ => walk(&e.children, out),
                    }
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    /// Serialised children of `<head>`, or an empty string.
    pub fn head_html(&self) -> String {
        fn find_head(nodes: &[DomNode]) -> Option<&ElementNode> {
            for node in nodes {
                if let DomNode::Element(e) = node {
                    if e.tag == Tag::Head {
                        return Some(e);
                    }
                    if e.tag == Tag::Html {
                        if let Some(h) = find_head(&e.children) {
                            return Some(h);
                        }
                    }
                }
            }
            None
        }
        find_head(&self.nodes)
            .map(|h| h.inner_html())
            .unwrap_or_default()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, &mut out);
        }
        out
    }
}

fn previous_element(siblings: &[DomNode], idx: usize) -> Option<&ElementNode> {
    siblings[..idx].iter().rev().find_map(|n| match n {
        DomNode::Element(e) => Some(e),
        DomNode::Text(_) => None,
    })
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    let mut nodes = Vec::new();
    loop {
        nodes.extend(parser.parse_nodes());
        if parser.eof() {
            break;
        }
        // A closing tag nobody opened: drop it and carry on.
        parser.skip_closing_tag();
    }
    nodes
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Names of the currently open elements, outermost first.
    open: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            open: Vec::new(),
        }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_preserve();
            if self.eof() {
                break;
            }
            if self.starts_with("</") {
                let name = self.peek_closing_name();
                if self.open.iter().any(|o| *o == name) {
                    break;
                }
                self.skip_closing_tag();
                continue;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Skip doctype / processing instructions
            while !self.eof() && !self.starts_with(">") {
                self.advance(1);
            }
            if !self.eof() {
                self.advance(1);
            }
            return None;
        }
        if self.starts_with("<") && self.next_is_tag_start() {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A lone '<' that does not open a tag is literal text.
        if self.starts_with("<") {
            self.advance(1);
        }
        while !self.eof() && !(self.starts_with("<") && self.next_is_tag_start()) {
            self.advance(1);
        }
        let text = &self.input[start..self.pos];
        DomNode::Text(decode_entities(text))
    }

    fn parse_element(&mut self) -> DomNode {
        // Consume '<'
        self.advance(1);
        let tag_name = self.parse_tag_name();
        let tag = Tag::from_name(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            if key.is_empty() {
                // Unparseable attribute byte; skip it to guarantee progress.
                self.advance(1);
                continue;
            }
            elem.attributes.push((key, value));
        }

        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if tag.is_void() {
            return DomNode::Element(elem);
        }

        if tag.is_raw_text() {
            let close = format!("</{}", tag.name());
            let start = self.pos;
            let rest = &self.input[start..];
            let end = rest
                .to_ascii_lowercase()
                .find(&close)
                .map(|i| start + i)
                .unwrap_or(self.input.len());
            let body = &self.input[start..end];
            if !body.is_empty() {
                elem.children.push(DomNode::Text(body.to_string()));
            }
            self.pos = end;
            self.skip_closing_tag();
            return DomNode::Element(elem);
        }

        let own_name = tag.name().to_string();
        self.open.push(own_name.clone());
        elem.children = self.parse_nodes();
        self.open.pop();

        // Consume our closing tag; a closing tag for an ancestor implicitly
        // closes us and is left for the ancestor.
        if self.starts_with("</") && self.peek_closing_name() == own_name {
            self.skip_closing_tag();
        }

        DomNode::Element(elem)
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn peek_closing_name(&self) -> String {
        let rest = &self.input[self.pos + 2..];
        rest.chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == ':')
            .collect::<String>()
            .to_ascii_lowercase()
    }

    fn skip_closing_tag(&mut self) {
        while !self.eof() && !self.starts_with(">") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(1);
        }
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_tag_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1); // skip '='
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = self.input[start..self.pos].to_string();
                if !self.eof() {
                    self.advance(1);
                }
                return decode_entities(&val);
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            if c == '/' && self.input[self.pos..].starts_with("/>") {
                break;
            }
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn next_is_tag_start(&self) -> bool {
        self.input[self.pos..]
            .chars()
            .nth(1)
            .map(|c| c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?')
            .unwrap_or(false)
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    fn skip_whitespace_preserve(&mut self) {
        // Skip runs of pure whitespace between elements.
        let saved = self.pos;
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
        // If we reached a tag or EOF, keep the skip. Otherwise revert.
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_comment(&mut self) {
        self.advance(4); // skip <!--
        while !self.eof() && !self.starts_with("-->") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(3);
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{00A0}")
        .replace("&amp;", "&")
}

// ---------------------------------------------------------------------------
// Serialisation
// ---------------------------------------------------------------------------

fn write_node(node: &DomNode, out: &mut String) {
    match node {
        DomNode::Text(t) => out.push_str(&escape_text(t)),
        DomNode::Element(e) => write_element(e, out),
    }
}

fn write_element(e: &ElementNode, out: &mut String) {
    out.push('<');
    out.push_str(e.tag.name());
    for (k, v) in &e.attributes {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(&escape_attr(v));
        out.push('"');
    }
    out.push('>');
    if e.tag.is_void() {
        return;
    }
    out.push_str(&e.inner_html());
    out.push_str("</");
    out.push_str(e.tag.name());
    out.push('>');
}

pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_div() {
        let html = r#"<div class="flex p-4"><p>Hello</p></div>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 1);
        if let DomNode::Element(e) = &nodes[0] {
            assert_eq!(e.tag, Tag::Div);
            assert_eq!(e.classes(), vec!["flex", "p-4"]);
            assert_eq!(e.children.len(), 1);
        } else {
            panic!("Expected element");
        }
    }

    #[test]
    fn void_elements_do_not_swallow_siblings() {
        let html = r#"<head><link rel="stylesheet" href="/a.css"><meta charset="utf-8"></head><p>x</p>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 2);
        if let DomNode::Element(head) = &nodes[0] {
            assert_eq!(head.children.len(), 2);
        } else {
            panic!("Expected head");
        }
    }

    #[test]
    fn style_body_is_raw_text() {
        let html = "<style>.a > .b { color: #000 } p::after { content: '<x>' }</style><p>after</p>";
        let doc = Document::parse(html);
        let sources = doc.style_sources();
        assert_eq!(sources.len(), 1);
        match &sources[0] {
            StyleSource::Inline(css) => assert!(css.contains(".a > .b")),
            other => panic!("unexpected source {other:?}"),
        }
        assert_eq!(doc.nodes.len(), 2);
    }

    #[test]
    fn style_sources_keep_document_order() {
        let html = r#"<html><head>
            <style>a{}</style>
            <link rel="stylesheet" href="/main.css">
            <link rel="icon" href="/favicon.ico">
            </head><body><style>b{}</style></body></html>"#;
        let doc = Document::parse(html);
        assert_eq!(
            doc.style_sources(),
            vec![
                StyleSource::Inline("a{}".into()),
                StyleSource::Link("/main.css".into()),
                StyleSource::Inline("b{}".into()),
            ]
        );
    }

    #[test]
    fn find_by_id_and_ancestry() {
        let html = r#"<body><div class="wrap"><h1>Name</h1><div id="resume-preview"><p>x</p></div></div></body>"#;
        let doc = Document::parse(html);
        let path = doc.path_to_id("resume-preview").expect("root");
        let chain = doc.ancestry(&path).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[1].element.classes(), vec!["wrap"]);
        assert_eq!(chain[2].prev_sibling.map(|e| e.tag.clone()), Some(Tag::H1));
        assert!(doc.find_by_id("missing").is_none());
    }

    #[test]
    fn stray_closing_tag_is_ignored() {
        let doc = Document::parse("<div><p>a</span></p><p>b</p></div>");
        let div = match &doc.nodes[0] {
            DomNode::Element(e) => e,
            _ => panic!("Expected div"),
        };
        assert_eq!(div.children.len(), 2);
        assert_eq!(div.text_content(), "ab");
    }

    #[test]
    fn serialisation_round_trips_attributes_in_order() {
        let html = r#"<div id="r" style="width: 10px" class="a">x &amp; y<br></div>"#;
        let doc = Document::parse(html);
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn set_and_remove_attributes() {
        let mut e = ElementNode::new(Tag::Div);
        e.set_attr("style", "a: b");
        e.set_attr("class", "c");
        e.set_attr("style", "x: y");
        assert_eq!(e.attributes[0], ("style".to_string(), "x: y".to_string()));
        assert_eq!(e.remove_attr("style").as_deref(), Some("x: y"));
        assert!(e.inline_style().is_none());
    }
}
