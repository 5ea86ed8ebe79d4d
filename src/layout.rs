//! Layout engine – uses Taffy to compute flexbox / grid layout from a styled
//! DOM tree, then converts the result into a tree of positioned boxes.
//!
//! Text is line-broken at build time against an estimated available width.
//! Consecutive inline children of a block (text, spans, links, `<br>`) are
//! merged into one text leaf so mixed bold/italic runs flow on shared lines.

use std::collections::HashMap;
use taffy::prelude::*;

use crate::dom::Tag;
use crate::error::{ExportError, Result};
use crate::fonts::FontManager;
use crate::resources::ImageCache;
use crate::style::{self, ComputedStyle, FontStyle as CssFontStyle, FontWeight, ListStyle, StyledNode};

// ---------------------------------------------------------------------------
// Positioned box tree
// ---------------------------------------------------------------------------

/// A positioned box in capture coordinates (CSS px, export root at 0,0).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    /// List marker painted in the left gutter (`•`, `3.`).
    pub marker: Option<String>,
    pub children: Vec<PositionedBox>,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text { lines: Vec<TextLine> },
    Image { src: String },
}

/// One laid-out line of a text leaf. Offsets are relative to the leaf.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Distance from the line top to the baseline.
    pub baseline: f32,
    pub fragments: Vec<TextFragment>,
}

/// A run of same-styled text on one line; `x` is relative to the line.
#[derive(Debug, Clone)]
pub struct TextFragment {
    pub text: String,
    pub x: f32,
    pub width: f32,
    pub style: ComputedStyle,
}

impl PositionedBox {
    /// Vertical `(top, bottom)` spans of every avoid-split box, document order.
    pub fn avoid_split_spans(&self) -> Vec<(f32, f32)> {
        let mut out = Vec::new();
        self.collect_avoid_split(&mut out);
        out
    }

    fn collect_avoid_split(&self, out: &mut Vec<(f32, f32)>) {
        if self.style.avoid_split && self.height > 0.0 {
            out.push((self.y, self.y + self.height));
        }
        for child in &self.children {
            child.collect_avoid_split(out);
        }
    }
}

/// Result of laying out an export root.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub root: PositionedBox,
    pub width: f32,
    pub height: f32,
}

// ---------------------------------------------------------------------------
// Inline runs
// ---------------------------------------------------------------------------

enum InlineRun<'s> {
    Text {
        text: &'s str,
        style: &'s ComputedStyle,
    },
    Break,
}

fn is_inline_node(node: &StyledNode) -> bool {
    match node {
        StyledNode::Text { .. } => true,
        StyledNode::Element { tag, style, .. } => {
            style.display == style::Display::Inline && *tag != Tag::Img
        }
    }
}

fn collect_runs<'s>(node: &'s StyledNode, out: &mut Vec<InlineRun<'s>>) {
    match node {
        StyledNode::Text { text, style } => out.push(InlineRun::Text {
            text: text.as_str(),
            style,
        }),
        StyledNode::Element { tag, children, .. } => {
            if *tag == Tag::Br {
                out.push(InlineRun::Break);
            }
            for child in children {
                collect_runs(child, out);
            }
        }
    }
}

struct LineBreaker<'f> {
    fonts: &'f FontManager,
    max_width: f32,
    strut: &'f ComputedStyle,
    lines: Vec<TextLine>,
    current: Vec<TextFragment>,
    cursor: f32,
    y: f32,
}

impl<'f> LineBreaker<'f> {
    fn new(fonts: &'f FontManager, max_width: f32, strut: &'f ComputedStyle) -> Self {
        Self {
            fonts,
            max_width,
            strut,
            lines: Vec::new(),
            current: Vec::new(),
            cursor: 0.0,
            y: 0.0,
        }
    }

    fn measure(&self, text: &str, s: &ComputedStyle) -> f32 {
        self.fonts.measure_text_width(
            text,
            s.font_size,
            s.font_weight == FontWeight::Bold,
            s.font_style == CssFontStyle::Italic,
            &s.font_family,
        )
    }

    /// Line box height and baseline contributed by one style.
    fn metrics(&self, s: &ComputedStyle) -> (f32, f32) {
        let height = self.fonts.line_height_px(s.font_size, s.line_height);
        let bold = s.font_weight == FontWeight::Bold;
        let italic = s.font_style == CssFontStyle::Italic;
        let ascent = self.fonts.ascender_px(s.font_size, bold, italic, &s.font_family);
        // Heuristic fonts report 0.75 em ascent, 0.25 em descent.
        let content = s.font_size;
        (height, (height - content) / 2.0 + ascent)
    }

    fn place_word(&mut self, word: &str, s: &ComputedStyle, space_before: bool) {
        let w = self.measure(word, s);
        let mut space = if space_before && self.cursor > 0.0 {
            self.measure(" ", s)
        } else {
            0.0
        };
        // Only break where the source had whitespace.
        if space > 0.0 && self.cursor + space + w > self.max_width {
            self.finish_line();
            space = 0.0;
        }
        let x = self.cursor + space;
        self.cursor = x + w;
        if let Some(last) = self.current.last_mut() {
            if last.style == *s {
                if space > 0.0 {
                    last.text.push(' ');
                }
                last.text.push_str(word);
                last.width = self.cursor - last.x;
                return;
            }
        }
        self.current.push(TextFragment {
            text: word.to_string(),
            x,
            width: w,
            style: s.clone(),
        });
    }

    fn finish_line(&mut self) {
        let (mut height, mut baseline) = self.metrics(self.strut);
        for frag in &self.current {
            let (h, b) = self.metrics(&frag.style);
            height = height.max(h);
            baseline = baseline.max(b);
        }
        self.lines.push(TextLine {
            x: 0.0,
            y: self.y,
            width: self.cursor,
            height,
            baseline,
            fragments: std::mem::take(&mut self.current),
        });
        self.y += height;
        self.cursor = 0.0;
    }

    fn run(mut self, runs: &[InlineRun<'_>]) -> Vec<TextLine> {
        let mut pending_space = false;
        let mut any_word = false;
        for run in runs {
            match run {
                InlineRun::Break => {
                    self.finish_line();
                    pending_space = false;
                    any_word = true;
                }
                InlineRun::Text { text, style } => {
                    if text.starts_with(char::is_whitespace) {
                        pending_space = true;
                    }
                    let mut words = text.split_whitespace().peekable();
                    while let Some(word) = words.next() {
                        let space = pending_space && !self.current.is_empty();
                        self.place_word(word, style, space);
                        any_word = true;
                        pending_space = words.peek().is_some();
                    }
                    if text.ends_with(char::is_whitespace) {
                        pending_space = true;
                    }
                }
            }
        }
        if !self.current.is_empty() {
            self.finish_line();
        }
        if !any_word {
            return Vec::new();
        }
        self.lines
    }
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

fn layout_err(e: taffy::TaffyError) -> ExportError {
    ExportError::Rasterize(format!("layout failed: {e:?}"))
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    images: &'a ImageCache,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
    node_markers: HashMap<NodeId, String>,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager, images: &'a ImageCache) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            images,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
            node_markers: HashMap::new(),
        }
    }

    fn build_node(&mut self, styled: &StyledNode, parent_width: f32) -> Result<Option<NodeId>> {
        match styled {
            StyledNode::Text { text, style } => {
                let runs = [InlineRun::Text {
                    text: text.as_str(),
                    style,
                }];
                self.build_text_leaf(&runs, style, parent_width)
            }
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => {
                let src = attrs
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("src"))
                    .map(|(_, v)| v.as_str());
                self.build_element_node(tag, style, children, src, parent_width)
                    .map(Some)
            }
        }
    }

    /// Line-break `runs` into a fixed-size leaf. Returns `None` for runs that
    /// hold nothing but whitespace.
    fn build_text_leaf(
        &mut self,
        runs: &[InlineRun<'_>],
        strut: &ComputedStyle,
        max_width: f32,
    ) -> Result<Option<NodeId>> {
        let mut lines = LineBreaker::new(self.fonts, max_width.max(1.0), strut).run(runs);
        if lines.is_empty() {
            return Ok(None);
        }

        let text_width = lines.iter().map(|l| l.width).fold(0.0f32, f32::max);
        let text_height: f32 = lines.iter().map(|l| l.height).sum();
        for line in &mut lines {
            line.x = match strut.text_align {
                style::TextAlign::Left => 0.0,
                style::TextAlign::Center => (text_width - line.width) / 2.0,
                style::TextAlign::Right => text_width - line.width,
            };
        }

        let taffy_style = Style {
            size: Size {
                width: Dimension::Length(text_width),
                height: Dimension::Length(text_height),
            },
            flex_shrink: 0.0,
            ..Default::default()
        };

        let node = self.taffy.new_leaf(taffy_style).map_err(layout_err)?;
        self.node_styles.insert(node, ComputedStyle::default());
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(Some(node))
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        src: Option<&str>,
        parent_width: f32,
    ) -> Result<NodeId> {
        // Compute the width available for children
        let my_width = match style.width {
            style::Dimension::Px(w) => w,
            style::Dimension::Percent(p) => parent_width * p / 100.0,
            style::Dimension::Auto => {
                parent_width - style.margin_left - style.margin_right
            }
        };
        let my_width = match style.max_width {
            style::Dimension::Px(m) => my_width.min(m),
            style::Dimension::Percent(p) => my_width.min(parent_width * p / 100.0),
            style::Dimension::Auto => my_width,
        };
        let inner_width = (my_width
            - style.padding_left
            - style.padding_right
            - style.border_left_width
            - style.border_right_width)
            .max(1.0);

        // Estimate per-child width for flex-row containers, grids and table
        // rows so that text is word-wrapped to the right column width at
        // build time.
        let is_flex_row = style.display == style::Display::Flex
            && style.flex_direction == style::FlexDirection::Row;
        let is_table_row = *tag == Tag::Tr;
        let is_grid = style.display == style::Display::Grid && *tag != Tag::Table;

        let elem_child_count = children
            .iter()
            .filter(|c| matches!(c, StyledNode::Element { .. }))
            .count()
            .max(1);

        let child_build_width = if is_grid {
            let cols = style.grid_template_columns.len().max(1);
            let gap_total = style.column_gap * (cols - 1) as f32;
            ((inner_width - gap_total) / cols as f32).max(1.0)
        } else if is_table_row || (is_flex_row && style.flex_wrap == style::FlexWrap::NoWrap) {
            let gap_total = style.column_gap * (elem_child_count.saturating_sub(1)) as f32;
            ((inner_width - gap_total) / elem_child_count as f32).max(1.0)
        } else {
            inner_width
        };

        let flows_inline = !matches!(
            style.display,
            style::Display::Flex | style::Display::Grid
        ) && !tag.is_table_part();

        let mut child_nodes = Vec::new();
        let mut list_counter = 0u32;
        let all_inline = flows_inline && children.iter().all(is_inline_node);

        if flows_inline {
            // Group runs of inline children into anonymous text leaves.
            let mut pending: Vec<InlineRun<'_>> = Vec::new();
            for child in children {
                if is_inline_node(child) {
                    collect_runs(child, &mut pending);
                    continue;
                }
                if !pending.is_empty() {
                    if let Some(leaf) = self.build_text_leaf(&pending, style, inner_width)? {
                        child_nodes.push(leaf);
                    }
                    pending.clear();
                }
                if let Some(id) = self.build_child(child, child_build_width, &mut list_counter)? {
                    child_nodes.push(id);
                }
            }
            if !pending.is_empty() {
                if let Some(leaf) = self.build_text_leaf(&pending, style, inner_width)? {
                    child_nodes.push(leaf);
                }
            }
        } else {
            for child in children {
                if let Some(id) = self.build_child(child, child_build_width, &mut list_counter)? {
                    child_nodes.push(id);
                }
            }
        }

        // Resolve Auto image sizes from the decoded intrinsic size; without
        // this an empty flex container computes to 0×0.
        let style_override = if *tag == Tag::Img {
            src.and_then(|s| self.resolve_img_auto_dimensions(s, style, parent_width))
        } else {
            None
        };

        let effective_style = style_override.as_ref().unwrap_or(style);
        let mut taffy_style = self.computed_to_taffy(effective_style, tag);
        if all_inline && !child_nodes.is_empty() {
            // A block holding only text: align the leaf per text-align.
            taffy_style.align_items = Some(match style.text_align {
                style::TextAlign::Left => taffy::AlignItems::Start,
                style::TextAlign::Center => taffy::AlignItems::Center,
                style::TextAlign::Right => taffy::AlignItems::End,
            });
        }
        let node = self
            .taffy
            .new_with_children(taffy_style, &child_nodes)
            .map_err(layout_err)?;
        self.node_styles.insert(node, effective_style.clone());

        if *tag == Tag::Img {
            let src = src.unwrap_or_default().to_string();
            self.node_content.insert(node, BoxContent::Image { src });
        }

        Ok(node)
    }

    /// Build one child and, for list items, record the marker string.
    fn build_child(
        &mut self,
        child: &StyledNode,
        width: f32,
        list_counter: &mut u32,
    ) -> Result<Option<NodeId>> {
        if let StyledNode::Text { text, .. } = child {
            if text.trim().is_empty() {
                return Ok(None);
            }
        }
        let id = self.build_node(child, width)?;
        if let (Some(id), StyledNode::Element { style: cs, .. }) = (id, child) {
            if cs.display == style::Display::ListItem {
                *list_counter += 1;
                match cs.list_style {
                    ListStyle::Disc => {
                        self.node_markers.insert(id, "\u{2022}".to_string());
                    }
                    ListStyle::Decimal => {
                        self.node_markers.insert(id, format!("{}.", list_counter));
                    }
                    ListStyle::None => {}
                }
            }
        }
        Ok(id)
    }

    fn computed_to_taffy(&self, s: &ComputedStyle, tag: &Tag) -> Style {
        let mut ts = Style::default();

        let margin = Rect {
            top: LengthPercentageAuto::Length(s.margin_top),
            right: LengthPercentageAuto::Length(s.margin_right),
            bottom: LengthPercentageAuto::Length(s.margin_bottom),
            left: LengthPercentageAuto::Length(s.margin_left),
        };
        let padding = Rect {
            top: LengthPercentage::Length(s.padding_top),
            right: LengthPercentage::Length(s.padding_right),
            bottom: LengthPercentage::Length(s.padding_bottom),
            left: LengthPercentage::Length(s.padding_left),
        };
        let border = Rect {
            top: LengthPercentage::Length(s.border_top_width),
            right: LengthPercentage::Length(s.border_right_width),
            bottom: LengthPercentage::Length(s.border_bottom_width),
            left: LengthPercentage::Length(s.border_left_width),
        };

        // -----------------------------------------------------------------
        // HTML table model: always use flex regardless of computed display.
        // -----------------------------------------------------------------
        match tag {
            Tag::Table => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
                ts.size.width = self.dim_to_taffy(s.width);
                ts.size.height = self.dim_to_taffy(s.height);
                ts.min_size.width = taffy::Dimension::Length(0.0);
                ts.padding = padding;
                ts.margin = margin;
                ts.border = border;
                return ts;
            }
            Tag::Tr => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.align_items = Some(taffy::AlignItems::Stretch);
                ts.size.width = taffy::Dimension::Percent(1.0);
                ts.min_size.width = taffy::Dimension::Length(0.0);
                ts.margin = margin;
                return ts;
            }
            Tag::Td | Tag::Th => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
                ts.flex_grow = 1.0;
                ts.flex_shrink = 1.0;
                ts.flex_basis = taffy::Dimension::Length(0.0); // equal columns
                ts.min_size.width = taffy::Dimension::Length(0.0);
                ts.padding = padding;
                ts.border = border;
                return ts;
            }
            _ => {}
        }

        // Display / layout mode
        match s.display {
            style::Display::Flex => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = match s.flex_direction {
                    style::FlexDirection::Row => taffy::FlexDirection::Row,
                    style::FlexDirection::Column => taffy::FlexDirection::Column,
                };
                ts.flex_wrap = match s.flex_wrap {
                    style::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                    style::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
                };
                ts.justify_content = Some(match s.justify_content {
                    style::JustifyContent::Start => taffy::JustifyContent::Start,
                    style::JustifyContent::End => taffy::JustifyContent::End,
                    style::JustifyContent::Center => taffy::JustifyContent::Center,
                    style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                    style::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
                    style::JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
                });
                ts.align_items = Some(match s.align_items {
                    style::AlignItems::Start => taffy::AlignItems::Start,
                    style::AlignItems::End => taffy::AlignItems::End,
                    style::AlignItems::Center => taffy::AlignItems::Center,
                    style::AlignItems::Stretch => taffy::AlignItems::Stretch,
                });
            }
            style::Display::Grid => {
                ts.display = taffy::Display::Grid;
                ts.grid_template_columns = if s.grid_template_columns.is_empty() {
                    vec![TrackSizingFunction::from_flex(1.0)]
                } else {
                    s.grid_template_columns
                        .iter()
                        .map(|t| match t {
                            style::GridTrack::Fr(f) => TrackSizingFunction::from_flex(*f),
                            style::GridTrack::Px(px) => TrackSizingFunction::from_length(*px),
                            style::GridTrack::Auto => taffy::style_helpers::auto(),
                        })
                        .collect()
                };
            }
            style::Display::Block
            | style::Display::ListItem
            | style::Display::TableRow
            | style::Display::TableCell
            | style::Display::InlineBlock
            | style::Display::Inline => {
                // Use flex column for block-level elements (vertical stacking).
                // Inline elements only get here as flex/grid items, where they
                // are blockified.
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
            }
            style::Display::None => {
                ts.display = taffy::Display::None;
            }
        }

        // Sizing
        ts.size = Size {
            width: self.dim_to_taffy(s.width),
            height: self.dim_to_taffy(s.height),
        };
        // Allow flex/shrink items to compress below their natural content size
        ts.min_size = Size {
            width: if s.flex_shrink > 0.0 || s.flex_grow > 0.0 {
                taffy::Dimension::Length(0.0)
            } else {
                self.dim_to_taffy(s.min_width)
            },
            height: self.dim_to_taffy(s.min_height),
        };
        ts.max_size = Size {
            width: self.dim_to_taffy(s.max_width),
            height: self.dim_to_taffy(s.max_height),
        };
        if s.overflow == style::Overflow::Clip {
            ts.overflow = taffy::Point {
                x: taffy::Overflow::Hidden,
                y: taffy::Overflow::Hidden,
            };
        }

        // Flex properties
        ts.flex_grow = s.flex_grow;
        ts.flex_shrink = s.flex_shrink;
        ts.flex_basis = self.dim_to_taffy(s.flex_basis);

        ts.margin = margin;
        ts.padding = padding;
        ts.border = border;

        // Gap
        ts.gap = Size {
            width: LengthPercentage::Length(s.column_gap),
            height: LengthPercentage::Length(s.row_gap),
        };

        ts
    }

    fn dim_to_taffy(&self, d: style::Dimension) -> taffy::Dimension {
        match d {
            style::Dimension::Auto => taffy::Dimension::Auto,
            style::Dimension::Px(v) => taffy::Dimension::Length(v),
            style::Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
        }
    }

    /// Return a cloned style with any `Auto` width/height replaced by pixel
    /// values derived from the cached image's intrinsic size. `None` when the
    /// image is unavailable or both dimensions are already specified.
    fn resolve_img_auto_dimensions(
        &self,
        src: &str,
        style: &ComputedStyle,
        parent_width: f32,
    ) -> Option<ComputedStyle> {
        let (px_w, px_h) = self.images.dimensions(src)?;
        let (px_w, px_h) = (px_w as f32, px_h as f32);
        if px_w == 0.0 || px_h == 0.0 {
            return None;
        }
        let aspect = px_w / px_h;

        let known_w = match style.width {
            style::Dimension::Px(v) => Some(v),
            style::Dimension::Percent(p) => Some(parent_width * p / 100.0),
            style::Dimension::Auto => None,
        };
        let known_h = match style.height {
            style::Dimension::Px(v) => Some(v),
            _ => None,
        };

        let mut s = style.clone();
        match (known_w, known_h) {
            (Some(w), None) => s.height = style::Dimension::Px((w / aspect).max(1.0)),
            (None, Some(h)) => s.width = style::Dimension::Px((h * aspect).max(1.0)),
            (None, None) => {
                // Intrinsic size, capped at the available width.
                let w = px_w.min(parent_width.max(1.0));
                s.width = style::Dimension::Px(w);
                s.height = style::Dimension::Px(w / aspect);
            }
            (Some(_), Some(_)) => return None,
        }
        Some(s)
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox> {
        let layout = self.taffy.layout(node).map_err(layout_err)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)
            .map_err(layout_err)?
            .iter()
            .map(|&child| self.extract(child, x, y))
            .collect::<Result<Vec<_>>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style,
            content,
            marker: self.node_markers.get(&node).cloned(),
            children,
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out an export root at a fixed CSS width. The returned tree is
/// translated so the root's border box starts at (0, 0); `height` is the
/// root's full laid-out height.
pub fn layout_root(
    root: &StyledNode,
    width: f32,
    fonts: &FontManager,
    images: &ImageCache,
) -> Result<LayoutResult> {
    let mut builder = LayoutBuilder::new(fonts, images);

    let root_id = match builder.build_node(root, width)? {
        Some(id) => id,
        None => builder
            .taffy
            .new_leaf(Style::default())
            .map_err(layout_err)?,
    };

    // Wrap in a fixed-width column so the root's own margins resolve.
    let container_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: taffy::Dimension::Length(width),
            height: taffy::Dimension::Auto,
        },
        ..Default::default()
    };
    let container = builder
        .taffy
        .new_with_children(container_style, &[root_id])
        .map_err(layout_err)?;

    builder
        .taffy
        .compute_layout(
            container,
            Size {
                width: AvailableSpace::Definite(width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(layout_err)?;

    let location = builder.taffy.layout(root_id).map_err(layout_err)?.location;
    let root_box = builder.extract(root_id, -location.x, -location.y)?;
    Ok(LayoutResult {
        width: root_box.width,
        height: root_box.height,
        root: root_box,
    })
}
