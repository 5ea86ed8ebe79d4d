//! Style resolver – runs the cascade (tag defaults, inherited properties,
//! stylesheet rules, inline `style` attributes, `!important`) and produces a
//! flat [`ComputedStyle`] per element for the layout engine.

use crate::css::{parse_declarations, Declaration, Stylesheet};
use crate::dom::{Document, DomNode, ElementNode, ElementRef, Tag};

/// Browser default font size; also the `rem` base.
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Fully resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Dimension,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub row_gap: f32,
    pub column_gap: f32,

    // Grid
    pub grid_template_columns: Vec<GridTrack>,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub max_width: Dimension,
    pub min_height: Dimension,
    pub max_height: Dimension,

    // Spacing (px)
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Border
    pub border_top_width: f32,
    pub border_right_width: f32,
    pub border_bottom_width: f32,
    pub border_left_width: f32,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_family: String,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,
    pub text_decoration: TextDecoration,
    pub font_style: FontStyle,
    pub list_style: ListStyle,

    // Background
    pub background_color: Color,

    // Painting
    pub overflow: Overflow,
    pub print_color_adjust: ColorAdjust,

    /// `break-inside: avoid` / `page-break-inside: avoid`.
    pub avoid_split: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: Dimension::Auto,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            row_gap: 0.0,
            column_gap: 0.0,
            grid_template_columns: Vec::new(),
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            max_width: Dimension::Auto,
            min_height: Dimension::Auto,
            max_height: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_top_width: 0.0,
            border_right_width: 0.0,
            border_bottom_width: 0.0,
            border_left_width: 0.0,
            border_color: Color::BLACK,
            font_size: DEFAULT_FONT_SIZE,
            font_weight: FontWeight::Normal,
            font_family: "Helvetica".to_string(),
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            text_decoration: TextDecoration::None,
            font_style: FontStyle::Normal,
            list_style: ListStyle::Disc,
            background_color: Color::TRANSPARENT,
            overflow: Overflow::Visible,
            print_color_adjust: ColorAdjust::Economy,
            avoid_split: false,
        }
    }
}

impl ComputedStyle {
    pub fn has_border(&self) -> bool {
        self.border_top_width > 0.0
            || self.border_right_width > 0.0
            || self.border_bottom_width > 0.0
            || self.border_left_width > 0.0
    }

    fn set_border_width(&mut self, w: f32) {
        self.border_top_width = w;
        self.border_right_width = w;
        self.border_bottom_width = w;
        self.border_left_width = w;
    }

    /// Copy the inherited properties of `parent`.
    fn inherit_from(&mut self, parent: &ComputedStyle) {
        self.font_size = parent.font_size;
        self.font_weight = parent.font_weight;
        self.font_family = parent.font_family.clone();
        self.color = parent.color;
        self.text_align = parent.text_align;
        self.line_height = parent.line_height;
        self.font_style = parent.font_style;
        self.list_style = parent.list_style;
        self.print_color_adjust = parent.print_color_adjust;
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Grid,
    Inline,
    InlineBlock,
    ListItem,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Disc,
    Decimal,
    None,
}

/// Whether content outside the padding box is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    Visible,
    /// `hidden`, `auto`, `scroll` and `clip`: a capture only shows what the
    /// box shows.
    Clip,
}

/// `print-color-adjust`. In print mode only `Exact` boxes get backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorAdjust {
    Economy,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridTrack {
    Px(f32),
    Fr(f32),
    Auto,
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let digit = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 | 8 => Some(Self {
                r: digit(&hex[0..2])?,
                g: digit(&hex[2..4])?,
                b: digit(&hex[4..6])?,
                a: if hex.len() == 8 { digit(&hex[6..8])? } else { 1.0 },
            }),
            3 | 4 => {
                let d = |i: usize| digit(&hex[i..i + 1].repeat(2));
                Some(Self {
                    r: d(0)?,
                    g: d(1)?,
                    b: d(2)?,
                    a: if hex.len() == 4 { d(3)? } else { 1.0 },
                })
            }
            _ => None,
        }
    }

    /// Parse any colour value we understand: hex, `rgb()`/`rgba()`, named.
    pub fn parse(val: &str) -> Option<Self> {
        let val = val.trim();
        if val.starts_with('#') {
            return Self::from_hex(val);
        }
        let lower = val.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
        {
            let args = args.trim_end_matches(')');
            let parts: Vec<&str> = args
                .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() < 3 {
                return None;
            }
            let channel = |s: &str| -> Option<f32> {
                match s.strip_suffix('%') {
                    Some(p) => p.parse::<f32>().ok().map(|v| v / 100.0),
                    None => s.parse::<f32>().ok().map(|v| v / 255.0),
                }
            };
            let alpha = match parts.get(3) {
                Some(a) => match a.strip_suffix('%') {
                    Some(p) => p.parse::<f32>().ok()? / 100.0,
                    None => a.parse::<f32>().ok()?,
                },
                None => 1.0,
            };
            return Some(Self {
                r: channel(parts[0])?.clamp(0.0, 1.0),
                g: channel(parts[1])?.clamp(0.0, 1.0),
                b: channel(parts[2])?.clamp(0.0, 1.0),
                a: alpha.clamp(0.0, 1.0),
            });
        }
        named_color(&lower)
    }
}

fn named_color(name: &str) -> Option<Color> {
    Some(match name {
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "transparent" => Color::TRANSPARENT,
        "red" => Color::rgb(255, 0, 0),
        "green" => Color::rgb(0, 128, 0),
        "blue" => Color::rgb(0, 0, 255),
        "navy" => Color::rgb(0, 0, 128),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "silver" => Color::rgb(192, 192, 192),
        "lightgray" | "lightgrey" => Color::rgb(211, 211, 211),
        "darkgray" | "darkgrey" => Color::rgb(169, 169, 169),
        "orange" => Color::rgb(255, 165, 0),
        "yellow" => Color::rgb(255, 255, 0),
        "purple" => Color::rgb(128, 0, 128),
        "teal" => Color::rgb(0, 128, 128),
        "maroon" => Color::rgb(128, 0, 0),
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style of the last element in `chain`.
///
/// Cascade order, lowest first: inherited values and tag defaults, normal
/// stylesheet declarations by `(specificity, source order)`, the inline
/// `style` attribute, important stylesheet declarations, important inline
/// declarations.
pub fn resolve_style(
    chain: &[ElementRef<'_>],
    sheet: &Stylesheet,
    parent: Option<&ComputedStyle>,
) -> ComputedStyle {
    let Some(current) = chain.last() else {
        return ComputedStyle::default();
    };
    let element = current.element;

    let mut style = ComputedStyle::default();
    if let Some(p) = parent {
        style.inherit_from(p);
    }
    apply_tag_defaults(&mut style, &element.tag);

    let matched = sheet.matching(chain);
    let inline = element
        .inline_style()
        .map(parse_declarations)
        .unwrap_or_default();

    let mut ordered: Vec<&Declaration> = Vec::new();
    ordered.extend(
        matched
            .iter()
            .filter(|m| !m.declaration.important)
            .map(|m| m.declaration),
    );
    ordered.extend(inline.iter().filter(|d| !d.important));
    ordered.extend(
        matched
            .iter()
            .filter(|m| m.declaration.important)
            .map(|m| m.declaration),
    );
    ordered.extend(inline.iter().filter(|d| d.important));

    // font-size first so that `em` lengths below see the final value.
    let parent_font = parent.map(|p| p.font_size).unwrap_or(DEFAULT_FONT_SIZE);
    for d in ordered.iter().filter(|d| d.property == "font-size") {
        if let Some(px) = parse_font_size(&d.value, parent_font) {
            style.font_size = px;
        }
    }
    for d in ordered.iter().filter(|d| d.property != "font-size") {
        apply_css_property(&mut style, &d.property, &d.value);
    }
    style
}

/// Default styles based on tag semantics.
fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    let em = s.font_size;
    match tag {
        Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 | Tag::H5 | Tag::H6 => {
            let (scale, margin) = match tag {
                Tag::H1 => (2.0, 0.67),
                Tag::H2 => (1.5, 0.83),
                Tag::H3 => (1.17, 1.0),
                Tag::H4 => (1.0, 1.33),
                Tag::H5 => (0.83, 1.67),
                _ => (0.67, 2.33),
            };
            s.font_size = em * scale;
            s.font_weight = FontWeight::Bold;
            s.margin_top = s.font_size * margin;
            s.margin_bottom = s.font_size * margin;
        }
        Tag::P => {
            s.margin_top = em;
            s.margin_bottom = em;
        }
        Tag::Ul | Tag::Ol => {
            s.margin_top = em;
            s.margin_bottom = em;
            s.padding_left = 40.0;
            s.list_style = if *tag == Tag::Ol {
                ListStyle::Decimal
            } else {
                ListStyle::Disc
            };
        }
        Tag::Li => {
            s.display = Display::ListItem;
        }
        Tag::Table => {
            s.display = Display::Grid;
        }
        Tag::Tr => {
            s.display = Display::TableRow;
        }
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding_top = 1.0;
            s.padding_right = 1.0;
            s.padding_bottom = 1.0;
            s.padding_left = 1.0;
            if *tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
                s.text_align = TextAlign::Center;
            }
        }
        Tag::Span | Tag::Br => {
            s.display = Display::Inline;
        }
        Tag::A => {
            s.display = Display::Inline;
            s.color = Color::rgb(0, 0, 238);
            s.text_decoration = TextDecoration::Underline;
        }
        Tag::Strong | Tag::B => {
            s.display = Display::Inline;
            s.font_weight = FontWeight::Bold;
        }
        Tag::Em | Tag::I => {
            s.display = Display::Inline;
            s.font_style = FontStyle::Italic;
        }
        Tag::Img => {
            s.display = Display::InlineBlock;
        }
        Tag::Hr => {
            s.margin_top = 8.0;
            s.margin_bottom = 8.0;
            s.border_top_width = 1.0;
            s.border_color = Color::rgb(128, 128, 128);
        }
        tag if tag.is_metadata() => {
            s.display = Display::None;
        }
        _ => {}
    }
}

/// Apply one declaration. Unknown properties and unparseable values are
/// ignored, as a browser would.
fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    let val = val.trim();
    if matches!(val, "inherit" | "initial" | "unset" | "revert") {
        return;
    }
    let fs = s.font_size;
    match prop {
        "display" => {
            s.display = match val {
                "flex" | "inline-flex" => Display::Flex,
                "grid" | "inline-grid" | "table" => Display::Grid,
                "block" | "flow-root" => Display::Block,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "list-item" => Display::ListItem,
                "table-row" => Display::TableRow,
                "table-cell" => Display::TableCell,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val {
                "row" | "row-reverse" => FlexDirection::Row,
                "column" | "column-reverse" => FlexDirection::Column,
                _ => s.flex_direction,
            }
        }
        "flex-wrap" => {
            s.flex_wrap = match val {
                "wrap" | "wrap-reverse" => FlexWrap::Wrap,
                _ => FlexWrap::NoWrap,
            }
        }
        "flex" => match val {
            "none" => {
                s.flex_grow = 0.0;
                s.flex_shrink = 0.0;
            }
            "auto" => {
                s.flex_grow = 1.0;
                s.flex_shrink = 1.0;
            }
            _ => {
                let mut parts = val.split_whitespace();
                if let Some(g) = parts.next().and_then(|p| p.parse().ok()) {
                    s.flex_grow = g;
                    s.flex_basis = Dimension::Percent(0.0);
                }
                if let Some(sh) = parts.next().and_then(|p| p.parse().ok()) {
                    s.flex_shrink = sh;
                }
                if let Some(b) = parts.next() {
                    s.flex_basis = parse_dimension(b, fs);
                }
            }
        },
        "flex-grow" => {
            if let Ok(v) = val.parse() {
                s.flex_grow = v;
            }
        }
        "flex-shrink" => {
            if let Ok(v) = val.parse() {
                s.flex_shrink = v;
            }
        }
        "flex-basis" => s.flex_basis = parse_dimension(val, fs),
        "justify-content" => {
            s.justify_content = match val {
                "flex-start" | "start" | "left" | "normal" => JustifyContent::Start,
                "flex-end" | "end" | "right" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" => JustifyContent::SpaceAround,
                "space-evenly" => JustifyContent::SpaceEvenly,
                _ => s.justify_content,
            }
        }
        "align-items" => {
            s.align_items = match val {
                "flex-start" | "start" | "baseline" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                "stretch" | "normal" => AlignItems::Stretch,
                _ => s.align_items,
            }
        }
        "gap" | "grid-gap" => {
            let parts: Vec<f32> = val
                .split_whitespace()
                .filter_map(|p| parse_length(p, fs))
                .collect();
            match parts.as_slice() {
                [g] => {
                    s.row_gap = *g;
                    s.column_gap = *g;
                }
                [r, c, ..] => {
                    s.row_gap = *r;
                    s.column_gap = *c;
                }
                [] => {}
            }
        }
        "row-gap" => set_length(&mut s.row_gap, val, fs),
        "column-gap" => set_length(&mut s.column_gap, val, fs),
        "grid-template-columns" => s.grid_template_columns = parse_grid_tracks(val, fs),

        "width" => s.width = parse_dimension(val, fs),
        "height" => s.height = parse_dimension(val, fs),
        "min-width" => s.min_width = parse_dimension(val, fs),
        "max-width" => s.max_width = parse_dimension(val, fs),
        "min-height" => s.min_height = parse_dimension(val, fs),
        "max-height" => s.max_height = parse_dimension(val, fs),

        "margin" => apply_shorthand_spacing(
            val,
            fs,
            &mut s.margin_top,
            &mut s.margin_right,
            &mut s.margin_bottom,
            &mut s.margin_left,
        ),
        "margin-top" => set_length(&mut s.margin_top, val, fs),
        "margin-right" => set_length(&mut s.margin_right, val, fs),
        "margin-bottom" => set_length(&mut s.margin_bottom, val, fs),
        "margin-left" => set_length(&mut s.margin_left, val, fs),
        "padding" => apply_shorthand_spacing(
            val,
            fs,
            &mut s.padding_top,
            &mut s.padding_right,
            &mut s.padding_bottom,
            &mut s.padding_left,
        ),
        "padding-top" => set_length(&mut s.padding_top, val, fs),
        "padding-right" => set_length(&mut s.padding_right, val, fs),
        "padding-bottom" => set_length(&mut s.padding_bottom, val, fs),
        "padding-left" => set_length(&mut s.padding_left, val, fs),

        "border" => {
            let (width, color) = parse_border(val, fs);
            s.set_border_width(width);
            if let Some(c) = color {
                s.border_color = c;
            }
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            let (width, color) = parse_border(val, fs);
            match prop {
                "border-top" => s.border_top_width = width,
                "border-right" => s.border_right_width = width,
                "border-bottom" => s.border_bottom_width = width,
                _ => s.border_left_width = width,
            }
            if let Some(c) = color {
                s.border_color = c;
            }
        }
        "border-width" => apply_shorthand_spacing(
            val,
            fs,
            &mut s.border_top_width,
            &mut s.border_right_width,
            &mut s.border_bottom_width,
            &mut s.border_left_width,
        ),
        "border-top-width" => set_length(&mut s.border_top_width, val, fs),
        "border-right-width" => set_length(&mut s.border_right_width, val, fs),
        "border-bottom-width" => set_length(&mut s.border_bottom_width, val, fs),
        "border-left-width" => set_length(&mut s.border_left_width, val, fs),
        "border-style" => {
            if val == "none" || val == "hidden" {
                s.set_border_width(0.0);
            }
        }
        "border-color" => {
            if let Some(c) = parse_color_value(val, s.color) {
                s.border_color = c;
            }
        }

        "font-weight" => {
            s.font_weight = match val {
                "bold" | "bolder" => FontWeight::Bold,
                "normal" | "lighter" => FontWeight::Normal,
                n => match n.parse::<u32>() {
                    Ok(w) if w >= 600 => FontWeight::Bold,
                    Ok(_) => FontWeight::Normal,
                    Err(_) => s.font_weight,
                },
            }
        }
        "font-style" => {
            s.font_style = match val {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "font-family" => {
            if let Some(first) = val.split(',').next() {
                let name = first.trim().trim_matches(|c| c == '"' || c == '\'');
                if !name.is_empty() {
                    s.font_family = name.to_string();
                }
            }
        }
        "color" => {
            if let Some(c) = parse_color_value(val, s.color) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            // The shorthand may carry images and positions; pick the colour.
            let color = parse_color_value(val, s.color).or_else(|| {
                if val == "none" {
                    Some(Color::TRANSPARENT)
                } else {
                    val.split_whitespace()
                        .find_map(|tok| parse_color_value(tok, s.color))
                }
            });
            if let Some(c) = color {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "line-height" => {
            if val == "normal" {
                s.line_height = 1.2;
            } else if let Ok(v) = val.parse::<f32>() {
                s.line_height = v;
            } else if let Some(p) = val.strip_suffix('%').and_then(|p| p.parse::<f32>().ok()) {
                s.line_height = p / 100.0;
            } else if let Some(px) = parse_length(val, fs) {
                if fs > 0.0 {
                    s.line_height = px / fs;
                }
            }
        }
        "text-decoration" | "text-decoration-line" => {
            s.text_decoration = if val.split_whitespace().any(|t| t == "underline") {
                TextDecoration::Underline
            } else {
                TextDecoration::None
            }
        }
        "list-style" | "list-style-type" => {
            for tok in val.split_whitespace() {
                match tok {
                    "none" => s.list_style = ListStyle::None,
                    "decimal" => s.list_style = ListStyle::Decimal,
                    "disc" | "circle" | "square" => s.list_style = ListStyle::Disc,
                    _ => {}
                }
            }
        }
        "overflow" | "overflow-y" | "overflow-x" => {
            s.overflow = match val.split_whitespace().next() {
                Some("visible") => Overflow::Visible,
                Some(_) => Overflow::Clip,
                None => s.overflow,
            }
        }
        "print-color-adjust" | "-webkit-print-color-adjust" | "color-adjust" => {
            s.print_color_adjust = if val == "exact" {
                ColorAdjust::Exact
            } else {
                ColorAdjust::Economy
            }
        }
        "break-inside" | "page-break-inside" => {
            s.avoid_split = matches!(val, "avoid" | "avoid-page");
        }
        _ => {}
    }
}

fn set_length(slot: &mut f32, val: &str, font_size: f32) {
    if let Some(px) = parse_length(val, font_size) {
        *slot = px;
    }
}

/// Resolve a CSS length to px. `em` is relative to `font_size`, `rem` to the
/// default font size. Percentages are not lengths here.
pub fn parse_length(val: &str, font_size: f32) -> Option<f32> {
    let val = val.trim();
    if val == "0" {
        return Some(0.0);
    }
    let units: [(&str, f32); 8] = [
        ("rem", DEFAULT_FONT_SIZE),
        ("em", font_size),
        ("px", 1.0),
        ("pt", 96.0 / 72.0),
        ("mm", 96.0 / 25.4),
        ("cm", 96.0 / 2.54),
        ("in", 96.0),
        ("pc", 16.0),
    ];
    for (unit, factor) in units {
        if let Some(num) = val.strip_suffix(unit) {
            return num.trim().parse::<f32>().ok().map(|v| v * factor);
        }
    }
    // Unitless numbers are treated as px.
    val.parse().ok()
}

fn parse_font_size(val: &str, parent_font: f32) -> Option<f32> {
    let val = val.trim();
    let keyword = match val {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(16.0),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "smaller" => Some(parent_font / 1.2),
        "larger" => Some(parent_font * 1.2),
        _ => None,
    };
    if keyword.is_some() {
        return keyword;
    }
    if let Some(p) = val.strip_suffix('%') {
        return p.trim().parse::<f32>().ok().map(|v| parent_font * v / 100.0);
    }
    parse_length(val, parent_font)
}

fn parse_dimension(s: &str, font_size: f32) -> Dimension {
    let s = s.trim();
    if s == "auto" || s == "none" {
        Dimension::Auto
    } else if let Some(p) = s.strip_suffix('%') {
        p.parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto)
    } else {
        parse_length(s, font_size)
            .map(Dimension::Px)
            .unwrap_or(Dimension::Auto)
    }
}

fn parse_color_value(val: &str, current: Color) -> Option<Color> {
    if val.eq_ignore_ascii_case("currentcolor") {
        return Some(current);
    }
    Color::parse(val)
}

/// `border: 1px solid #ccc` → (width, colour). A `none` style zeroes the width.
fn parse_border(val: &str, font_size: f32) -> (f32, Option<Color>) {
    if val == "none" || val == "0" {
        return (0.0, None);
    }
    let mut width = None;
    let mut color = None;
    let mut none = false;
    for tok in split_outside_parens(val) {
        match tok {
            "none" | "hidden" => none = true,
            "thin" => width = Some(1.0),
            "medium" => width = Some(3.0),
            "thick" => width = Some(5.0),
            "solid" | "dashed" | "dotted" | "double" => {}
            t => {
                if let Some(px) = parse_length(t, font_size) {
                    width = Some(px);
                } else if let Some(c) = Color::parse(t) {
                    color = Some(c);
                }
            }
        }
    }
    if none {
        return (0.0, color);
    }
    (width.unwrap_or(3.0), color)
}

fn split_outside_parens(val: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0;
    let mut start = None;
    for (i, c) in val.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    out.push(&val[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push(&val[s..]);
    }
    out
}

/// `repeat(3, minmax(0, 1fr))`, `1fr 2fr`, `200px auto`.
fn parse_grid_tracks(val: &str, font_size: f32) -> Vec<GridTrack> {
    let val = val.trim();
    if let Some(inner) = val
        .strip_prefix("repeat(")
        .and_then(|r| r.strip_suffix(')'))
    {
        if let Some((count, track)) = inner.split_once(',') {
            if let Ok(n) = count.trim().parse::<usize>() {
                let track = parse_track(track.trim(), font_size);
                return vec![track; n];
            }
        }
        return Vec::new();
    }
    split_outside_parens(val)
        .into_iter()
        .map(|t| parse_track(t, font_size))
        .collect()
}

fn parse_track(t: &str, font_size: f32) -> GridTrack {
    if let Some(inner) = t.strip_prefix("minmax(").and_then(|r| r.strip_suffix(')')) {
        return match inner.split_once(',') {
            Some((_, max)) => parse_track(max.trim(), font_size),
            None => GridTrack::Auto,
        };
    }
    if let Some(fr) = t.strip_suffix("fr").and_then(|f| f.parse::<f32>().ok()) {
        return GridTrack::Fr(fr);
    }
    parse_length(t, font_size)
        .map(GridTrack::Px)
        .unwrap_or(GridTrack::Auto)
}

fn apply_shorthand_spacing(
    val: &str,
    font_size: f32,
    top: &mut f32,
    right: &mut f32,
    bottom: &mut f32,
    left: &mut f32,
) {
    // `auto` resolves to 0 here; horizontal centring is not modelled.
    let parts: Vec<f32> = val
        .split_whitespace()
        .map(|p| if p == "auto" { Some(0.0) } else { parse_length(p, font_size) })
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default();
    match parts.len() {
        1 => {
            *top = parts[0];
            *right = parts[0];
            *bottom = parts[0];
            *left = parts[0];
        }
        2 => {
            *top = parts[0];
            *bottom = parts[0];
            *right = parts[1];
            *left = parts[1];
        }
        3 => {
            *top = parts[0];
            *right = parts[1];
            *left = parts[1];
            *bottom = parts[2];
        }
        4 => {
            *top = parts[0];
            *right = parts[1];
            *bottom = parts[2];
            *left = parts[3];
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (image src, classes for diagnostics).
        attrs: Vec<(String, String)>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            StyledNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            StyledNode::Text { .. } => None,
        }
    }
}

/// Style the element at `path` and its whole subtree. Ancestors are resolved
/// too so that inherited properties and descendant selectors see the real
/// document context.
pub fn style_subtree(doc: &Document, path: &[usize], sheet: &Stylesheet) -> Option<StyledNode> {
    let mut chain = doc.ancestry(path)?;
    let mut parent: Option<ComputedStyle> = None;
    for depth in 1..chain.len() {
        parent = Some(resolve_style(&chain[..depth], sheet, parent.as_ref()));
    }
    Some(build_element(&mut chain, sheet, parent.as_ref()))
}

fn build_element<'a>(
    chain: &mut Vec<ElementRef<'a>>,
    sheet: &Stylesheet,
    parent: Option<&ComputedStyle>,
) -> StyledNode {
    let element: &'a ElementNode = match chain.last() {
        Some(current) => current.element,
        None => {
            return StyledNode::Text {
                text: String::new(),
                style: ComputedStyle::default(),
            }
        }
    };
    let style = resolve_style(chain, sheet, parent);

    let mut children = Vec::new();
    let mut prev: Option<&'a ElementNode> = None;
    if style.display != Display::None {
        for child in &element.children {
            match child {
                DomNode::Element(e) => {
                    chain.push(ElementRef {
                        element: e,
                        prev_sibling: prev,
                    });
                    let node = build_element(chain, sheet, Some(&style));
                    chain.pop();
                    prev = Some(e);
                    if node.style().display != Display::None {
                        children.push(node);
                    }
                }
                DomNode::Text(text) => {
                    let mut text_style = style.clone();
                    // Text nodes render inline; clear all box-model properties
                    // that must not be inherited (border, background, spacing).
                    text_style.display = Display::Inline;
                    text_style.set_border_width(0.0);
                    text_style.background_color = Color::TRANSPARENT;
                    text_style.margin_top = 0.0;
                    text_style.margin_right = 0.0;
                    text_style.margin_bottom = 0.0;
                    text_style.margin_left = 0.0;
                    text_style.padding_top = 0.0;
                    text_style.padding_right = 0.0;
                    text_style.padding_bottom = 0.0;
                    text_style.padding_left = 0.0;
                    text_style.width = Dimension::Auto;
                    text_style.height = Dimension::Auto;
                    text_style.avoid_split = false;
                    // Whitespace-only runs are kept as a single space: they
                    // separate inline siblings.
                    let text = if text.trim().is_empty() {
                        " ".to_string()
                    } else {
                        text.clone()
                    };
                    children.push(StyledNode::Text {
                        text,
                        style: text_style,
                    });
                }
            }
        }
    }

    StyledNode::Element {
        tag: element.tag.clone(),
        style,
        children,
        attrs: element.attributes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(html: &str, css: &str, id: &str) -> StyledNode {
        let doc = Document::parse(html);
        let sheet = Stylesheet::parse(css);
        let path = doc.path_to_id(id).unwrap();
        style_subtree(&doc, &path, &sheet).unwrap()
    }

    #[test]
    fn inline_style_font_size() {
        let node = styled(
            r#"<div id="x" style="font-size: 24px; color: #ff0000"></div>"#,
            "",
            "x",
        );
        assert_eq!(node.style().font_size, 24.0);
        assert!((node.style().color.r - 1.0).abs() < 0.01);
    }

    #[test]
    fn cascade_order() {
        let css = "#x { color: #00ff00 } .c { color: #0000ff !important } div { color: #ff0000 }";
        let node = styled(r#"<div id="x" class="c" style="color: #ffffff"></div>"#, css, "x");
        // Important stylesheet beats the normal inline declaration.
        assert_eq!(node.style().color, Color::rgb(0, 0, 255));

        let node = styled(r#"<div id="x" style="color: #ffffff"></div>"#, css, "x");
        assert_eq!(node.style().color, Color::WHITE);
    }

    #[test]
    fn inherited_through_ancestors() {
        let node = styled(
            r#"<body style="font-size: 20px; color: rgb(10, 20, 30)"><div id="x"><h1>T</h1></div></body>"#,
            "",
            "x",
        );
        assert_eq!(node.style().font_size, 20.0);
        assert_eq!(node.style().color, Color::rgb(10, 20, 30));
        match &node {
            StyledNode::Element { children, .. } => {
                assert_eq!(children[0].style().font_size, 40.0);
            }
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn units_resolve_to_px() {
        assert_eq!(parse_length("1.5rem", 10.0), Some(24.0));
        assert_eq!(parse_length("2em", 10.0), Some(20.0));
        assert!((parse_length("10mm", 16.0).unwrap() - 37.795).abs() < 0.01);
        assert!((parse_length("12pt", 16.0).unwrap() - 16.0).abs() < 0.001);
        assert_eq!(parse_length("abc", 16.0), None);
    }

    #[test]
    fn em_padding_uses_final_font_size() {
        let node = styled(
            r#"<div id="x" style="padding: 1em; font-size: 20px"></div>"#,
            "",
            "x",
        );
        assert_eq!(node.style().padding_left, 20.0);
    }

    #[test]
    fn color_forms() {
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("rgb(255 0 0)"), Some(Color::rgb(255, 0, 0)));
        let c = Color::parse("rgba(0, 0, 0, 0.5)").unwrap();
        assert!((c.a - 0.5).abs() < 0.001);
        assert_eq!(Color::parse("Grey"), Some(Color::rgb(128, 128, 128)));
        let c = Color::from_hex("#ff8800").unwrap();
        assert!((c.g - 0.533).abs() < 0.01);
    }

    #[test]
    fn hidden_children_dropped_and_metadata_hidden() {
        let node = styled(
            r#"<div id="x"><style>p{}</style><p style="display:none">a</p><p>b</p></div>"#,
            "",
            "x",
        );
        match node {
            StyledNode::Element { children, .. } => {
                assert_eq!(children.len(), 1);
            }
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn border_and_avoid_split() {
        let node = styled(
            r#"<section id="x" class="resume-section"></section>"#,
            ".resume-section { border-bottom: 2px solid #333; break-inside: avoid; -webkit-print-color-adjust: exact }",
            "x",
        );
        let s = node.style();
        assert_eq!(s.border_bottom_width, 2.0);
        assert_eq!(s.border_top_width, 0.0);
        assert!(s.avoid_split);
        assert_eq!(s.print_color_adjust, ColorAdjust::Exact);
    }

    #[test]
    fn grid_repeat_tracks() {
        let tracks = parse_grid_tracks("repeat(2, minmax(0, 1fr))", 16.0);
        assert_eq!(tracks, vec![GridTrack::Fr(1.0), GridTrack::Fr(1.0)]);
    }
}
