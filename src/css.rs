//! Stylesheet parser and selector matching.
//!
//! Handles the CSS that résumé pages actually ship: plain rules, grouped
//! selectors, `!important`, and `@media print` / `@media all` blocks. Every
//! other at-rule (`@font-face`, `@keyframes`, `@page`, screen-only media
//! queries) is skipped. A selector using anything we cannot evaluate (pseudo
//! classes, attribute selectors, the `~` combinator) is dropped whole rather
//! than matched approximately.

use crate::dom::{ElementNode, ElementRef};

/// `(ids, classes, types)`; compared lexicographically.
pub type Specificity = (u32, u32, u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `A B`
    Descendant,
    /// `A > B`
    Child,
    /// `A + B`
    Adjacent,
}

/// One compound selector such as `div.card#top`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl Compound {
    fn matches(&self, e: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if e.tag.name() != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if e.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| e.has_class(c))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    /// Left to right; the last compound is the subject.
    pub compounds: Vec<Compound>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
    pub combinators: Vec<Combinator>,
}

impl Selector {
    pub fn parse(text: &str) -> Option<Selector> {
        parse_selector(text)
    }

    pub fn specificity(&self) -> Specificity {
        self.compounds.iter().fold((0, 0, 0), |(a, b, c), comp| {
            (
                a + comp.id.is_some() as u32,
                b + comp.classes.len() as u32,
                c + comp.tag.is_some() as u32,
            )
        })
    }

    /// Match against an ancestry chain whose last entry is the candidate.
    pub fn matches(&self, chain: &[ElementRef<'_>]) -> bool {
        match chain.split_last() {
            Some((subject, ancestors)) => {
                self.match_from(self.compounds.len() - 1, *subject, ancestors)
            }
            None => false,
        }
    }

    fn match_from(&self, k: usize, elem: ElementRef<'_>, ancestors: &[ElementRef<'_>]) -> bool {
        if !self.compounds[k].matches(elem.element) {
            return false;
        }
        if k == 0 {
            return true;
        }
        match self.combinators[k - 1] {
            Combinator::Child => match ancestors.split_last() {
                Some((parent, rest)) => self.match_from(k - 1, *parent, rest),
                None => false,
            },
            Combinator::Descendant => (0..ancestors.len())
                .rev()
                .any(|i| self.match_from(k - 1, ancestors[i], &ancestors[..i])),
            Combinator::Adjacent => match elem.prev_sibling {
                // The sibling's own previous sibling is not tracked, so chains
                // of `+` only match one step deep.
                Some(prev) => self.match_from(
                    k - 1,
                    ElementRef {
                        element: prev,
                        prev_sibling: None,
                    },
                    ancestors,
                ),
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<Declaration>,
}

/// A parsed stylesheet; rule order is source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

/// A declaration that applies to an element, with its cascade sort key.
#[derive(Debug, Clone, Copy)]
pub struct MatchedDeclaration<'a> {
    pub specificity: Specificity,
    pub order: usize,
    pub declaration: &'a Declaration,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let cleaned = strip_comments(css);
        let mut rules = Vec::new();
        parse_block_contents(&cleaned, &mut rules);
        Self { rules }
    }

    /// Every declaration whose rule matches the chain's last element, sorted
    /// by `(specificity, source order)`.
    pub fn matching(&self, chain: &[ElementRef<'_>]) -> Vec<MatchedDeclaration<'_>> {
        let mut out = Vec::new();
        for (order, rule) in self.rules.iter().enumerate() {
            let best = rule
                .selectors
                .iter()
                .filter(|s| s.matches(chain))
                .map(Selector::specificity)
                .max();
            if let Some(specificity) = best {
                for declaration in &rule.declarations {
                    out.push(MatchedDeclaration {
                        specificity,
                        order,
                        declaration,
                    });
                }
            }
        }
        out.sort_by_key(|m| (m.specificity, m.order));
        out
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Walk a sequence of rules and at-rules, appending what we keep.
fn parse_block_contents(css: &str, rules: &mut Vec<Rule>) {
    let bytes = css.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        // Prelude runs to the first `{` or `;` outside quotes/parens.
        let Some((stop, stop_char)) = find_top_level(css, pos, &[b'{', b';']) else {
            break;
        };
        let prelude = css[pos..stop].trim();
        if stop_char == b';' {
            // `@import`, `@charset` or a stray declaration.
            pos = stop + 1;
            continue;
        }
        let body_start = stop + 1;
        let body_end = matching_brace(css, stop).unwrap_or(css.len());
        let body = &css[body_start..body_end.min(css.len())];
        pos = (body_end + 1).min(css.len());

        if let Some(at) = prelude.strip_prefix('@') {
            let (name, params) = at.split_once(char::is_whitespace).unwrap_or((at, ""));
            if name.eq_ignore_ascii_case("media") && media_applies(params) {
                parse_block_contents(body, rules);
            }
            continue;
        }

        let selectors: Vec<Selector> = split_top_level(prelude, b',')
            .into_iter()
            .filter_map(|s| parse_selector(s.trim()))
            .collect();
        if selectors.is_empty() {
            continue;
        }
        let declarations = parse_declarations(body);
        if !declarations.is_empty() {
            rules.push(Rule {
                selectors,
                declarations,
            });
        }
    }
}

/// The page is captured as printed, so print and all-media blocks apply.
fn media_applies(query: &str) -> bool {
    query.split(',').any(|q| {
        let mut words = q.split_whitespace().map(|w| w.to_ascii_lowercase());
        let first = match words.next() {
            Some(w) if w == "only" => words.next(),
            other => other,
        };
        matches!(first.as_deref(), Some("print") | Some("all"))
    })
}

/// Parse a declaration block (`a: b; c: d !important`). Also used for
/// inline `style` attributes.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    let mut out = Vec::new();
    for decl in split_top_level(block, b';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let property = prop.trim().to_ascii_lowercase();
        if property.is_empty() {
            continue;
        }
        let mut value = value.trim();
        let mut important = false;
        if let Some(bang) = value.rfind('!') {
            if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
                important = true;
                value = value[..bang].trim_end();
            }
        }
        if value.is_empty() {
            continue;
        }
        out.push(Declaration {
            property,
            value: value.to_string(),
            important,
        });
    }
    out
}

fn parse_selector(text: &str) -> Option<Selector> {
    if text.is_empty() {
        return None;
    }
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut current = Compound::default();
    let mut has_current = false;
    let mut pending: Option<Combinator> = None;
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                if has_current {
                    compounds.push(std::mem::take(&mut current));
                    has_current = false;
                    pending = Some(Combinator::Descendant);
                }
                i += 1;
            }
            '>' | '+' => {
                if has_current {
                    compounds.push(std::mem::take(&mut current));
                    has_current = false;
                } else if compounds.is_empty() {
                    return None;
                }
                pending = Some(if c == '>' {
                    Combinator::Child
                } else {
                    Combinator::Adjacent
                });
                i += 1;
            }
            // Pseudo classes/elements, attribute selectors, general siblings
            // and anything else exotic.
            ':' | '[' | '~' | '(' | '|' => return None,
            _ => {
                if !has_current {
                    if let Some(comb) = pending.take() {
                        combinators.push(comb);
                    } else if !compounds.is_empty() {
                        return None;
                    }
                    has_current = true;
                }
                match c {
                    '*' => i += 1,
                    '.' | '#' => {
                        let (name, next) = read_ident(&chars, i + 1);
                        if name.is_empty() {
                            return None;
                        }
                        if c == '.' {
                            current.classes.push(name);
                        } else {
                            current.id = Some(name);
                        }
                        i = next;
                    }
                    _ => {
                        let (name, next) = read_ident(&chars, i);
                        if name.is_empty() || current.tag.is_some() {
                            return None;
                        }
                        current.tag = Some(name.to_ascii_lowercase());
                        i = next;
                    }
                }
            }
        }
    }
    if has_current {
        compounds.push(current);
    } else if pending.is_some() {
        return None;
    }
    if compounds.is_empty() || combinators.len() + 1 != compounds.len() {
        return None;
    }
    Some(Selector {
        compounds,
        combinators,
    })
}

/// Read a CSS identifier, unescaping `\:` style escapes (Tailwind's `md\:flex`,
/// `w-1\/2`).
fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut out = String::new();
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            out.push(chars[i + 1]);
            i += 2;
        } else if c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            out.push(c);
            i += 1;
        } else {
            break;
        }
    }
    (out, i)
}

/// Index and byte of the first of `targets` at depth 0, outside quotes.
fn find_top_level(s: &str, from: usize, targets: &[u8]) -> Option<(usize, u8)> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'\\' => i += 1,
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ if depth == 0 && targets.contains(&b) => return Some((i, b)),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn matching_brace(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn split_top_level(s: &str, sep: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    while let Some((idx, _)) = find_top_level(s, start, &[sep]) {
        parts.push(&s[start..idx]);
        start = idx + 1;
    }
    if start <= s.len() {
        parts.push(&s[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn chain_for<'a>(doc: &'a Document, id: &str) -> Vec<ElementRef<'a>> {
        let path = doc.path_to_id(id).unwrap();
        doc.ancestry(&path).unwrap()
    }

    #[test]
    fn parses_rules_and_important() {
        let sheet = Stylesheet::parse(
            "/* c */ .a, p { color: red; margin: 0 !important } @font-face { font-family: x }",
        );
        assert_eq!(sheet.rules.len(), 1);
        let rule = &sheet.rules[0];
        assert_eq!(rule.selectors.len(), 2);
        assert!(!rule.declarations[0].important);
        assert!(rule.declarations[1].important);
        assert_eq!(rule.declarations[1].value, "0");
    }

    #[test]
    fn media_blocks_filtered() {
        let sheet = Stylesheet::parse(
            "@media print { .p { color: red } } @media (max-width: 600px) { .s { color: blue } } @media all { .q { color: green } }",
        );
        assert_eq!(sheet.rules.len(), 2);
    }

    #[test]
    fn unsupported_selectors_dropped_whole() {
        assert!(Selector::parse("a:hover").is_none());
        assert!(Selector::parse("input[type=text]").is_none());
        assert!(Selector::parse("h1 ~ p").is_none());
        assert!(Selector::parse("div > .x + span").is_some());
    }

    #[test]
    fn semicolon_inside_url_is_not_a_separator() {
        let decls = parse_declarations("background: url(data:image/png;base64,AAA); color: #fff");
        assert_eq!(decls.len(), 2);
        assert!(decls[0].value.contains("base64"));
    }

    #[test]
    fn combinators_match() {
        let doc = Document::parse(
            r#"<div class="outer"><section class="resume-section"><h2>T</h2><p id="x">b</p></section></div>"#,
        );
        let chain = chain_for(&doc, "x");
        assert!(Selector::parse(".outer p").unwrap().matches(&chain));
        assert!(Selector::parse(".resume-section > p").unwrap().matches(&chain));
        assert!(Selector::parse("h2 + p").unwrap().matches(&chain));
        assert!(!Selector::parse(".outer > p").unwrap().matches(&chain));
        assert!(!Selector::parse("h1 + p").unwrap().matches(&chain));
    }

    #[test]
    fn escaped_tailwind_classes() {
        let doc = Document::parse(r#"<div id="x" class="w-1/2 md:flex"></div>"#);
        let chain = chain_for(&doc, "x");
        assert!(Selector::parse(r".w-1\/2").unwrap().matches(&chain));
        assert!(Selector::parse(r".md\:flex").unwrap().matches(&chain));
    }

    #[test]
    fn matching_sorted_by_specificity_then_order() {
        let sheet = Stylesheet::parse("#x { color: a } p { color: b } .c { color: c } p { color: d }");
        let doc = Document::parse(r#"<p id="x" class="c"></p>"#);
        let chain = chain_for(&doc, "x");
        let values: Vec<&str> = sheet
            .matching(&chain)
            .iter()
            .map(|m| m.declaration.value.as_str())
            .collect();
        assert_eq!(values, vec!["b", "d", "c", "a"]);
    }
}
