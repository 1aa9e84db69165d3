//! Line-oriented block parser.
//!
//! Each source line is classified by [`RULES`], an ordered table tested
//! top to bottom (first match wins), then folded into blocks by a small
//! state machine that tracks which list, if any, is open.

use std::sync::OnceLock;

use regex::Regex;

use super::document::{Block, Document, Inline, RenderOptions};
use super::escape::escape;
use super::inline::style_inline;
use super::links::resolve_links;

/// Deepest heading level that gets its own tag; deeper ones are clamped.
pub const MAX_HEADING_LEVEL: u8 = 3;

/// What a single source line is, before list grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Heading { level: u8, text: &'a str },
    StepHeading { ordinal: u32, title: &'a str },
    UnorderedItem { text: &'a str },
    OrderedItem { ordinal: u32, text: &'a str },
    Blank,
    Paragraph { text: &'a str },
}

type Rule = for<'a> fn(&'a str) -> Option<LineKind<'a>>;

/// Classification rules in precedence order. Anything unmatched is a paragraph.
pub const RULES: &[(&str, Rule)] = &[
    ("heading", heading),
    ("step-heading", step_heading),
    ("unordered-item", unordered_item),
    ("ordered-item", ordered_item),
    ("blank", blank),
];

fn re_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("heading pattern is valid"))
}

fn re_step_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.\s+(.+?):\s*$").expect("step pattern is valid"))
}

fn re_unordered() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-•]\s+(.+)$").expect("bullet pattern is valid"))
}

fn re_ordered() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.\s+(.+)$").expect("ordered pattern is valid"))
}

fn heading(line: &str) -> Option<LineKind<'_>> {
    let caps = re_heading().captures(line)?;
    let hashes = caps.get(1)?.as_str().len();
    let level = u8::try_from(hashes).unwrap_or(MAX_HEADING_LEVEL).min(MAX_HEADING_LEVEL);
    Some(LineKind::Heading {
        level,
        text: caps.get(2)?.as_str(),
    })
}

fn step_heading(line: &str) -> Option<LineKind<'_>> {
    let caps = re_step_heading().captures(line)?;
    Some(LineKind::StepHeading {
        ordinal: parse_ordinal(caps.get(1)?.as_str()),
        title: caps.get(2)?.as_str(),
    })
}

fn unordered_item(line: &str) -> Option<LineKind<'_>> {
    let caps = re_unordered().captures(line)?;
    Some(LineKind::UnorderedItem {
        text: caps.get(1)?.as_str(),
    })
}

fn ordered_item(line: &str) -> Option<LineKind<'_>> {
    let caps = re_ordered().captures(line)?;
    Some(LineKind::OrderedItem {
        ordinal: parse_ordinal(caps.get(1)?.as_str()),
        text: caps.get(2)?.as_str(),
    })
}

fn blank(line: &str) -> Option<LineKind<'_>> {
    line.is_empty().then_some(LineKind::Blank)
}

// Oversized ordinals saturate rather than fail; parsing is total.
fn parse_ordinal(digits: &str) -> u32 {
    digits.parse().unwrap_or(u32::MAX)
}

/// Classify one source line.
pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim();
    RULES
        .iter()
        .find_map(|(_, rule)| rule(line))
        .unwrap_or(LineKind::Paragraph { text: line })
}

/// The list currently being accumulated. Only one can be open at a time.
enum OpenList {
    None,
    Unordered(Vec<Inline>),
    Ordered { start: u32, items: Vec<Inline> },
}

impl OpenList {
    fn close_into(&mut self, blocks: &mut Vec<Block>) {
        match std::mem::replace(self, Self::None) {
            Self::None => {}
            Self::Unordered(items) => blocks.push(Block::UnorderedList { items }),
            Self::Ordered { start, items } => blocks.push(Block::OrderedList { start, items }),
        }
    }

    const fn is_ordered(&self) -> bool {
        matches!(self, Self::Ordered { .. })
    }
}

/// Parse with default options.
pub fn parse(document: &str) -> Document {
    parse_with(document, RenderOptions::default())
}

/// Parse a message into blocks. Total: malformed markdown becomes paragraphs.
pub fn parse_with(document: &str, options: RenderOptions) -> Document {
    let lines: Vec<&str> = document.lines().collect();
    let mut blocks = Vec::new();
    let mut open = OpenList::None;

    for (idx, line) in lines.iter().enumerate() {
        match classify_line(line) {
            LineKind::Heading { level, text } => {
                open.close_into(&mut blocks);
                blocks.push(Block::Heading {
                    level,
                    content: inline(text, options),
                });
            }
            LineKind::StepHeading { ordinal, title } => {
                open.close_into(&mut blocks);
                blocks.push(Block::StepHeading {
                    ordinal,
                    title: escape(title),
                });
            }
            LineKind::UnorderedItem { text } => {
                if !matches!(open, OpenList::Unordered(_)) {
                    open.close_into(&mut blocks);
                    open = OpenList::Unordered(Vec::new());
                }
                if let OpenList::Unordered(items) = &mut open {
                    items.push(inline(text, options));
                }
            }
            LineKind::OrderedItem { ordinal, text } => {
                if !open.is_ordered() {
                    open.close_into(&mut blocks);
                    open = OpenList::Ordered {
                        start: ordinal,
                        items: Vec::new(),
                    };
                }
                if let OpenList::Ordered { items, .. } = &mut open {
                    items.push(inline(text, options));
                }
            }
            LineKind::Blank => {
                let next_is_ordered = lines
                    .get(idx + 1)
                    .is_some_and(|next| matches!(classify_line(next), LineKind::OrderedItem { .. }));
                if open.is_ordered() && next_is_ordered {
                    // "1. a\n\n2. b" stays one list.
                    continue;
                }
                open.close_into(&mut blocks);
                if !blocks.is_empty() {
                    blocks.push(Block::Break);
                }
            }
            LineKind::Paragraph { text } => {
                open.close_into(&mut blocks);
                blocks.push(Block::Paragraph {
                    content: inline(text, options),
                });
            }
        }
    }
    open.close_into(&mut blocks);

    tracing::trace!(lines = lines.len(), blocks = blocks.len(), "parsed message");
    Document::new(blocks)
}

fn inline(text: &str, options: RenderOptions) -> Inline {
    style_inline(resolve_links(&escape(text), options))
}
