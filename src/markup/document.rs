//! Parsed message types: blocks and inline spans.

use serde::{Deserialize, Serialize};

/// Inline content of a heading, paragraph, or list item.
pub type Inline = Vec<Span>;

/// An inline node. All text it carries has already been escaped once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Span {
    Text { text: String },
    Strong { children: Vec<Span> },
    Emphasis { children: Vec<Span> },
    Code { text: String },
    /// Anchor. Its label never contains another `Link`.
    Link { href: String, label: Vec<Span> },
    /// Glyph standing in for a well-known link label.
    Icon { name: String, glyph: String },
}

impl Span {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Flatten to the escaped text a reader would see.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text { text } | Self::Code { text } => text.clone(),
            Self::Strong { children } | Self::Emphasis { children } => plain_text(children),
            Self::Link { label, .. } => plain_text(label),
            Self::Icon { glyph, .. } => glyph.clone(),
        }
    }
}

/// Concatenated escaped text of a span sequence.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(Span::plain_text).collect()
}

/// A block-level node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// `#`-style heading; level is clamped to 1..=3.
    Heading { level: u8, content: Inline },
    /// A numbered line ending in a colon, e.g. `2. Reset the adapter:`.
    StepHeading { ordinal: u32, title: String },
    UnorderedList { items: Vec<Inline> },
    OrderedList { start: u32, items: Vec<Inline> },
    Paragraph { content: Inline },
    Break,
}

/// A parsed message. Built once per render and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub(crate) const fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

/// Knobs for the inline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Replace known social link labels with an icon glyph.
    pub link_icons: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { link_icons: true }
    }
}
