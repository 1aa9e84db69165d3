//! Environment-neutral markup tree built from a [`Document`].
//!
//! Materializers (string buffer, terminal, a browser bridge) only ever see
//! [`Shell`]s and escaped text, so the same tree drives all of them.

use std::fmt::Write;

use super::document::{Block, Document, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    H1,
    H2,
    H3,
    H4,
    P,
    Ul,
    Ol,
    Li,
    Br,
    A,
    Strong,
    Em,
    Code,
    Span,
}

impl Tag {
    pub const fn name(self) -> &'static str {
        match self {
            Self::H1 => "h1",
            Self::H2 => "h2",
            Self::H3 => "h3",
            Self::H4 => "h4",
            Self::P => "p",
            Self::Ul => "ul",
            Self::Ol => "ol",
            Self::Li => "li",
            Self::Br => "br",
            Self::A => "a",
            Self::Strong => "strong",
            Self::Em => "em",
            Self::Code => "code",
            Self::Span => "span",
        }
    }

    /// Void elements have no closing tag and never hold children.
    pub const fn is_void(self) -> bool {
        matches!(self, Self::Br)
    }

    /// Block-level tags start on a fresh line in text materializers.
    pub const fn is_block(self) -> bool {
        matches!(
            self,
            Self::H1 | Self::H2 | Self::H3 | Self::H4 | Self::P | Self::Ul | Self::Ol | Self::Li | Self::Br
        )
    }

    const fn heading(level: u8) -> Self {
        match level {
            1 => Self::H1,
            2 => Self::H2,
            _ => Self::H3,
        }
    }
}

/// Attribute with an already-escaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: &'static str,
    pub value: String,
}

/// An element without its children: what gets mounted before text arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub tag: Tag,
    pub attrs: Vec<Attr>,
}

impl Shell {
    pub const fn new(tag: Tag) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push(Attr {
            name,
            value: value.into(),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Write the opening tag.
    pub fn write_open(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag.name());
        for attr in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", attr.name, attr.value);
        }
        out.push('>');
    }

    /// Write the closing tag, if the element has one.
    pub fn write_close(&self, out: &mut String) {
        if !self.tag.is_void() {
            let _ = write!(out, "</{}>", self.tag.name());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element { shell: Shell, children: Vec<Node> },
    /// Escaped text.
    Text(String),
}

impl Node {
    fn element(shell: Shell, children: Vec<Self>) -> Self {
        Self::Element { shell, children }
    }

    pub fn write_html(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Element { shell, children } => {
                shell.write_open(out);
                for child in children {
                    child.write_html(out);
                }
                shell.write_close(out);
            }
        }
    }
}

/// Build the markup tree for a document.
pub fn to_tree(document: &Document) -> Vec<Node> {
    document.blocks().iter().map(block_node).collect()
}

/// Serialize a document straight to HTML.
pub fn render_html(document: &Document) -> String {
    let mut out = String::new();
    for node in to_tree(document) {
        node.write_html(&mut out);
    }
    out
}

fn block_node(block: &Block) -> Node {
    match block {
        Block::Heading { level, content } => {
            Node::element(Shell::new(Tag::heading(*level)), spans_nodes(content))
        }
        Block::StepHeading { ordinal, title } => Node::element(
            Shell::new(Tag::H4).attr("class", "step"),
            vec![Node::Text(format!("{ordinal}. {title}"))],
        ),
        Block::UnorderedList { items } => Node::element(
            Shell::new(Tag::Ul),
            items
                .iter()
                .map(|item| Node::element(Shell::new(Tag::Li), spans_nodes(item)))
                .collect(),
        ),
        Block::OrderedList { start, items } => {
            let mut shell = Shell::new(Tag::Ol);
            if *start != 1 {
                shell = shell.attr("start", start.to_string());
            }
            Node::element(
                shell,
                items
                    .iter()
                    .map(|item| Node::element(Shell::new(Tag::Li), spans_nodes(item)))
                    .collect(),
            )
        }
        Block::Paragraph { content } => Node::element(Shell::new(Tag::P), spans_nodes(content)),
        Block::Break => Node::element(Shell::new(Tag::Br), Vec::new()),
    }
}

fn spans_nodes(spans: &[Span]) -> Vec<Node> {
    spans.iter().map(span_node).collect()
}

fn span_node(span: &Span) -> Node {
    match span {
        Span::Text { text } => Node::Text(text.clone()),
        Span::Strong { children } => Node::element(Shell::new(Tag::Strong), spans_nodes(children)),
        Span::Emphasis { children } => Node::element(Shell::new(Tag::Em), spans_nodes(children)),
        Span::Code { text } => Node::element(Shell::new(Tag::Code), vec![Node::Text(text.clone())]),
        Span::Link { href, label } => Node::element(
            Shell::new(Tag::A)
                .attr("href", href.clone())
                .attr("target", "_blank")
                .attr("rel", "noopener noreferrer"),
            spans_nodes(label),
        ),
        Span::Icon { name, glyph } => Node::element(
            Shell::new(Tag::Span)
                .attr("class", "icon")
                .attr("aria-label", name.clone()),
            vec![Node::Text(glyph.clone())],
        ),
    }
}
