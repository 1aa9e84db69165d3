//! Message markdown: escape, link, style, and group into blocks.
//!
//! The pipeline for one message is
//! `escape → resolve_links → style_inline` per line, with [`block::parse_with`]
//! deciding what each line is and assembling the [`Document`].

pub mod block;
pub mod document;
pub mod escape;
pub mod inline;
pub mod links;
pub mod tree;

pub use block::{classify_line, parse, parse_with, LineKind};
pub use document::{Block, Document, Inline, RenderOptions, Span};
pub use escape::escape;
pub use tree::{render_html, to_tree, Node, Shell, Tag};
