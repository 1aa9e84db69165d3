//! Mount point that types a reveal straight into a terminal.
//!
//! Depth-first reveal only ever writes at the end of the visible text, so the
//! terminal can be written append-only: block shells become line breaks and
//! list markers, inline shells become ANSI styles applied to the glyphs
//! written into them.

use std::io::Write;

use super::mount::{Epoch, MountPoint};
use crate::markup::escape::unescape_glyph;
use crate::markup::{Shell, Tag};

/// Escape codes (or plain-text stand-ins) for terminal output.
#[derive(Debug)]
pub struct Style {
    pub bold: &'static str,
    pub italic: &'static str,
    pub underline: &'static str,
    pub cyan: &'static str,
    pub yellow: &'static str,
    pub reset: &'static str,
    pub bullet: &'static str,
}

pub const PRETTY_STYLE: Style = Style {
    bold: "\x1b[1m",
    italic: "\x1b[3m",
    underline: "\x1b[4m",
    cyan: "\x1b[36m",
    yellow: "\x1b[33m",
    reset: "\x1b[0m",
    bullet: "\u{2022}",
};

pub const TEXT_STYLE: Style = Style {
    bold: "",
    italic: "",
    underline: "",
    cyan: "",
    yellow: "",
    reset: "",
    bullet: "-",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

#[derive(Debug, Clone)]
struct TermNode {
    /// Escape codes in effect for text written into this node.
    ansi: String,
    list: Option<ListKind>,
    next_ordinal: u32,
    list_depth: usize,
}

/// Terminal mount point over any writer.
///
/// A failed write detaches the mount: the in-flight reveal sees it as no
/// longer live and stops.
pub struct TerminalMount<W: Write> {
    out: W,
    style: &'static Style,
    nodes: Vec<TermNode>,
    epoch: Epoch,
    at_line_start: bool,
    active_ansi: String,
    failed: bool,
}

impl<W: Write> TerminalMount<W> {
    pub fn new(out: W, style: &'static Style) -> Self {
        Self {
            out,
            style,
            nodes: vec![Self::root_node()],
            epoch: Epoch::default(),
            at_line_start: true,
            active_ansi: String::new(),
            failed: false,
        }
    }

    const fn root_node() -> TermNode {
        TermNode {
            ansi: String::new(),
            list: None,
            next_ordinal: 1,
            list_depth: 0,
        }
    }

    /// End the current message: reset styles and finish the line.
    pub fn finish(&mut self) {
        self.reset_style();
        if !self.at_line_start {
            self.emit("\n");
            self.at_line_start = true;
        }
        self.nodes.truncate(1);
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, s: &str) {
        if self.failed || s.is_empty() {
            return;
        }
        if let Err(e) = self.out.write_all(s.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::debug!("terminal mount detached: {e}");
            self.failed = true;
        }
    }

    fn reset_style(&mut self) {
        if !self.active_ansi.is_empty() {
            self.emit(self.style.reset);
            self.active_ansi.clear();
        }
    }

    fn start_line(&mut self) {
        if !self.at_line_start {
            self.reset_style();
            self.emit("\n");
            self.at_line_start = true;
        }
    }

    fn inline_ansi(&self, tag: Tag) -> String {
        let s = self.style;
        match tag {
            Tag::H1 | Tag::H2 | Tag::H3 => format!("{}{}", s.bold, s.yellow),
            Tag::H4 | Tag::Strong => s.bold.to_string(),
            Tag::Em => s.italic.to_string(),
            Tag::Code => s.cyan.to_string(),
            Tag::A => format!("{}{}", s.underline, s.cyan),
            _ => String::new(),
        }
    }
}

impl<W: Write> MountPoint for TerminalMount<W> {
    type Handle = usize;

    fn root(&self) -> usize {
        0
    }

    fn attach_child(&mut self, parent: usize, shell: &Shell) -> usize {
        let parent_node = self.nodes[parent].clone();
        let mut node = TermNode {
            ansi: format!("{}{}", parent_node.ansi, self.inline_ansi(shell.tag)),
            list: None,
            next_ordinal: 1,
            list_depth: parent_node.list_depth,
        };

        match shell.tag {
            Tag::Ul | Tag::Ol => {
                self.start_line();
                node.list = Some(if shell.tag == Tag::Ul {
                    ListKind::Unordered
                } else {
                    ListKind::Ordered
                });
                node.next_ordinal = shell.get("start").and_then(|s| s.parse().ok()).unwrap_or(1);
                node.list_depth += 1;
            }
            Tag::Li => {
                self.start_line();
                let indent = "  ".repeat(parent_node.list_depth.saturating_sub(1));
                let marker = match parent_node.list {
                    Some(ListKind::Ordered) => {
                        let n = parent_node.next_ordinal;
                        self.nodes[parent].next_ordinal = n.saturating_add(1);
                        format!("{indent}{n}. ")
                    }
                    _ => format!("{indent}{} ", self.style.bullet),
                };
                self.emit(&marker);
                self.at_line_start = false;
            }
            Tag::Br => {
                self.start_line();
                self.emit("\n");
            }
            tag if tag.is_block() => self.start_line(),
            _ => {}
        }

        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn append_char(&mut self, parent: usize, glyph: &str) {
        let ansi = &self.nodes[parent].ansi;
        if *ansi != self.active_ansi {
            let switch = format!("{}{}", self.style.reset, ansi);
            self.active_ansi = ansi.clone();
            self.emit(&switch);
        }
        self.emit(&unescape_glyph(glyph));
        self.at_line_start = false;
    }

    fn clear(&mut self) {
        self.finish();
        self.epoch = self.epoch.next();
    }

    fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn is_still_live(&self, epoch: Epoch) -> bool {
        !self.failed && self.epoch == epoch
    }
}
