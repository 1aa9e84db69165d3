//! Strong, emphasis, and code spans over escaped text.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::document::Span;

/// Stands in for a link or icon while the line is styled as one string.
const ATOM: char = '\u{E000}';

fn re_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`\x{E000}]+)`").expect("code span pattern is valid"))
}

fn re_strong() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("strong pattern is valid"))
}

fn re_emphasis() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*([^*\s](?:[^*]*?[^*\s])?)\*").expect("emphasis pattern is valid")
    })
}

type Atoms = std::vec::IntoIter<Span>;

/// Byte ranges of the code spans in an escaped line.
pub fn code_ranges(escaped: &str) -> Vec<Range<usize>> {
    re_code().find_iter(escaped).map(|m| m.range()).collect()
}

/// Style a resolved line.
///
/// The line is styled as a whole: every link is an opaque atom inside the
/// text, so `**Open [x](…)**` wraps the anchor in strong. Link labels are
/// styled on their own; they only ever hold text and icons, so styling a
/// label cannot produce a nested link.
pub fn style_inline(spans: Vec<Span>) -> Vec<Span> {
    let spans: Vec<Span> = spans.into_iter().map(style_label).collect();
    let collides = spans
        .iter()
        .any(|span| matches!(span, Span::Text { text } if text.contains(ATOM)));
    if collides {
        // Input already carries the atom marker: style text runs one by one.
        return spans
            .into_iter()
            .flat_map(|span| match span {
                Span::Text { text } => style_text(&text),
                other => vec![other],
            })
            .collect();
    }

    let mut line = String::new();
    let mut atoms = Vec::new();
    for span in spans {
        match span {
            Span::Text { text } => line.push_str(&text),
            other => {
                line.push(ATOM);
                atoms.push(other);
            }
        }
    }
    code_pass(&line, &mut atoms.into_iter())
}

fn style_label(span: Span) -> Span {
    match span {
        Span::Link { href, label } => Span::Link {
            href,
            label: style_inline(label),
        },
        other => other,
    }
}

/// Style one run of escaped text.
///
/// Code spans are carved out before anything else so their content is never
/// styled. The rest goes through strong, then emphasis: `**` has to claim its
/// asterisks before a lone `*` can be read as an emphasis boundary.
pub fn style_text(escaped: &str) -> Vec<Span> {
    code_pass(escaped, &mut Vec::new().into_iter())
}

fn code_pass(text: &str, atoms: &mut Atoms) -> Vec<Span> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in re_code().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.extend(strong_pass(&text[last..whole.start()], atoms));
        out.push(Span::Code {
            text: caps[1].to_string(),
        });
        last = whole.end();
    }
    out.extend(strong_pass(&text[last..], atoms));
    out
}

fn strong_pass(text: &str, atoms: &mut Atoms) -> Vec<Span> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in re_strong().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.extend(emphasis_pass(&text[last..whole.start()], atoms));
        out.push(Span::Strong {
            children: emphasis_pass(&caps[1], atoms),
        });
        last = whole.end();
    }
    out.extend(emphasis_pass(&text[last..], atoms));
    out
}

fn emphasis_pass(text: &str, atoms: &mut Atoms) -> Vec<Span> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in re_emphasis().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        restore(&mut out, &text[last..whole.start()], atoms);
        let mut children = Vec::new();
        restore(&mut children, &caps[1], atoms);
        out.push(Span::Emphasis { children });
        last = whole.end();
    }
    restore(&mut out, &text[last..], atoms);
    out
}

/// Push `text` as text spans, putting the next atom back at every marker.
/// Passes run left to right, so atoms come back in line order.
fn restore(out: &mut Vec<Span>, text: &str, atoms: &mut Atoms) {
    if atoms.len() == 0 {
        if !text.is_empty() {
            out.push(Span::text(text));
        }
        return;
    }
    for (i, piece) in text.split(ATOM).enumerate() {
        if i > 0
            && let Some(atom) = atoms.next()
        {
            out.push(atom);
        }
        if !piece.is_empty() {
            out.push(Span::text(piece));
        }
    }
}
