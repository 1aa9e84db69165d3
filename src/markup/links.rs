//! Labeled links and bare-URL autolinks over an escaped line.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::document::{RenderOptions, Span};
use super::inline::code_ranges;

/// Labels rendered as an icon glyph when `link_icons` is on.
const KNOWN_ICONS: &[(&str, &str)] = &[("LinkedIn", "🔗"), ("Instagram", "📸")];

fn re_labeled() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([^\]\n]+)\]\((https?://[^\s)`]+)\)").expect("labeled link pattern is valid")
    })
}

fn re_bare() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s`]+").expect("bare url pattern is valid"))
}

/// Turn `[label](url)` and bare `http(s)://` tokens into link spans.
///
/// Labeled links are resolved first; the bare-URL pass then only sees the
/// text between them, so a label or href is never linked a second time.
/// Nothing that starts inside a code span is linked.
pub fn resolve_links(escaped_line: &str, options: RenderOptions) -> Vec<Span> {
    let code = code_ranges(escaped_line);
    let in_code = |pos: usize| code.iter().any(|r| r.contains(&pos));
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in re_labeled().captures_iter(escaped_line) {
        let Some(whole) = caps.get(0) else { continue };
        if in_code(whole.start()) {
            continue;
        }
        autolink_into(escaped_line, last..whole.start(), &in_code, &mut spans);
        spans.push(Span::Link {
            href: caps[2].to_string(),
            label: link_label(&caps[1], options),
        });
        last = whole.end();
    }
    autolink_into(escaped_line, last..escaped_line.len(), &in_code, &mut spans);
    spans
}

fn autolink_into(line: &str, range: Range<usize>, in_code: &dyn Fn(usize) -> bool, spans: &mut Vec<Span>) {
    let offset = range.start;
    let segment = &line[range];
    let mut last = 0;
    for m in re_bare().find_iter(segment) {
        if in_code(offset + m.start()) {
            continue;
        }
        push_text(spans, &segment[last..m.start()]);
        spans.push(Span::Link {
            href: m.as_str().to_string(),
            label: vec![Span::text(m.as_str())],
        });
        last = m.end();
    }
    push_text(spans, &segment[last..]);
}

fn push_text(spans: &mut Vec<Span>, text: &str) {
    if !text.is_empty() {
        spans.push(Span::text(text));
    }
}

fn link_label(label: &str, options: RenderOptions) -> Vec<Span> {
    if options.link_icons
        && let Some((name, glyph)) = KNOWN_ICONS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label.trim()))
    {
        return vec![Span::Icon {
            name: name.to_string(),
            glyph: (*glyph).to_string(),
        }];
    }
    vec![Span::text(label)]
}
