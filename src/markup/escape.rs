//! Markup-safe escaping and glyph splitting for already-escaped text.

use std::borrow::Cow;

/// Entities produced by [`escape`], paired with the character they encode.
const ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#39;", '\''),
];

/// Escape the five markup-reserved characters.
///
/// Must run exactly once per raw segment. Running it again on its own output
/// re-encodes the `&` of every entity, which is a bug in the caller.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Split escaped text into glyphs: one visible character each, with every
/// entity kept whole so a partial append never leaves `&am` in the output.
pub fn glyphs(escaped: &str) -> Vec<&str> {
    let mut out = Vec::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(ch) = rest.chars().next() {
        let len = if ch == '&' {
            ENTITIES
                .iter()
                .find(|(entity, _)| rest.starts_with(entity))
                .map_or(1, |(entity, _)| entity.len())
        } else {
            ch.len_utf8()
        };
        out.push(&rest[..len]);
        rest = &rest[len..];
    }
    out
}

/// Decode a single glyph for materializers that print plain text.
pub fn unescape_glyph(glyph: &str) -> Cow<'_, str> {
    ENTITIES
        .iter()
        .find(|(entity, _)| *entity == glyph)
        .map_or(Cow::Borrowed(glyph), |(_, ch)| Cow::Owned(ch.to_string()))
}
