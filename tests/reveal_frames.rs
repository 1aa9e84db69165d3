use std::sync::OnceLock;
use std::time::Duration;

use deskchat::markup::{parse, render_html};
use deskchat::reveal::{MarkupBuffer, MountPoint, Outcome, Pacing, Reveal, SharedMount};
use regex::Regex;

const MESSAGE: &str = "### Reset Wi-Fi
1. Open settings:
- Toggle **Wi-Fi *off* and on**
- Forget the `corp & guest` network
- Open **[the portal](https://portal.example)** first

2. Reconnect
3. See [the guide](https://help.example.com/wifi?a=1&b=2) or https://status.example.com
Still <stuck>? Reply \"no luck\".";

fn re_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(/?)([a-z0-9]+)[^>]*>").unwrap())
}

/// Every opened tag is closed in order, and no entity is cut in half.
fn assert_well_formed(html: &str) {
    let mut stack = Vec::new();
    let mut text = String::new();
    let mut last = 0;
    for caps in re_tag().captures_iter(html) {
        let whole = caps.get(0).unwrap();
        text.push_str(&html[last..whole.start()]);
        last = whole.end();
        let name = &caps[2];
        if name == "br" {
            continue;
        }
        if caps[1].is_empty() {
            stack.push(name.to_string());
        } else {
            assert_eq!(stack.pop().as_deref(), Some(name), "mismatched close in {html}");
        }
    }
    text.push_str(&html[last..]);
    assert!(stack.is_empty(), "unclosed {stack:?} in {html}");
    assert!(!text.contains('<') && !text.contains('>'), "raw markup in text of {html}");
    if let Some(amp) = text.rfind('&') {
        assert!(text[amp..].contains(';'), "partial entity at end of {html}");
    }
}

fn visible_text(html: &str) -> String {
    re_tag().replace_all(html, "").into_owned()
}

fn frames(pacing: Pacing, seed: u64) -> Vec<String> {
    let doc = parse(MESSAGE);
    let mut buf = MarkupBuffer::new();
    let mut reveal = Reveal::document(&mut buf, &doc, pacing).with_seed(seed);
    let mut snapshots = Vec::new();
    while reveal.next().is_some() {
        snapshots.push(reveal.mount().to_html());
    }
    assert_eq!(reveal.outcome(), Outcome::Completed);
    snapshots
}

#[test]
fn every_timer_frame_is_well_formed_and_grows() {
    let pacing = Pacing::PerGlyph {
        delay: Duration::from_millis(5),
    };
    let snapshots = frames(pacing, 0);
    let last = snapshots.last().unwrap();
    assert_eq!(*last, render_html(&parse(MESSAGE)));

    let full_text = visible_text(last);
    let mut previous = String::new();
    for html in &snapshots {
        assert_well_formed(html);
        let text = visible_text(html);
        assert!(full_text.starts_with(&text));
        assert!(text.starts_with(&previous), "frame rewrote earlier text");
        previous = text;
    }
}

#[test]
fn batched_frames_are_well_formed_for_several_seeds() {
    for seed in [1, 7, 42, 1000] {
        let pacing = Pacing::Batched {
            min: 2,
            max: 9,
            interval: Duration::from_millis(16),
        };
        let snapshots = frames(pacing, seed);
        for html in &snapshots {
            assert_well_formed(html);
        }
        assert_eq!(*snapshots.last().unwrap(), render_html(&parse(MESSAGE)));
    }
}

#[test]
fn detaching_mid_reveal_stops_all_writes() {
    let host = SharedMount::new(MarkupBuffer::new());
    let pacing = Pacing::PerGlyph {
        delay: Duration::ZERO,
    };
    let mut reveal = Reveal::document(host.clone(), &parse(MESSAGE), pacing);
    for _ in 0..10 {
        assert!(reveal.next().is_some());
    }
    host.detach();
    let writes = host.borrow().writes();

    assert_eq!(reveal.next(), None);
    assert_eq!(reveal.outcome(), Outcome::Cancelled);
    assert_eq!(host.borrow().writes(), writes);
    assert_eq!(host.borrow().to_html(), "");
}

#[test]
fn reveal_into_reused_target_does_not_leak_into_new_content() {
    let host = SharedMount::new(MarkupBuffer::new());
    let pacing = Pacing::PerGlyph {
        delay: Duration::ZERO,
    };
    let mut first = Reveal::document(host.clone(), &parse("first reply"), pacing);
    first.next();
    host.detach();

    let mut second = Reveal::document(host.clone(), &parse("second"), pacing);
    let _ = second.by_ref().count();
    assert_eq!(first.next(), None);
    assert_eq!(host.borrow().to_html(), "<p>second</p>");
    assert!(host.borrow().is_still_live(host.epoch()));
}

#[test]
fn empty_message_has_no_frames() {
    let mut buf = MarkupBuffer::new();
    let mut reveal = Reveal::document(&mut buf, &parse("\n\n"), Pacing::PerGlyph { delay: Duration::ZERO });
    assert_eq!(reveal.next(), None);
    assert_eq!(reveal.outcome(), Outcome::Completed);
    assert_eq!(buf.writes(), 0);
}
