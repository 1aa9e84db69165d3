//! When to offer a human hand-off (support ticket).
//!
//! Two-state machine per conversation: `NotOffered -> Offered`, where
//! `Offered` is absorbing. The lexicons are literal on purpose; they match
//! the widget's historical behaviour, false positives included.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::session::{Role, Turn};

/// Assistant turns required before a "not resolved" reply can trigger.
pub const NOT_RESOLVED_MIN_ASSISTANT_TURNS: usize = 1;
/// Assistant turns required before a soft acknowledgement can trigger.
pub const SOFT_ACK_MIN_ASSISTANT_TURNS: usize = 2;

fn re_not_resolved() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:not\s+fixed|still\s+not|(?:doesn['’]?t|does\s+not|didn['’]?t|did\s+not|isn['’]?t|is\s+not)\s+work(?:ing)?|not\s+working|no\s+luck)\b",
        )
        .expect("not-resolved lexicon is valid")
    })
}

fn re_soft_ack() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:ok|okay|hmm+|still|same|nope)\b").expect("soft-ack lexicon is valid")
    })
}

/// Which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    AlreadyOffered,
    NotResolved,
    SoftAck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub offer: bool,
    pub trigger: Option<Trigger>,
    pub assistant_turns: usize,
}

/// Whether `text` reads as "that didn't fix it".
pub fn is_not_resolved(text: &str) -> bool {
    re_not_resolved().is_match(text)
}

/// Whether `text` is a short acknowledgement that suggests nothing changed.
pub fn is_soft_ack(text: &str) -> bool {
    re_soft_ack().is_match(text)
}

/// Evaluate the rules over the conversation so far.
pub fn classify(conversation: &[Turn], already_offered: bool) -> Decision {
    let assistant_turns = conversation
        .iter()
        .filter(|t| t.role == Role::Assistant)
        .count();
    let last_user = conversation
        .iter()
        .rev()
        .find(|t| t.role == Role::User)
        .map_or("", |t| t.content.as_str());

    let trigger = if already_offered {
        Some(Trigger::AlreadyOffered)
    } else if is_not_resolved(last_user) && assistant_turns >= NOT_RESOLVED_MIN_ASSISTANT_TURNS {
        Some(Trigger::NotResolved)
    } else if is_soft_ack(last_user) && assistant_turns >= SOFT_ACK_MIN_ASSISTANT_TURNS {
        Some(Trigger::SoftAck)
    } else {
        None
    };

    Decision {
        offer: trigger.is_some(),
        trigger,
        assistant_turns,
    }
}

/// Pure decision: should the ticket affordance be visible?
pub fn should_offer(conversation: &[Turn], already_offered: bool) -> bool {
    classify(conversation, already_offered).offer
}

/// Per-conversation escalation flag. Starts false, flips at most once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationState {
    offered: bool,
}

impl EscalationState {
    pub const fn offered(self) -> bool {
        self.offered
    }

    /// Re-evaluate after an assistant turn. Returns the (possibly unchanged)
    /// offer flag; once true it stays true.
    pub fn observe(&mut self, conversation: &[Turn]) -> bool {
        let decision = classify(conversation, self.offered);
        if decision.offer && !self.offered {
            tracing::info!(
                trigger = ?decision.trigger,
                assistant_turns = decision.assistant_turns,
                "escalation offered"
            );
            self.offered = true;
        }
        self.offered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(turns: &[(&str, &str)]) -> Vec<Turn> {
        turns
            .iter()
            .map(|(role, content)| match *role {
                "user" => Turn::user(*content),
                _ => Turn::assistant(*content),
            })
            .collect()
    }

    #[test]
    fn not_resolved_after_one_reply() {
        let c = conv(&[("user", "wifi down"), ("assistant", "try X"), ("user", "still not fixed")]);
        assert!(should_offer(&c, false));
        assert_eq!(classify(&c, false).trigger, Some(Trigger::NotResolved));
    }

    #[test]
    fn soft_ack_needs_two_replies() {
        let c = conv(&[
            ("user", "wifi down"),
            ("assistant", "try X"),
            ("user", "ok"),
            ("assistant", "try Y"),
            ("user", "hmm"),
        ]);
        assert!(!should_offer(&c[..3], false));
        assert!(should_offer(&c, false));
        assert_eq!(classify(&c, false).trigger, Some(Trigger::SoftAck));
    }

    #[test]
    fn fixed_is_not_offered() {
        let c = conv(&[("user", "wifi down"), ("assistant", "try X"), ("user", "thanks, fixed")]);
        assert!(!should_offer(&c, false));
    }

    #[test]
    fn nothing_before_first_reply() {
        let c = conv(&[("user", "it doesn't work")]);
        assert!(!should_offer(&c, false));
        assert!(!should_offer(&[], false));
    }

    #[test]
    fn already_offered_is_absorbing() {
        let c = conv(&[("user", "all good now, thanks")]);
        assert!(should_offer(&c, true));
        assert!(should_offer(&[], true));
    }

    #[test]
    fn not_resolved_variants() {
        for text in [
            "It's not fixed",
            "STILL NOT connecting",
            "this doesn't work",
            "that doesn’t work either",
            "does not work",
            "didn't work",
            "VPN not working",
            "no luck",
        ] {
            assert!(is_not_resolved(text), "{text:?} should read as unresolved");
        }
        for text in ["works now", "fixed, thanks", "nothing to add", "notable"] {
            assert!(!is_not_resolved(text), "{text:?} should not read as unresolved");
        }
    }

    #[test]
    fn soft_ack_words_are_whole_words() {
        for text in ["ok", "Okay.", "hmmm", "same thing", "nope", "still"] {
            assert!(is_soft_ack(text), "{text:?} should be a soft ack");
        }
        for text in ["token expired", "booking", "samesite cookie"] {
            assert!(!is_soft_ack(text), "{text:?} should not be a soft ack");
        }
    }

    #[test]
    fn soft_ack_keeps_literal_false_positives() {
        let c = conv(&[
            ("user", "outlook crashes"),
            ("assistant", "try safe mode"),
            ("user", "it opens"),
            ("assistant", "now repair the profile"),
            ("user", "ok, let's try that"),
        ]);
        assert!(should_offer(&c, false));
    }

    #[test]
    fn state_is_monotonic_over_extensions() {
        let c = conv(&[
            ("user", "printer offline"),
            ("assistant", "power cycle it"),
            ("user", "no luck"),
            ("assistant", "reinstall the driver"),
            ("user", "great, fixed!"),
            ("assistant", "glad to hear"),
            ("user", "thanks"),
        ]);
        let mut state = EscalationState::default();
        for end in 1..=c.len() {
            let before = state.offered();
            let offered = state.observe(&c[..end]);
            assert_eq!(offered, should_offer(&c[..end], before));
            if before {
                assert!(offered, "offer retracted at prefix {end}");
            }
        }
        assert!(!should_offer(&c, false), "last turn alone would not trigger");
        assert!(state.offered());
    }

    #[test]
    fn offer_survives_every_extension() {
        let bases: &[&[(&str, &str)]] = &[
            &[("user", "wifi down")],
            &[("user", "wifi down"), ("assistant", "try X")],
            &[("user", "vpn"), ("assistant", "reconnect"), ("user", "still not fixed")],
            &[("user", "mail"), ("assistant", "restart"), ("user", "ok"), ("assistant", "repair"), ("user", "hmm")],
            &[("user", "printer"), ("assistant", "power cycle"), ("user", "thanks, fixed")],
        ];
        let tails: &[&[(&str, &str)]] = &[
            &[("assistant", "try Y"), ("user", "same")],
            &[("assistant", "try Z"), ("user", "doesn't work")],
            &[("assistant", "done?"), ("user", "great, fixed now")],
        ];

        // Every sequence of up to three tails, including none.
        let mut extensions: Vec<Vec<usize>> = vec![Vec::new()];
        let mut frontier: Vec<Vec<usize>> = vec![Vec::new()];
        for _ in 0..3 {
            frontier = frontier
                .iter()
                .flat_map(|ext| {
                    (0..tails.len()).map(move |t| {
                        let mut next = ext.clone();
                        next.push(t);
                        next
                    })
                })
                .collect();
            extensions.extend(frontier.iter().cloned());
        }
        assert_eq!(extensions.len(), 1 + 3 + 9 + 27);

        for base in bases {
            for ext in &extensions {
                let mut turns = base.to_vec();
                for &t in ext {
                    turns.extend_from_slice(tails[t]);
                }
                let c = conv(&turns);

                let mut state = EscalationState::default();
                let mut first_offer = None;
                for end in 1..=c.len() {
                    let before = state.offered();
                    let offered = state.observe(&c[..end]);
                    assert_eq!(offered, should_offer(&c[..end], before), "{turns:?} at {end}");
                    assert!(!before || offered, "offer retracted in {turns:?} at {end}");
                    if first_offer.is_none() && should_offer(&c[..end], false) {
                        first_offer = Some(end);
                    }
                }
                if let Some(end) = first_offer {
                    assert!(state.offered(), "{turns:?} offered at {end} but not at the end");
                }
            }
        }
    }
}
