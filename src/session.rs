//! Conversations and the chat sessions that own them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::EscalationState;

/// Title a session carries until its first user message arrives.
pub const DEFAULT_TITLE: &str = "New chat";
/// Characters of the first user message kept as the session title.
pub const TITLE_CHARS: usize = 40;
/// Characters of the title shown in the history list.
pub const LABEL_CHARS: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only ordered sequence of turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent turns that fit in a request of `max_messages`, one slot
    /// being reserved for the system prompt the proxy prepends.
    pub fn window(&self, max_messages: usize) -> &[Turn] {
        window(&self.turns, max_messages)
    }
}

/// Latest turns of `turns` that fit a request of `max_messages` next to the
/// system prompt.
pub fn window(turns: &[Turn], max_messages: usize) -> &[Turn] {
    let keep = max_messages.saturating_sub(1);
    &turns[turns.len().saturating_sub(keep)..]
}

impl From<Vec<Turn>> for Conversation {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    text.char_indices().nth(max).map_or(text, |(idx, _)| &text[..idx])
}

/// One chat: its conversation, title, and escalation flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    conversation: Conversation,
    escalation: EscalationState,
}

impl Session {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(now: DateTime<Utc>) -> Self {
        Self {
            id: format!("c_{}", now.timestamp_millis()),
            title: DEFAULT_TITLE.to_string(),
            created_at: now,
            conversation: Conversation::new(),
            escalation: EscalationState::default(),
        }
    }

    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn turns(&self) -> &[Turn] {
        self.conversation.turns()
    }

    /// Whether the ticket affordance is showing for this session.
    pub const fn escalation_offered(&self) -> bool {
        self.escalation.offered()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.conversation.push(Turn::user(content));
    }

    /// Record an assistant reply, retitle the session from its first user
    /// message, and re-evaluate escalation. Returns whether a ticket should be
    /// offered.
    pub fn push_assistant(&mut self, content: impl Into<String>) -> bool {
        self.conversation.push(Turn::assistant(content));
        if self.title == DEFAULT_TITLE
            && let Some(first) = self.conversation.turns().first()
            && first.role == Role::User
        {
            self.title = truncate_chars(&first.content, TITLE_CHARS).to_string();
        }
        self.escalation.observe(self.conversation.turns())
    }

    /// Title as shown in the history list.
    pub fn label(&self) -> &str {
        truncate_chars(&self.title, LABEL_CHARS)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// All chats of one widget, newest first, with one selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sessions {
    chats: Vec<Session>,
    current: String,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::new()
    }
}

impl Sessions {
    /// Start with a single empty chat selected.
    pub fn new() -> Self {
        let first = Session::new();
        Self {
            current: first.id.clone(),
            chats: vec![first],
        }
    }

    /// Open a fresh chat at the top of the history and select it.
    pub fn new_chat(&mut self) -> &mut Session {
        let mut session = Session::new();
        while self.chats.iter().any(|c| c.id == session.id) {
            let bumped = session.created_at + chrono::Duration::milliseconds(1);
            session = Session::started_at(bumped);
        }
        tracing::debug!(id = %session.id, "new chat");
        self.current.clone_from(&session.id);
        self.chats.insert(0, session);
        &mut self.chats[0]
    }

    pub fn current(&self) -> &Session {
        self.chats
            .iter()
            .find(|c| c.id == self.current)
            .unwrap_or(&self.chats[0])
    }

    pub fn current_mut(&mut self) -> &mut Session {
        let idx = self
            .chats
            .iter()
            .position(|c| c.id == self.current)
            .unwrap_or(0);
        &mut self.chats[idx]
    }

    /// Select an existing chat. Returns false for an unknown id.
    pub fn switch(&mut self, id: &str) -> bool {
        if self.chats.iter().any(|c| c.id == id) {
            self.current = id.to_string();
            true
        } else {
            false
        }
    }

    pub fn chats(&self) -> &[Session] {
        &self.chats
    }

    /// History entries as `(id, label, selected)`.
    pub fn history(&self) -> impl Iterator<Item = (&str, &str, bool)> {
        self.chats
            .iter()
            .map(|c| (c.id.as_str(), c.label(), c.id == self.current))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn title_comes_from_first_user_message() {
        let mut s = Session::new();
        s.push_user("My laptop cannot reach the corporate VPN from the hotel Wi-Fi");
        assert_eq!(s.title, DEFAULT_TITLE);
        s.push_assistant("Try reconnecting.");
        assert_eq!(s.title, "My laptop cannot reach the corporate VPN");
        assert_eq!(s.title.chars().count(), TITLE_CHARS);

        s.push_user("something else entirely");
        s.push_assistant("ok");
        assert_eq!(s.title, "My laptop cannot reach the corporate VPN");
    }

    #[test]
    fn title_truncation_respects_char_boundaries() {
        let mut s = Session::new();
        s.push_user("é".repeat(50));
        s.push_assistant("…");
        assert_eq!(s.title, "é".repeat(40));
    }

    #[test]
    fn session_id_uses_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).single().expect("valid ts");
        assert_eq!(Session::started_at(at).id, "c_1700000000123");
    }

    #[test]
    fn push_assistant_reports_escalation() {
        let mut s = Session::new();
        s.push_user("wifi down");
        assert!(!s.push_assistant("try X"));
        s.push_user("still not fixed");
        assert!(s.push_assistant("try Y"));
        s.push_user("fixed, thanks");
        assert!(s.push_assistant("great"));
        assert!(s.escalation_offered());
    }

    #[test]
    fn window_keeps_latest_turns() {
        let conv: Conversation = (0..30).map(|i| Turn::user(i.to_string())).collect::<Vec<_>>().into();
        let window = conv.window(20);
        assert_eq!(window.len(), 19);
        assert_eq!(window[0].content, "11");
        assert_eq!(window[18].content, "29");
        assert_eq!(conv.window(100).len(), 30);
        assert!(conv.window(0).is_empty());
    }

    #[test]
    fn new_chat_goes_first_and_is_selected() {
        let mut sessions = Sessions::new();
        let first = sessions.current().id.clone();
        let second = sessions.new_chat().id.clone();
        assert_ne!(first, second);
        assert_eq!(sessions.chats()[0].id, second);
        assert_eq!(sessions.current().id, second);

        assert!(sessions.switch(&first));
        assert_eq!(sessions.current().id, first);
        assert!(!sessions.switch("c_missing"));
        assert_eq!(sessions.current().id, first);

        let selected: Vec<_> = sessions.history().filter(|(_, _, sel)| *sel).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, first);
    }

    #[test]
    fn label_is_capped() {
        let mut s = Session::new();
        s.title = "x".repeat(60);
        assert_eq!(s.label().len(), LABEL_CHARS);
    }

    #[test]
    fn sessions_survive_json() {
        let mut sessions = Sessions::new();
        let session = sessions.current_mut();
        session.push_user("vpn drops every hour");
        session.push_assistant("Reconnect and tell me if it persists.");
        session.push_user("still not fixed");
        session.push_assistant("Let's escalate.");

        let json = serde_json::to_string(&sessions).expect("serialize");
        let restored: Sessions = serde_json::from_str(&json).expect("deserialize");
        let (before, after) = (sessions.current(), restored.current());
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.turns(), before.turns());
        assert!(after.escalation_offered());
    }

    #[test]
    fn turns_serialize_with_lowercase_roles() {
        let json = serde_json::to_string(&Turn::assistant("hi")).expect("serialize");
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
