//! Template rendering for ticket descriptions.

use minijinja::Environment;
use serde::Serialize;

use crate::session::{Session, Turn};

const TICKET_TEMPLATE: &str = include_str!("templates/ticket.md.jinja");

/// Summary used when the user gives none.
pub const DEFAULT_SUMMARY: &str = "Escalated from chat: self-service steps did not resolve the issue.";

/// Context data passed to the ticket template
#[derive(Debug, Serialize)]
pub struct TicketContext<'a> {
    /// First line of the description
    pub summary: &'a str,
    pub title: &'a str,
    /// Session start, RFC 3339
    pub started: String,
    /// Display name for assistant turns
    pub assistant: &'a str,
    pub turns: &'a [Turn],
}

impl<'a> TicketContext<'a> {
    pub fn from_session(session: &'a Session, assistant: &'a str, summary: Option<&'a str>) -> Self {
        Self {
            summary: summary.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SUMMARY),
            title: &session.title,
            started: session.created_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            assistant,
            turns: session.turns(),
        }
    }
}

/// Render the ticket description for a conversation
pub fn render_ticket_description(ctx: &TicketContext<'_>) -> anyhow::Result<String> {
    let mut env = Environment::new();
    env.add_template("ticket.md", TICKET_TEMPLATE)?;

    let template = env.get_template("ticket.md")?;
    let rendered = template.render(ctx)?;

    Ok(rendered)
}

/// Default ticket subject: the session title, or the first user message when
/// the session was never titled.
pub fn default_subject(session: &Session) -> String {
    if session.title == crate::session::DEFAULT_TITLE {
        session
            .turns()
            .first()
            .map_or_else(String::new, |t| t.content.chars().take(crate::session::TITLE_CHARS).collect())
    } else {
        session.title.clone()
    }
}
