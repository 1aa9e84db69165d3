//! The two external collaborators: a reply source ("send conversation,
//! receive reply text") and a ticket sink ("submit ticket fields, receive
//! ticket id or failure").

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::config::BackendConfig;
use crate::error::ExitError;
use crate::session::{Role, Turn, window};

/// Reply shown when the proxy answers with an empty string.
pub const EMPTY_REPLY: &str = "(No reply)";

pub trait ReplySource {
    /// Short name for logs and errors.
    fn name(&self) -> &str;

    fn reply(&self, conversation: &[Turn]) -> anyhow::Result<String>;
}

impl<T: ReplySource + ?Sized> ReplySource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn reply(&self, conversation: &[Turn]) -> anyhow::Result<String> {
        (**self).reply(conversation)
    }
}

// --- canned replies ---

fn re_vpn() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)vpn|wireguard|openvpn").expect("valid regex"))
}

fn re_mail() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)outlook|mail").expect("valid regex"))
}

const VPN_REPLY: &str = "**VPN Setup (Quick):**
1. Install your VPN client.
2. Import the config file (or login).
3. Click **Connect**.

*Tell me your OS and client (e.g., Windows + WireGuard) and I'll give exact steps.*";

const MAIL_REPLY: &str = "**Outlook fix checklist:**
- Restart Outlook
- Check **File → Account Settings**
- Verify **Work/School account** is signed in (MFA OK)
- **Send/Receive** → Update folders

*Want exact steps for Windows or macOS?*";

const DEMO_REPLY: &str = "I’m running in demo mode. Tell me your issue (e.g., **Teams mic not working on Mac**) and I’ll guide you step-by-step.";

/// Offline helpdesk answers keyed on the last message.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockReplies;

impl ReplySource for MockReplies {
    fn name(&self) -> &str {
        "mock"
    }

    fn reply(&self, conversation: &[Turn]) -> anyhow::Result<String> {
        let last = conversation.last().map_or("", |t| t.content.as_str());
        let reply = if re_vpn().is_match(last) {
            VPN_REPLY
        } else if re_mail().is_match(last) {
            MAIL_REPLY
        } else {
            DEMO_REPLY
        };
        Ok(reply.to_string())
    }
}

// --- HTTP ---

fn agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

fn request_error(endpoint: &str, timeout: Duration, err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Timeout(_) => ExitError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_secs: timeout.as_secs(),
        }
        .into(),
        ureq::Error::StatusCode(status) => ExitError::backend(endpoint, Some(status), "unexpected status").into(),
        other => ExitError::backend(endpoint, None, other.to_string()).into(),
    }
}

/// POST `body` as JSON; non-2xx responses become [`ExitError::Backend`] with
/// the response text, or [`ExitError::InvalidTicket`] for a 400 from the
/// ticket endpoint.
fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
    agent: &Agent,
    endpoint: &str,
    url: &str,
    timeout: Duration,
    body: &B,
) -> anyhow::Result<R> {
    let mut response = agent
        .post(url)
        .send_json(body)
        .map_err(|e| request_error(endpoint, timeout, e))?;
    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        let text = response.body_mut().read_to_string().unwrap_or_default();
        let text = text.trim();
        tracing::debug!(endpoint, status, body = text, "request rejected");
        return Err(if status == 400 && endpoint == TICKET_ENDPOINT {
            ExitError::InvalidTicket(text.to_string()).into()
        } else {
            ExitError::backend(endpoint, Some(status), text).into()
        });
    }
    response
        .body_mut()
        .read_json()
        .map_err(|e| ExitError::backend(endpoint, Some(status), format!("malformed response: {e}")).into())
}

/// GET `url` and decode the JSON body; non-2xx responses become
/// [`ExitError::Backend`].
fn get_json<R: for<'de> Deserialize<'de>>(
    agent: &Agent,
    endpoint: &str,
    url: &str,
    timeout: Duration,
) -> anyhow::Result<R> {
    let mut response = agent
        .get(url)
        .call()
        .map_err(|e| request_error(endpoint, timeout, e))?;
    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        let text = response.body_mut().read_to_string().unwrap_or_default();
        return Err(ExitError::backend(endpoint, Some(status), text.trim()).into());
    }
    response
        .body_mut()
        .read_json()
        .map_err(|e| ExitError::backend(endpoint, Some(status), format!("malformed response: {e}")).into())
}

const CHAT_ENDPOINT: &str = "chat proxy";
const TICKET_ENDPOINT: &str = "ticket endpoint";
const LIST_ENDPOINT: &str = "ticket list";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Turn],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    reply: Option<String>,
}

/// Chat proxy client: POST `{"messages": [...]}`, expect `{"reply": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpReplySource {
    agent: Agent,
    url: String,
    timeout: Duration,
    max_messages: usize,
}

impl HttpReplySource {
    pub fn new(url: impl Into<String>, timeout: Duration, max_messages: usize) -> Self {
        Self {
            agent: agent(timeout),
            url: url.into(),
            timeout,
            max_messages,
        }
    }
}

impl ReplySource for HttpReplySource {
    fn name(&self) -> &str {
        CHAT_ENDPOINT
    }

    fn reply(&self, conversation: &[Turn]) -> anyhow::Result<String> {
        let messages = window(conversation, self.max_messages);
        let _span = tracing::debug_span!("chat_request", url = %self.url, messages = messages.len()).entered();
        let response: ChatResponse =
            post_json(&self.agent, CHAT_ENDPOINT, &self.url, self.timeout, &ChatRequest { messages })?;
        Ok(response
            .reply
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string()))
    }
}

/// Use `secondary` whenever `primary` fails.
#[derive(Debug, Clone)]
pub struct Fallback<P, S> {
    primary: P,
    secondary: S,
}

impl<P: ReplySource, S: ReplySource> Fallback<P, S> {
    pub const fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: ReplySource, S: ReplySource> ReplySource for Fallback<P, S> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn reply(&self, conversation: &[Turn]) -> anyhow::Result<String> {
        match self.primary.reply(conversation) {
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::warn!(
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    "falling back: {e:#}"
                );
                self.secondary.reply(conversation)
            }
        }
    }
}

/// Reply source described by `config`.
pub fn reply_source(config: &BackendConfig) -> Box<dyn ReplySource> {
    match &config.chat_url {
        Some(url) if !config.mock => {
            let http = HttpReplySource::new(url.clone(), config.timeout(), config.max_messages);
            if config.fallback {
                Box::new(Fallback::new(http, MockReplies))
            } else {
                Box::new(http)
            }
        }
        _ => Box::new(MockReplies),
    }
}

// --- tickets ---

/// Ticket fields as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub subject: String,
    pub description: String,
    pub email: Option<String>,
    pub chat: Vec<Turn>,
}

impl TicketRequest {
    /// Trim the fields; a blank email counts as none.
    pub fn new(
        subject: &str,
        description: &str,
        email: Option<&str>,
        chat: Vec<Turn>,
    ) -> Self {
        Self {
            subject: subject.trim().to_string(),
            description: description.trim().to_string(),
            email: email.map(str::trim).filter(|e| !e.is_empty()).map(str::to_string),
            chat,
        }
    }

    /// Subject and description are required.
    pub fn validate(&self) -> Result<(), ExitError> {
        let missing: Vec<&str> = [("subject", &self.subject), ("description", &self.description)]
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| k)
            .collect();
        if !missing.is_empty() {
            return Err(ExitError::InvalidTicket(format!("{} required", missing.join(" and "))));
        }
        if let Some(email) = &self.email
            && !email.contains('@')
        {
            return Err(ExitError::InvalidTicket(format!("not an email address: {email}")));
        }
        Ok(())
    }

    /// User turns in the attached chat.
    pub fn user_turns(&self) -> usize {
        self.chat.iter().filter(|t| t.role == Role::User).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub String);

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl TicketId {
    /// Ticket stores hand out either string or numeric ids.
    fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self(s)),
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

/// One row of the ticket list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketSummary {
    pub id: TicketId,
    pub subject: String,
    pub status: String,
    pub created_at: Option<String>,
    pub email: Option<String>,
}

pub trait TicketSink {
    fn submit(&mut self, ticket: &TicketRequest) -> anyhow::Result<TicketId>;

    /// Known tickets, newest first.
    fn list(&self) -> anyhow::Result<Vec<TicketSummary>>;
}

impl<T: TicketSink + ?Sized> TicketSink for Box<T> {
    fn submit(&mut self, ticket: &TicketRequest) -> anyhow::Result<TicketId> {
        (**self).submit(ticket)
    }

    fn list(&self) -> anyhow::Result<Vec<TicketSummary>> {
        (**self).list()
    }
}

#[derive(Debug, Deserialize)]
struct TicketResponse {
    #[serde(default)]
    ok: bool,
    id: Option<serde_json::Value>,
}

impl TicketResponse {
    fn into_id(self) -> anyhow::Result<TicketId> {
        self.id
            .filter(|_| self.ok)
            .and_then(TicketId::from_json)
            .ok_or_else(|| ExitError::backend(TICKET_ENDPOINT, None, "response carried no ticket id").into())
    }
}

#[derive(Debug, Deserialize)]
struct TicketRow {
    id: serde_json::Value,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl TicketRow {
    fn into_summary(self) -> Option<TicketSummary> {
        Some(TicketSummary {
            id: TicketId::from_json(self.id)?,
            subject: self.subject,
            status: self.status.unwrap_or_else(|| "open".to_string()),
            created_at: self.created_at,
            email: self.email,
        })
    }
}

/// Ticket endpoint client: POST the fields, expect `{"ok": true, "id": ...}`.
#[derive(Debug, Clone)]
pub struct HttpTicketSink {
    agent: Agent,
    url: String,
    list_url: Option<String>,
    timeout: Duration,
}

impl HttpTicketSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: agent(timeout),
            url: url.into(),
            list_url: None,
            timeout,
        }
    }

    #[must_use]
    pub fn with_list_url(mut self, list_url: Option<String>) -> Self {
        self.list_url = list_url;
        self
    }
}

impl TicketSink for HttpTicketSink {
    fn submit(&mut self, ticket: &TicketRequest) -> anyhow::Result<TicketId> {
        ticket.validate()?;
        let response: TicketResponse = post_json(&self.agent, TICKET_ENDPOINT, &self.url, self.timeout, ticket)?;
        let id = response.into_id()?;
        tracing::info!(%id, "ticket created");
        Ok(id)
    }

    fn list(&self) -> anyhow::Result<Vec<TicketSummary>> {
        let Some(url) = &self.list_url else {
            return Err(ExitError::Config("backend.list_url is not set".into()).into());
        };
        let rows: Vec<TicketRow> = get_json(&self.agent, LIST_ENDPOINT, url, self.timeout)?;
        let total = rows.len();
        let tickets: Vec<TicketSummary> = rows.into_iter().filter_map(TicketRow::into_summary).collect();
        if tickets.len() < total {
            tracing::warn!(skipped = total - tickets.len(), "ticket rows without a usable id");
        }
        Ok(tickets)
    }
}

/// Tickets kept in memory with sequential ids, for demo mode and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTickets {
    tickets: Vec<(TicketId, TicketRequest)>,
    created: Vec<String>,
}

impl InMemoryTickets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tickets(&self) -> &[(TicketId, TicketRequest)] {
        &self.tickets
    }
}

impl TicketSink for InMemoryTickets {
    fn submit(&mut self, ticket: &TicketRequest) -> anyhow::Result<TicketId> {
        ticket.validate()?;
        let id = TicketId(format!("T-{:04}", self.tickets.len() + 1));
        tracing::info!(%id, "ticket stored in memory");
        self.tickets.push((id.clone(), ticket.clone()));
        self.created.push(chrono::Utc::now().to_rfc3339());
        Ok(id)
    }

    fn list(&self) -> anyhow::Result<Vec<TicketSummary>> {
        Ok(self
            .tickets
            .iter()
            .zip(&self.created)
            .rev()
            .map(|((id, ticket), created_at)| TicketSummary {
                id: id.clone(),
                subject: ticket.subject.clone(),
                status: "open".to_string(),
                created_at: Some(created_at.clone()),
                email: ticket.email.clone(),
            })
            .collect())
    }
}

/// Ticket sink described by `config`.
pub fn ticket_sink(config: &BackendConfig) -> Box<dyn TicketSink> {
    match &config.ticket_url {
        Some(url) if !config.mock => Box::new(
            HttpTicketSink::new(url.clone(), config.timeout()).with_list_url(config.list_url.clone()),
        ),
        _ => Box::new(InMemoryTickets::new()),
    }
}
