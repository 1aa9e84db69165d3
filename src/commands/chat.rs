use std::io::{BufRead, IsTerminal};
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Args;

use super::reveal::{RevealStyle, reveal_document};
use super::{OutputFormat, interrupt_flag};
use crate::backend::{self, ReplySource, TicketRequest, TicketSink};
use crate::config::Config;
use crate::error::ExitError;
use crate::markup::parse_with;
use crate::reveal::{Outcome, PRETTY_STYLE, Style, TEXT_STYLE};
use crate::session::Sessions;
use crate::template::{TicketContext, default_subject, render_ticket_description};

const HELP: &str = "Commands: /new  /history  /switch <n>  /ticket  /tickets  /help  /quit";
const TICKET_HINT: &str = "Still stuck? Type /ticket to open a support ticket.";

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Print replies at once instead of typing them out
    #[arg(long)]
    pub no_reveal: bool,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

/// Where user lines come from: prompts on a terminal, plain lines otherwise.
enum LineSource {
    Interactive,
    Piped(std::io::Lines<std::io::StdinLock<'static>>),
}

impl LineSource {
    fn detect() -> Self {
        if std::io::stdin().is_terminal() {
            Self::Interactive
        } else {
            Self::Piped(std::io::stdin().lock().lines())
        }
    }

    const fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Next line, or None at end of input.
    fn read(&mut self, prompt: &str) -> Result<Option<String>> {
        match self {
            Self::Interactive => dialoguer::Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .map(Some)
                .context("reading user input"),
            Self::Piped(lines) => lines.next().transpose().context("reading stdin"),
        }
    }

    /// Answer for a follow-up question; piped input takes the default.
    fn ask(&mut self, prompt: &str, default: &str) -> Result<String> {
        match self {
            Self::Interactive => {
                let mut input = dialoguer::Input::<String>::new()
                    .with_prompt(prompt)
                    .allow_empty(true);
                if !default.is_empty() {
                    input = input.default(default.to_string());
                }
                input.interact_text().context("reading user input")
            }
            Self::Piped(_) => Ok(default.to_string()),
        }
    }
}

/// Everything one chat run needs.
struct ChatHost<'a> {
    config: &'a Config,
    sessions: Sessions,
    replies: Box<dyn ReplySource>,
    tickets: Box<dyn TicketSink>,
    style: &'static Style,
    reveal: bool,
}

impl ChatArgs {
    pub fn execute(&self, config: &Config) -> Result<()> {
        let style = match OutputFormat::detect(self.format) {
            OutputFormat::Pretty => &PRETTY_STYLE,
            OutputFormat::Text => &TEXT_STYLE,
            OutputFormat::Json => {
                return Err(ExitError::Other("chat is interactive; json output is not supported".into()).into());
            }
        };
        let mut input = LineSource::detect();
        let mut host = ChatHost {
            config,
            sessions: Sessions::new(),
            replies: backend::reply_source(&config.backend),
            tickets: backend::ticket_sink(&config.backend),
            style,
            reveal: !self.no_reveal && input.is_interactive(),
        };
        tracing::info!(replies = host.replies.name(), "chat started");

        if input.is_interactive() {
            println!("{} is here to help. {HELP}", config.assistant.name);
        }

        while let Some(line) = input.read("you")? {
            let line = line.trim();
            match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
                ("", _) => {}
                ("/quit" | "/exit", _) => break,
                ("/help", _) => println!("{HELP}"),
                ("/new", _) => {
                    host.sessions.new_chat();
                    println!("Started a new chat.");
                }
                ("/history", _) => host.print_history(),
                ("/switch", arg) => host.switch(arg),
                ("/ticket", _) => host.file_ticket(&mut input)?,
                ("/tickets", _) => host.list_tickets(),
                _ => host.send(line)?,
            }
        }
        Ok(())
    }
}

impl ChatHost<'_> {
    fn send(&mut self, text: &str) -> Result<()> {
        let session = self.sessions.current_mut();
        session.push_user(text);
        let _span = tracing::info_span!("turn", chat = %session.id, turns = session.turns().len()).entered();

        let reply = match self.replies.reply(session.turns()) {
            Ok(reply) => reply,
            Err(e) => {
                eprintln!("error: {e:#}");
                return Ok(());
            }
        };

        let was_offered = session.escalation_offered();
        let offer = session.push_assistant(reply.as_str());

        let document = parse_with(&reply, self.config.render_options());
        let how = if self.reveal {
            RevealStyle {
                style: self.style,
                pacing: self.config.reveal.pacing(),
                seed: None,
            }
        } else {
            RevealStyle::instant(self.style)
        };
        let stop = interrupt_flag();
        let outcome = reveal_document(std::io::stdout().lock(), &document, how, Some(&*stop));
        stop.store(false, Ordering::SeqCst);
        if outcome == Outcome::Cancelled {
            println!("{}[reply cut short]{}", self.style.italic, self.style.reset);
        }
        println!("{}  {}{}", self.style.italic, self.config.assistant.name, self.style.reset);

        if offer && !was_offered {
            println!("{TICKET_HINT}");
        }
        Ok(())
    }

    fn print_history(&self) {
        for (i, (_, label, selected)) in self.sessions.history().enumerate() {
            let marker = if selected { "*" } else { " " };
            println!("{marker} {}. {label}", i + 1);
        }
    }

    fn switch(&mut self, arg: &str) {
        let target = arg
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.sessions.chats().get(i))
            .map(|s| s.id.clone());
        match target {
            Some(id) if self.sessions.switch(&id) => {
                let session = self.sessions.current();
                println!("Switched to \"{}\" ({} messages).", session.label(), session.turns().len());
            }
            _ => println!("No chat {arg:?}; see /history."),
        }
    }

    fn file_ticket(&mut self, input: &mut LineSource) -> Result<()> {
        let session = self.sessions.current();
        if !session.escalation_offered() {
            println!("Tickets open once the assistant has tried to help and the issue persists.");
            return Ok(());
        }

        let subject = input.ask("Subject", &default_subject(session))?;
        let email = input.ask("Email (optional)", "")?;
        let summary = input.ask("What is still wrong? (optional)", "")?;
        let ctx = TicketContext::from_session(session, &self.config.assistant.name, Some(summary.as_str()));
        let description = render_ticket_description(&ctx)?;
        let request = TicketRequest::new(&subject, &description, Some(email.as_str()), session.turns().to_vec());

        match self.tickets.submit(&request) {
            Ok(id) => println!("Ticket {id} created. A technician will follow up."),
            Err(e) => eprintln!("error: {e:#}"),
        }
        Ok(())
    }

    fn list_tickets(&self) {
        let tickets = match self.tickets.list() {
            Ok(tickets) => tickets,
            Err(e) => {
                eprintln!("error: {e:#}");
                return;
            }
        };
        if tickets.is_empty() {
            println!("No tickets yet.");
        }
        for ticket in tickets {
            let created = ticket.created_at.as_deref().map(short_date).unwrap_or_default();
            println!("{:<8} {:<8} {:<10} {}", ticket.id, ticket.status, created, ticket.subject);
        }
    }
}

/// `YYYY-MM-DD` from an RFC 3339 timestamp, or the raw text when it does not parse.
fn short_date(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map_or_else(|_| timestamp.to_string(), |t| t.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_date_trims_timestamps() {
        assert_eq!(short_date("2024-05-01T10:00:00Z"), "2024-05-01");
        assert_eq!(short_date("2024-05-01T23:30:00.123+02:00"), "2024-05-01");
        assert_eq!(short_date("yesterday"), "yesterday");
    }
}
