use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{OutputFormat, read_input};
use crate::error::ExitError;
use crate::escalation::{Decision, Trigger, classify};
use crate::session::Turn;

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// JSON conversation: an array of {role, content} or {"messages": [...]}
    /// (stdin when omitted or "-")
    pub input: Option<PathBuf>,
    /// The ticket affordance is already showing
    #[arg(long)]
    pub offered: bool,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConversationInput {
    Turns(Vec<Turn>),
    Wrapped { messages: Vec<Turn> },
}

impl ConversationInput {
    fn into_turns(self) -> Vec<Turn> {
        match self {
            Self::Turns(turns) | Self::Wrapped { messages: turns } => turns,
        }
    }
}

#[derive(Debug, Serialize)]
struct ClassifyReport {
    #[serde(flatten)]
    decision: Decision,
    turns: usize,
}

impl ClassifyArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let raw = read_input(self.input.as_deref())?;
        let turns = parse_conversation(&raw)?;
        let decision = classify(&turns, self.offered);
        tracing::debug!(?decision, "classified");

        match OutputFormat::detect(self.format) {
            OutputFormat::Json => {
                let report = ClassifyReport {
                    decision,
                    turns: turns.len(),
                };
                println!("{}", serde_json::to_string_pretty(&report).context("serializing decision")?);
            }
            OutputFormat::Pretty | OutputFormat::Text => {
                let reason = match decision.trigger {
                    Some(Trigger::AlreadyOffered) => "already offered",
                    Some(Trigger::NotResolved) => "user says the issue is not resolved",
                    Some(Trigger::SoftAck) => "soft acknowledgement after repeated replies",
                    None => "no trigger",
                };
                let verdict = if decision.offer { "offer ticket" } else { "keep chatting" };
                println!("{verdict} ({reason}; {} assistant turns)", decision.assistant_turns);
            }
        }
        Ok(())
    }
}

fn parse_conversation(raw: &str) -> anyhow::Result<Vec<Turn>> {
    serde_json::from_str::<ConversationInput>(raw)
        .map(ConversationInput::into_turns)
        .map_err(|e| ExitError::Other(format!("invalid conversation JSON: {e}")).into())
}
