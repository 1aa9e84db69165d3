mod backend;
mod commands;
mod config;
mod error;
mod escalation;
mod markup;
mod reveal;
mod session;
mod telemetry;
mod template;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use commands::chat::ChatArgs;
use commands::classify::ClassifyArgs;
use commands::init::InitArgs;
use commands::render::RenderArgs;
use commands::reveal::RevealArgs;

#[derive(Debug, Parser)]
#[command(
    name = "deskchat",
    version,
    about = "Helpdesk chat: render markdown replies, type them out, and escalate to tickets"
)]
struct Cli {
    /// Config file (default: .deskchat.toml or .deskchat.json in the current
    /// directory, then the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a markdown message as HTML, JSON, or terminal text
    Render(RenderArgs),
    /// Type a markdown message out in the terminal
    Reveal(RevealArgs),
    /// Decide whether a conversation should be offered a support ticket
    Classify(ClassifyArgs),
    /// Chat with the helpdesk assistant
    Chat(ChatArgs),
    /// Write a .deskchat.toml
    Init(InitArgs),
    /// Print the JSON Schema for .deskchat.toml
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Render(_) => "render",
            Self::Reveal(_) => "reveal",
            Self::Classify(_) => "classify",
            Self::Chat(_) => "chat",
            Self::Init(_) => "init",
            Self::Schema => "schema",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    telemetry::init(cli.verbose);

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match &cli.command {
        Commands::Render(args) => commands::load_config(cli.config.as_deref()).and_then(|c| args.execute(&c)),
        Commands::Reveal(args) => commands::load_config(cli.config.as_deref()).and_then(|c| args.execute(&c)),
        Commands::Classify(args) => args.execute(),
        Commands::Chat(args) => commands::load_config(cli.config.as_deref()).and_then(|c| args.execute(&c)),
        Commands::Init(args) => args.execute(),
        Commands::Schema => commands::schema::run_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
