use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Args;

use super::{OutputFormat, interrupt_flag, read_input};
use crate::config::{Config, RevealMode};
use crate::error::ExitError;
use crate::markup::{Document, parse_with};
use crate::reveal::{Outcome, PRETTY_STYLE, Pacing, Reveal, TEXT_STYLE, TerminalMount, ThreadClock};

#[derive(Debug, Args)]
pub struct RevealArgs {
    /// Markdown file to reveal (stdin when omitted or "-")
    pub input: Option<PathBuf>,
    /// Pacing mode (defaults to reveal.mode from config)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
    /// Delay between glyphs in timer mode, or between batches in frame mode
    #[arg(long)]
    pub delay_ms: Option<u64>,
    /// Seed for frame-mode batch sizes
    #[arg(long)]
    pub seed: Option<u64>,
    /// Output format (pretty or text; json is not supported here)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ModeArg {
    Timer,
    Frame,
}

impl RevealArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let style = match OutputFormat::detect(self.format) {
            OutputFormat::Pretty => &PRETTY_STYLE,
            OutputFormat::Text => &TEXT_STYLE,
            OutputFormat::Json => {
                return Err(ExitError::Other("reveal writes to a terminal; use `render --format json`".into()).into());
            }
        };

        let mut reveal_config = config.reveal.clone();
        if let Some(mode) = self.mode {
            reveal_config.mode = match mode {
                ModeArg::Timer => RevealMode::Timer,
                ModeArg::Frame => RevealMode::Frame,
            };
        }
        if let Some(delay) = self.delay_ms {
            match reveal_config.mode {
                RevealMode::Timer => reveal_config.char_delay_ms = delay,
                RevealMode::Frame => reveal_config.frame_interval_ms = delay,
            }
        }

        let markdown = read_input(self.input.as_deref())?;
        let document = parse_with(&markdown, config.render_options());
        let stop = interrupt_flag();

        let stdout = std::io::stdout();
        let outcome = reveal_document(
            stdout.lock(),
            &document,
            RevealStyle {
                style,
                pacing: reveal_config.pacing(),
                seed: self.seed,
            },
            Some(&*stop),
        );
        stop.store(false, Ordering::SeqCst);

        if outcome == Outcome::Cancelled {
            tracing::info!("reveal interrupted");
        }
        Ok(())
    }
}

/// How a document is typed out.
#[derive(Debug, Clone, Copy)]
pub struct RevealStyle {
    pub style: &'static crate::reveal::Style,
    pub pacing: Pacing,
    pub seed: Option<u64>,
}

impl RevealStyle {
    /// No delay between frames; used to print a whole document at once.
    pub const fn instant(style: &'static crate::reveal::Style) -> Self {
        Self {
            style,
            pacing: Pacing::PerGlyph {
                delay: Duration::ZERO,
            },
            seed: None,
        }
    }
}

/// Type `document` into `out` on the wall clock, finishing the last line
/// whether or not the reveal completed.
pub fn reveal_document<W: Write>(
    out: W,
    document: &Document,
    how: RevealStyle,
    stop: Option<&AtomicBool>,
) -> Outcome {
    let mut term = TerminalMount::new(out, how.style);
    let outcome = {
        let mut reveal = Reveal::document(&mut term, document, how.pacing);
        if let Some(seed) = how.seed {
            reveal = reveal.with_seed(seed);
        }
        reveal.run(&mut ThreadClock, stop)
    };
    term.finish();
    outcome
}
