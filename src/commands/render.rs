use std::path::PathBuf;

use clap::Args;

use super::read_input;
use super::reveal::{RevealStyle, reveal_document};
use crate::config::Config;
use crate::markup::{RenderOptions, parse_with, render_html};
use crate::reveal::{PRETTY_STYLE, TEXT_STYLE};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Markdown file to render (stdin when omitted or "-")
    pub input: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value = "html")]
    pub format: RenderFormat,
    /// Keep LinkedIn/Instagram link labels as text
    #[arg(long)]
    pub no_link_icons: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderFormat {
    /// Sanitized HTML fragment
    Html,
    /// Parsed document as JSON
    Json,
    /// Plain text layout
    Text,
    /// ANSI-styled text
    Pretty,
}

impl RenderArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let markdown = read_input(self.input.as_deref())?;
        let options = RenderOptions {
            link_icons: config.render.link_icons && !self.no_link_icons,
        };
        let document = parse_with(&markdown, options);
        tracing::debug!(blocks = document.len(), format = ?self.format, "rendering");

        match self.format {
            RenderFormat::Html => println!("{}", render_html(&document)),
            RenderFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
            RenderFormat::Text | RenderFormat::Pretty => {
                let style = if self.format == RenderFormat::Pretty {
                    &PRETTY_STYLE
                } else {
                    &TEXT_STYLE
                };
                reveal_document(std::io::stdout().lock(), &document, RevealStyle::instant(style), None);
            }
        }
        Ok(())
    }
}
