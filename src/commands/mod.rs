pub mod chat;
pub mod classify;
pub mod init;
pub mod render;
pub mod reveal;
pub mod schema;

use std::io::{IsTerminal, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::Context;

use crate::config::Config;

/// How terminal-facing output is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Text,
    Json,
}

impl OutputFormat {
    /// `Pretty` on a terminal, `Text` otherwise.
    pub fn detect(format: Option<Self>) -> Self {
        format.unwrap_or_else(|| {
            if std::io::stdout().is_terminal() {
                Self::Pretty
            } else {
                Self::Text
            }
        })
    }
}

/// Read a whole input file, or stdin for `None` and `-`.
pub fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

/// Config from `--config`, or discovered from the current directory.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir().context("resolving current directory")?;
    Config::resolve(explicit, &cwd)
}

/// Flag set by Ctrl-C. The first press stops the running reveal; a second
/// press before the flag is cleared exits.
pub fn interrupt_flag() -> Arc<AtomicBool> {
    static FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();
    FLAG.get_or_init(|| {
        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = Arc::clone(&flag);
        let _ = ctrlc::set_handler(move || {
            if handler_flag.swap(true, Ordering::SeqCst) {
                std::process::exit(130);
            }
        });
        flag
    })
    .clone()
}
