use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{self, Config};
use crate::error::ExitError;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to write .deskchat.toml into (default: current directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Write into the per-user config directory instead
    #[arg(long, conflicts_with = "dir")]
    pub user: bool,
    /// Assistant display name
    #[arg(long)]
    pub name: Option<String>,
    /// Chat proxy URL (omit for canned replies)
    #[arg(long)]
    pub chat_url: Option<String>,
    /// Ticket endpoint URL (omit for in-memory tickets)
    #[arg(long)]
    pub ticket_url: Option<String>,
    /// Ticket listing URL
    #[arg(long)]
    pub list_url: Option<String>,
    /// Non-interactive mode
    #[arg(long)]
    pub no_interactive: bool,
    /// Force overwrite existing config
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn execute(&self) -> Result<()> {
        let dir = if self.user {
            config::user_config_dir()
                .ok_or_else(|| ExitError::Config("no per-user config directory on this platform".into()))?
        } else {
            match &self.dir {
                Some(dir) => dir.clone(),
                None => std::env::current_dir().context("resolving current directory")?,
            }
        };

        let config_path = dir.join(config::CONFIG_TOML);
        if config_path.exists() && !self.force {
            return Err(ExitError::Config(format!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            ))
            .into());
        }

        let interactive = !self.no_interactive && std::io::stdin().is_terminal();
        let config = self.build_config(interactive)?;

        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        fs::write(&config_path, config.to_toml()?)
            .with_context(|| format!("writing {}", config_path.display()))?;
        println!("Generated {}", config_path.display());
        Ok(())
    }

    fn build_config(&self, interactive: bool) -> Result<Config> {
        let mut config = Config::default();

        if let Some(name) = &self.name {
            config.assistant.name.clone_from(name);
        } else if interactive {
            config.assistant.name = prompt_input("Assistant name", Some(&config.assistant.name))?;
        }

        config.backend.chat_url = if self.chat_url.is_some() {
            self.chat_url.clone()
        } else if interactive {
            optional(prompt_input("Chat proxy URL (blank for canned replies)", Some(""))?)
        } else {
            None
        };
        if let Some(url) = &config.backend.chat_url {
            validate_url(url, "chat URL")?;
        }

        config.backend.ticket_url = if self.ticket_url.is_some() {
            self.ticket_url.clone()
        } else if interactive {
            optional(prompt_input("Ticket endpoint URL (blank for in-memory tickets)", Some(""))?)
        } else {
            None
        };
        if let Some(url) = &config.backend.ticket_url {
            validate_url(url, "ticket URL")?;
        }

        config.backend.list_url.clone_from(&self.list_url);
        if let Some(url) = &config.backend.list_url {
            validate_url(url, "ticket list URL")?;
        }

        if interactive {
            config.render.link_icons = prompt_confirm("Show icons for LinkedIn/Instagram links?", true)?;
        }

        Ok(config)
    }
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn validate_url(url: &str, label: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ExitError::Config(format!("{label} must start with http:// or https://, got {url:?}")).into())
    }
}

// --- Interactive prompts using dialoguer ---

fn prompt_input(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut builder = dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true);
    if let Some(d) = default {
        builder = builder.default(d.to_string()).show_default(!d.is_empty());
    }
    builder.interact_text().context("reading user input")
}

fn prompt_confirm(prompt: &str, default: bool) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .context("reading user confirmation")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dir: &std::path::Path) -> InitArgs {
        InitArgs {
            dir: Some(dir.to_path_buf()),
            user: false,
            name: None,
            chat_url: None,
            ticket_url: None,
            list_url: None,
            no_interactive: true,
            force: false,
        }
    }

    #[test]
    fn writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        args(dir.path()).execute().unwrap();
        let config = Config::load(&dir.path().join(config::CONFIG_TOML)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        args(dir.path()).execute().unwrap();
        let err = args(dir.path()).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<ExitError>(), Some(ExitError::Config(_))));

        let mut forced = args(dir.path());
        forced.force = true;
        forced.name = Some("Desk".into());
        forced.execute().unwrap();
        let config = Config::load(&dir.path().join(config::CONFIG_TOML)).unwrap();
        assert_eq!(config.assistant.name, "Desk");
    }

    #[test]
    fn rejects_non_http_urls() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path());
        a.chat_url = Some("ftp://example.test".into());
        assert!(a.execute().is_err());
        assert!(!dir.path().join(config::CONFIG_TOML).exists());
    }

    #[test]
    fn records_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path());
        a.ticket_url = Some("https://desk.test/ticket".into());
        a.list_url = Some("https://desk.test/tickets".into());
        a.execute().unwrap();
        let config = Config::load(&dir.path().join(config::CONFIG_TOML)).unwrap();
        assert_eq!(config.backend.ticket_url.as_deref(), Some("https://desk.test/ticket"));
        assert_eq!(config.backend.list_url.as_deref(), Some("https://desk.test/tickets"));
        assert_eq!(config.backend.chat_url, None);
    }

    #[test]
    fn optional_trims_blank() {
        assert_eq!(optional("  ".into()), None);
        assert_eq!(optional(" https://x.test ".into()), Some("https://x.test".into()));
    }
}
