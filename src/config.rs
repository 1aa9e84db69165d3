use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ExitError;
use crate::markup::RenderOptions;
use crate::reveal::Pacing;

/// Config file name constants.
pub const CONFIG_TOML: &str = ".deskchat.toml";
pub const CONFIG_JSON: &str = ".deskchat.json";

/// Find the config file path, preferring .deskchat.toml over .deskchat.json.
/// Returns None if neither exists.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let toml_path = dir.join(CONFIG_TOML);
    if toml_path.exists() {
        return Some(toml_path);
    }
    let json_path = dir.join(CONFIG_JSON);
    if json_path.exists() {
        return Some(json_path);
    }
    None
}

/// Per-user config directory (`~/.config/deskchat` on Linux).
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("deskchat"))
}

/// Find config for a working directory: the directory itself first, then the
/// per-user config directory.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    find_config(dir).or_else(|| user_config_dir().as_deref().and_then(find_config))
}

/// Top-level .deskchat.toml config. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssistantConfig {
    /// Name shown under assistant replies.
    #[serde(default = "default_assistant_name")]
    pub name: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RenderConfig {
    /// Replace known social link labels (LinkedIn, Instagram) with icons.
    #[serde(default = "default_true", alias = "linkIcons")]
    pub link_icons: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { link_icons: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RevealMode {
    /// One glyph per tick of a timer.
    Timer,
    /// Random batches of glyphs per animation frame.
    #[default]
    Frame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RevealConfig {
    #[serde(default)]
    pub mode: RevealMode,
    #[serde(default = "default_char_delay", alias = "charDelayMs")]
    pub char_delay_ms: u64,
    #[serde(default = "default_frame_interval", alias = "frameIntervalMs")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_batch_min", alias = "batchMin")]
    pub batch_min: usize,
    #[serde(default = "default_batch_max", alias = "batchMax")]
    pub batch_max: usize,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            mode: RevealMode::default(),
            char_delay_ms: default_char_delay(),
            frame_interval_ms: default_frame_interval(),
            batch_min: default_batch_min(),
            batch_max: default_batch_max(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BackendConfig {
    /// Use canned replies and in-memory tickets even when URLs are set.
    #[serde(default)]
    pub mock: bool,
    /// Chat proxy endpoint: POST {"messages": [...]} -> {"reply": "..."}.
    #[serde(default, alias = "chatUrl")]
    pub chat_url: Option<String>,
    /// Ticket endpoint: POST ticket fields -> {"ok": true, "id": ...}.
    #[serde(default, alias = "ticketUrl")]
    pub ticket_url: Option<String>,
    /// Ticket listing endpoint: GET -> [{"id", "subject", "status", ...}], newest first.
    #[serde(default, alias = "listUrl")]
    pub list_url: Option<String>,
    /// Answer with canned replies when the chat proxy fails.
    #[serde(default = "default_true")]
    pub fallback: bool,
    #[serde(default = "default_timeout", alias = "timeoutSecs")]
    pub timeout_secs: u64,
    /// Request size including the system prompt the proxy adds.
    #[serde(default = "default_max_messages", alias = "maxMessages")]
    pub max_messages: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mock: false,
            chat_url: None,
            ticket_url: None,
            list_url: None,
            fallback: true,
            timeout_secs: default_timeout(),
            max_messages: default_max_messages(),
        }
    }
}

fn default_assistant_name() -> String { "StrataMind AI".into() }
fn default_true() -> bool { true }
fn default_char_delay() -> u64 { 12 }
fn default_frame_interval() -> u64 { 16 }
fn default_batch_min() -> usize { 30 }
fn default_batch_max() -> usize { 44 }
fn default_timeout() -> u64 { 30 }
fn default_max_messages() -> usize { 20 }

impl RevealConfig {
    pub fn pacing(&self) -> Pacing {
        match self.mode {
            RevealMode::Timer => Pacing::PerGlyph {
                delay: Duration::from_millis(self.char_delay_ms),
            },
            RevealMode::Frame => Pacing::Batched {
                min: self.batch_min,
                max: self.batch_max,
                interval: Duration::from_millis(self.frame_interval_ms),
            },
        }
    }
}

impl BackendConfig {
    /// Whether replies come from the canned mock only.
    pub fn is_mock(&self) -> bool {
        self.mock || self.chat_url.is_none()
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load config from a file (TOML or JSON, auto-detected by extension).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => Self::parse_toml(&contents).or_else(|_| Self::parse_json(&contents)),
        }?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `explicit` if given, else the discovered config, else defaults.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => discover(dir).map_or_else(|| Ok(Self::default()), |path| Self::load(&path)),
        }
    }

    /// Parse config from a TOML string.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).map_err(|e| {
            ExitError::Config(format!("invalid {CONFIG_TOML}: {e}")).into()
        })
    }

    /// Parse config from a JSON string.
    pub fn parse_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            ExitError::Config(format!("invalid {CONFIG_JSON}: {e}")).into()
        })
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.reveal.batch_min == 0 || self.reveal.batch_min > self.reveal.batch_max {
            return Err(ExitError::Config(format!(
                "reveal.batch_min ({}) must be at least 1 and not above reveal.batch_max ({})",
                self.reveal.batch_min, self.reveal.batch_max
            ))
            .into());
        }
        if self.backend.max_messages < 2 {
            return Err(ExitError::Config(
                "backend.max_messages must leave room for the system prompt (>= 2)".into(),
            )
            .into());
        }
        Ok(())
    }

    pub const fn render_options(&self) -> RenderOptions {
        RenderOptions {
            link_icons: self.render.link_icons,
        }
    }

    /// Serialize config to a TOML string with helpful comments.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let raw = toml::to_string_pretty(self)
            .context("serializing config to TOML")?;

        let mut doc: toml_edit::DocumentMut = raw.parse()
            .context("parsing generated TOML for comment injection")?;

        doc.decor_mut().set_prefix("# deskchat configuration\n# Run `deskchat schema` for every key.\n\n");

        fn set_table_comment(doc: &mut toml_edit::DocumentMut, key: &str, comment: &str) {
            if let Some(item) = doc.get_mut(key)
                && let Some(tbl) = item.as_table_mut()
            {
                tbl.decor_mut().set_prefix(comment);
            }
        }

        set_table_comment(&mut doc, "assistant", "# How the assistant is labelled\n");
        set_table_comment(&mut doc, "render", "\n# Markdown rendering\n");
        set_table_comment(&mut doc, "reveal", "\n# Typewriter reveal: mode = \"timer\" (one glyph per char_delay_ms)\n# or \"frame\" (batch_min..=batch_max glyphs every frame_interval_ms)\n");
        set_table_comment(&mut doc, "backend", "\n# Chat and ticket endpoints; without chat_url replies are canned\n");

        Ok(doc.to_string())
    }
}
