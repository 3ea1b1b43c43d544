// blinkzero-core/src/config.rs

//! Handles the user settings that every operation reads fresh.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

pub const CONFIG_FILENAME: &str = "BlinkZero.toml";

const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";
const DEFAULT_MODEL: &str = "qwen2.5-coder";
const DEFAULT_EMBEDDINGS_MODEL: &str = "nomic-embed-text";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings for the local LLM server and the tool server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub model: String,
    pub embeddings_model: String,
    pub request_timeout_secs: u64,
    pub mcp: McpSettings,
    pub local_tools: LocalToolsSettings,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct McpSettings {
    pub server_url: Option<String>,
    pub allowed_tools: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LocalToolsSettings {
    pub enable: bool,
    pub allowed_tools: Vec<String>,
}

impl Default for LocalToolsSettings {
    fn default() -> Self {
        Self {
            enable: true,
            allowed_tools: Vec::new(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            embeddings_model: DEFAULT_EMBEDDINGS_MODEL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            mcp: McpSettings::default(),
            local_tools: LocalToolsSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Settings> {
        let settings: Settings = match toml::from_str(content) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, content = %content, "Failed to parse TOML content");
                return Err(anyhow!(e))
                    .context("Failed to parse settings TOML content. Check TOML syntax.");
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Applies `BLINKZERO_*` environment variables on top of the file values.
    pub fn apply_env_overrides(self) -> Result<Settings> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Overrides keys from `lookup` (keyed by `BLINKZERO_*` name), then validates.
    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Settings> {
        if let Some(v) = lookup("BLINKZERO_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("BLINKZERO_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("BLINKZERO_EMBEDDINGS_MODEL") {
            self.embeddings_model = v;
        }
        if let Some(v) = lookup("BLINKZERO_MCP_SERVER_URL") {
            self.mcp.server_url = Some(v).filter(|s| !s.trim().is_empty());
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("'model' in settings is empty."));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("'request_timeout_secs' must be greater than zero."));
        }
        Url::parse(&self.base_url)
            .with_context(|| format!("Invalid URL format for 'base_url' ('{}').", self.base_url))?;
        if let Some(server_url) = &self.mcp.server_url {
            Url::parse(server_url).with_context(|| {
                format!("Invalid URL format for 'mcp.server_url' ('{}').", server_url)
            })?;
        }
        Ok(())
    }

    /// `<base_url>/chat/completions`
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// `<base_url>/models`
    pub fn models_url(&self) -> String {
        format!("{}/models", self.base_url.trim_end_matches('/'))
    }

    /// The tool server URL, only when tools can actually be offered.
    pub fn tool_server(&self) -> Option<&str> {
        match self.mcp.server_url.as_deref() {
            Some(url) if !url.trim().is_empty() && !self.mcp.allowed_tools.is_empty() => Some(url),
            _ => None,
        }
    }
}

/// Where settings come from. [`SettingsSource::load`] re-reads the file on every call.
#[derive(Debug, Clone, Default)]
pub enum SettingsSource {
    File(PathBuf),
    /// A file read without the `BLINKZERO_*` environment overrides.
    Isolated(PathBuf),
    #[default]
    Defaults,
}

impl SettingsSource {
    /// Looks for `BlinkZero.toml` in `start` and its parents, then in the user config dir.
    pub fn discover(start: &Path, user_config_dir: Option<&Path>) -> SettingsSource {
        let mut current = Some(start);
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILENAME);
            if candidate.is_file() {
                return SettingsSource::File(candidate);
            }
            current = dir.parent();
        }
        if let Some(config_dir) = user_config_dir {
            let candidate = config_dir.join("blinkzero").join("config.toml");
            if candidate.is_file() {
                return SettingsSource::File(candidate);
            }
        }
        SettingsSource::Defaults
    }

    pub fn load(&self) -> Result<Settings> {
        let settings = match self {
            SettingsSource::File(path) | SettingsSource::Isolated(path) => {
                debug!(path = %path.display(), "Reading settings file.");
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings file: {:?}", path))?;
                Settings::from_toml_str(&content)
                    .with_context(|| format!("Invalid settings in {:?}", path))?
            }
            SettingsSource::Defaults => {
                debug!("No settings file found, using defaults.");
                Settings::default()
            }
        };
        let settings = match self {
            SettingsSource::Isolated(_) => settings.apply_overrides(|_| None)?,
            _ => settings.apply_env_overrides()?,
        };
        info!(base_url = %settings.base_url, model = %settings.model, "Settings loaded.");
        Ok(settings)
    }
}
