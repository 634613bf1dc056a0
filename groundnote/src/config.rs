//! Groundnote configuration.
//!
//! Resolution order: `GROUNDNOTE_CONFIG` path, then
//! `groundnote/config/groundnote.toml` found from the current directory or an
//! ancestor, then the built-in example. Env overrides apply last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "groundnote/config/groundnote.toml";
const BUILTIN_CONFIG_TOML: &str = include_str!("../config/groundnote.example.toml");

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "Input text shall be used as a search key. \
Respond with the most useful, concise, accurate, and understandable context possible. \
If confidence in the comprehension, logic, or coherence of the answer is low, say so plainly \
and note that the lack of quality information is itself noteworthy.

Keep the response within one paragraph of fewer than four sentences; it is read as a reply \
to a highlight or a curious query on a phone.

If the search term is a financial instrument such as a public stock ticker, give the latest \
price, the last market day change in percent and price delta, volume, and at least one sentence, \
after a paragraph break, on the latest news or trending social conversation about that stock or \
company. Always state data freshness relative to today. In a following paragraph, compare \
quantitatively against the most relevant prior period (last day, week, quarter, or year).

The search term:";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Read(String, String),
    #[error("failed to parse config {0}: {1}")]
    Parse(String, String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroundnoteConfig {
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub google_search: bool,
    pub system_instruction: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_ms: 120_000,
            google_search: true,
            system_instruction: Some(DEFAULT_SYSTEM_INSTRUCTION.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { history_limit: 20 }
    }
}

impl GroundnoteConfig {
    /// Load from the usual locations, falling back to built-in defaults.
    pub fn load() -> Self {
        let explicit_path = std::env::var("GROUNDNOTE_CONFIG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let path = explicit_path.or_else(|| find_default_config_path(DEFAULT_CONFIG_PATH));
        let mut config = match path {
            Some(path) => Self::from_path(&path).unwrap_or_else(|err| {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Failed to load config file; using built-in defaults"
                );
                Self::built_in()
            }),
            None => {
                tracing::info!("No config file found; using built-in defaults");
                Self::built_in()
            }
        };
        config.apply_env_overrides();
        config
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&content)
            .map_err(|e| match e {
                ConfigError::Parse(_, msg) => ConfigError::Parse(path.display().to_string(), msg),
                other => other,
            })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::Parse("<inline>".to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn built_in() -> Self {
        Self::from_toml_str(BUILTIN_CONFIG_TOML).unwrap_or_else(|err| {
            tracing::error!(error = %err, "Failed to parse built-in config");
            Self::default()
        })
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `GROUNDNOTE_*` overrides read through `lookup`. Blank or
    /// unparsable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(model) = lookup("GROUNDNOTE_MODEL") {
            self.upstream.model = model.trim().to_string();
        }
        if let Some(bind) = lookup("GROUNDNOTE_BIND") {
            self.server.bind = bind.trim().to_string();
        }
        if let Some(limit) = lookup("GROUNDNOTE_HISTORY_LIMIT")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
        {
            self.session.history_limit = limit;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.provider != "gemini" {
            return Err(ConfigError::Invalid(format!(
                "unsupported upstream provider: {}",
                self.upstream.provider
            )));
        }
        if self.upstream.model.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.model cannot be empty".to_string()));
        }
        if !self.upstream.base_url.starts_with("http://")
            && !self.upstream.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(
                "upstream.base_url must start with http:// or https://".to_string(),
            ));
        }
        if self.session.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "session.history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn find_default_config_path(relative_path: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;
    loop {
        let candidate = current.join(relative_path);
        if candidate.exists() && candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    None
}
