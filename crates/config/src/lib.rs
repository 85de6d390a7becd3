use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use threadbot_core::ToolKind;

pub const LLM_KEY_ENV: &str = "OPENAI_API_KEY";
pub const WEATHER_KEY_ENV: &str = "OPENWEATHER_API_KEY";
pub const NEWS_KEY_ENV: &str = "NEWSAPI_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier sent with every completion request.
    pub model: String,
    /// Base URL of an OpenAI-compatible API (`/chat/completions` is appended).
    pub base_url: String,
    /// API key for the language-model service.  `OPENAI_API_KEY` takes
    /// precedence when set.
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

// ── Tools config ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// OpenWeather API key.  `OPENWEATHER_API_KEY` takes precedence.
    pub weather_api_key: String,
    /// NewsAPI key.  `NEWSAPI_KEY` takes precedence.
    pub news_api_key: String,
    pub weather_base_url: String,
    pub news_base_url: String,
    /// Per-request timeout for provider calls.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            weather_api_key: String::new(),
            news_api_key: String::new(),
            weather_base_url: "http://api.openweathermap.org".to_string(),
            news_base_url: "https://newsapi.org".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Where `/export` writes summary files when no directory is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
    pub telemetry: TelemetryConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        config.apply_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    /// Apply credential overrides.  A non-blank value returned by `lookup`
    /// replaces whatever the config file held.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let pick = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = pick(LLM_KEY_ENV) {
            self.llm.api_key = key;
        }
        if let Some(key) = pick(WEATHER_KEY_ENV) {
            self.tools.weather_api_key = key;
        }
        if let Some(key) = pick(NEWS_KEY_ENV) {
            self.tools.news_api_key = key;
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            llm_api_key: non_blank(&self.llm.api_key),
            weather_api_key: non_blank(&self.tools.weather_api_key),
            news_api_key: non_blank(&self.tools.news_api_key),
        }
    }

    /// The language-model key gates every operation, so its absence is fatal.
    pub fn require_llm_key(&self) -> Result<String> {
        match non_blank(&self.llm.api_key) {
            Some(key) => Ok(key),
            None => bail!(
                "no language-model API key configured (set {LLM_KEY_ENV} or llm.api_key)"
            ),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ── Credentials ──────────────────────────────────────────────────────────────

/// Resolved secrets.  Blank values are normalised to `None`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub llm_api_key: Option<String>,
    pub weather_api_key: Option<String>,
    pub news_api_key: Option<String>,
}

impl Credentials {
    /// Key used by a tool, if that tool needs one and it is configured.
    pub fn for_tool(&self, kind: ToolKind) -> Option<&str> {
        match kind {
            ToolKind::Calculator => None,
            ToolKind::Weather => self.weather_api_key.as_deref(),
            ToolKind::News => self.news_api_key.as_deref(),
        }
    }

    /// Replace a tool's key for the rest of the process.  A blank `key`
    /// clears it.  Fails for tools that take no key.
    pub fn set_tool_key(&mut self, kind: ToolKind, key: &str) -> Result<()> {
        let slot = match kind {
            ToolKind::Calculator => bail!("the {kind} tool does not use an API key"),
            ToolKind::Weather => &mut self.weather_api_key,
            ToolKind::News => &mut self.news_api_key,
        };
        *slot = non_blank(key);
        Ok(())
    }

    /// Env var and config field that supply a tool's key.
    pub fn source_hint(kind: ToolKind) -> Option<(&'static str, &'static str)> {
        match kind {
            ToolKind::Calculator => None,
            ToolKind::Weather => Some((WEATHER_KEY_ENV, "tools.weather_api_key")),
            ToolKind::News => Some((NEWS_KEY_ENV, "tools.news_api_key")),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |key: &Option<String>| if key.is_some() { "set" } else { "missing" };
        f.debug_struct("Credentials")
            .field("llm_api_key", &mask(&self.llm_api_key))
            .field("weather_api_key", &mask(&self.weather_api_key))
            .field("news_api_key", &mask(&self.news_api_key))
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
