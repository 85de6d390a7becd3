use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use threadbot_config::{Credentials, ToolsConfig};
use threadbot_core::{ToolArgs, ToolKind};

// ── Errors ───────────────────────────────────────────────────────────────────

/// Why a tool produced no result.  Every variant is recoverable: callers turn
/// it into an assistant message via [`ToolError::user_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("no API key configured for {0}")]
    MissingCredential(ToolKind),
    /// The provider answered 401.
    #[error("{0} API key was rejected")]
    InvalidCredential(ToolKind),
    #[error("{kind} provider error: {message}")]
    Provider { kind: ToolKind, message: String },
    #[error("could not reach the {kind} service: {detail}")]
    Transport { kind: ToolKind, detail: String },
    #[error("{0}")]
    InvalidInput(String),
    #[error("tool not registered: {0}")]
    NotRegistered(ToolKind),
}

impl ToolError {
    /// Text shown in place of a tool result.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredential(kind) => match Credentials::source_hint(*kind) {
                Some((env, field)) => format!(
                    "Provide your {kind} API key with /key {kind} <value> (or set {env} or {field}), then ask again."
                ),
                None => format!("Provide an API key for {kind}."),
            },
            Self::InvalidCredential(kind) => {
                format!("The {kind} API key was rejected. Update it with /key {kind} <value> and ask again.")
            }
            Self::Provider { message, .. } => format!("Error: {message}"),
            Self::Transport { kind, detail } => {
                format!("Warning: could not reach the {kind} service: {detail}")
            }
            Self::InvalidInput(detail) => format!("Error: {detail}"),
            Self::NotRegistered(kind) => format!("Error: the {kind} tool is not available."),
        }
    }
}

// ── Tool trait and registry ──────────────────────────────────────────────────

/// Describes a single parameter that a tool accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ToolParam {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Static metadata about a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub kind: ToolKind,
    pub description: String,
    pub params: Vec<ToolParam>,
    /// When set, the registry refuses to run the tool without a key.
    pub requires_api_key: bool,
}

/// Trait implemented by every tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn run(&self, args: &ToolArgs, api_key: Option<&str>) -> Result<String, ToolError>;
}

/// Central registry for all available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry holding calculator, weather and news, sharing one HTTP client.
    pub fn builtin(config: &ToolsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("threadbot/0.1")
            .build()?;

        let mut registry = Self::default();
        registry.register(Box::new(CalculatorTool));
        registry.register(Box::new(WeatherTool::new(
            client.clone(),
            &config.weather_base_url,
        )));
        registry.register(Box::new(NewsTool::new(client, &config.news_base_url)));
        Ok(registry)
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn list_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.spec().kind == kind)
            .map(|t| t.as_ref())
    }

    /// Returns the key to use for `kind`, or `MissingCredential` when the tool
    /// needs one that is not configured.  Checked before any I/O.
    pub fn resolve_credential<'a>(
        &self,
        kind: ToolKind,
        credentials: &'a Credentials,
    ) -> Result<Option<&'a str>, ToolError> {
        let tool = self.get(kind).ok_or(ToolError::NotRegistered(kind))?;
        let key = credentials.for_tool(kind);
        if tool.spec().requires_api_key && key.is_none() {
            return Err(ToolError::MissingCredential(kind));
        }
        Ok(key)
    }

    /// Run `kind` with `args`, supplying the matching credential.
    pub async fn execute(
        &self,
        kind: ToolKind,
        args: &ToolArgs,
        credentials: &Credentials,
    ) -> Result<String, ToolError> {
        let key = self.resolve_credential(kind, credentials)?;
        let tool = self.get(kind).ok_or(ToolError::NotRegistered(kind))?;
        debug!(tool = %kind, "running tool");
        tool.run(args, key).await
    }
}

/// Fetch a required, non-blank string argument.
pub(crate) fn required_arg<'a>(args: &'a ToolArgs, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolError::InvalidInput(format!("missing required argument: {name}")))
}

// ── Built-in tools ───────────────────────────────────────────────────────────

pub mod builtins;
pub use builtins::{CalculatorTool, NewsTool, WeatherTool};

// ── ToolRegistry tests ───────────────────────────────────────────────────────
