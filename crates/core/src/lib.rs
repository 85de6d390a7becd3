pub mod commands;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Arguments handed to a tool, keyed by parameter name.
pub type ToolArgs = HashMap<String, String>;

/// The closed set of side-effecting tools the assistant can propose.
///
/// The derived ordering (calculator, weather, news) is the order used
/// wherever tools are listed, e.g. in usage reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Calculator,
    Weather,
    News,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::Calculator, ToolKind::Weather, ToolKind::News];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calculator => "calculator",
            Self::Weather => "weather",
            Self::News => "news",
        }
    }

    /// Name of the single argument each tool consumes.
    pub fn argument_name(self) -> &'static str {
        match self {
            Self::Calculator => "expression",
            Self::Weather => "city",
            Self::News => "topic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "calculator" => Some(Self::Calculator),
            "weather" => Some(Self::Weather),
            "news" => Some(Self::News),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown tool: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry in a thread's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Set on an assistant message that proposes a tool call which has not
    /// been approved or denied yet.
    #[serde(default)]
    pub proposal: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            proposal: false,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            proposal: false,
            timestamp: Utc::now(),
        }
    }

    pub fn proposal(content: impl Into<String>) -> Self {
        Self {
            proposal: true,
            ..Self::assistant(content)
        }
    }
}

/// A tool invocation waiting for a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ToolKind,
    pub arguments: ToolArgs,
}

impl PendingAction {
    pub fn new(kind: ToolKind, arguments: ToolArgs) -> Self {
        Self { kind, arguments }
    }

    /// The tool's primary argument (`expression`, `city` or `topic`).
    pub fn primary_argument(&self) -> Option<&str> {
        self.arguments
            .get(self.kind.argument_name())
            .map(String::as_str)
    }
}

/// Render tool arguments as `key="value"` pairs in key order.
pub fn describe_args(args: &ToolArgs) -> String {
    let mut pairs: Vec<(&String, &String)> = args.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_kind_names_roundtrip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.as_str()), Some(kind));
            assert_eq!(kind.as_str().parse::<ToolKind>().unwrap(), kind);
        }
        assert_eq!(ToolKind::from_name(" Weather "), Some(ToolKind::Weather));
        assert!(ToolKind::from_name("general").is_none());
        assert!("shell".parse::<ToolKind>().is_err());
    }

    #[test]
    fn tool_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ToolKind::News).unwrap();
        assert_eq!(json, "\"news\"");
    }

    #[test]
    fn tool_kind_order_is_report_order() {
        let mut kinds = vec![ToolKind::News, ToolKind::Calculator, ToolKind::Weather];
        kinds.sort();
        assert_eq!(kinds, ToolKind::ALL.to_vec());
    }

    #[test]
    fn proposal_message_is_assistant_and_flagged() {
        let msg = Message::proposal("use calculator?");
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.proposal);
        assert!(!Message::assistant("hi").proposal);
        assert_eq!(Message::user("hi").role, Role::User);
    }

    #[test]
    fn primary_argument_follows_tool_kind() {
        let mut args = ToolArgs::new();
        args.insert("city".to_string(), "Paris".to_string());
        let action = PendingAction::new(ToolKind::Weather, args.clone());
        assert_eq!(action.primary_argument(), Some("Paris"));

        let wrong = PendingAction::new(ToolKind::News, args);
        assert_eq!(wrong.primary_argument(), None);
    }

    #[test]
    fn describe_args_is_sorted_and_quoted() {
        let mut args = ToolArgs::new();
        args.insert("topic".to_string(), "rust".to_string());
        args.insert("city".to_string(), "Oslo".to_string());
        assert_eq!(describe_args(&args), "city=\"Oslo\", topic=\"rust\"");
        assert_eq!(describe_args(&ToolArgs::new()), "");
    }
}
