//! Built-in tool implementations.

mod calculator;
mod news;
mod weather;

pub use calculator::{CalculatorTool, evaluate, format_number};
pub use news::{NewsTool, interpret_news_response};
pub use weather::{WeatherTool, interpret_weather_response};

use threadbot_core::ToolKind;

use crate::ToolError;

/// Decode a provider body.  Providers send JSON even on errors; anything else
/// becomes `Value::Null` so the status code still decides the result.
pub(crate) fn parse_body(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or(serde_json::Value::Null)
}

pub(crate) fn transport_error(kind: ToolKind, err: reqwest::Error) -> ToolError {
    let detail = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    ToolError::Transport { kind, detail }
}

/// Provider's `message` field, or `fallback`.
pub(crate) fn provider_message(body: &serde_json::Value, fallback: &str) -> String {
    body.get("message")
        .and_then(|message| message.as_str())
        .filter(|message| !message.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}
