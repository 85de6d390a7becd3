//! LLM-backed intent routing.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use threadbot_core::{ToolArgs, ToolKind};
use threadbot_llm::{ChatMessage, ChatModel, extract_json_output};

use crate::thread::Thread;

pub const ROUTER_PROMPT: &str = r#"You are a tool router.
If the user asks a math question, respond ONLY with JSON:
{"tool": "calculator", "arguments": {"expression": "<math expression>"}}

If it's about weather:
{"tool": "weather", "arguments": {"city": "<city name>"}}

If it's about news:
{"tool": "news", "arguments": {"topic": "<topic>"}}

Otherwise:
{"tool": "general", "arguments": {}}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterDecision {
    Tool { kind: ToolKind, arguments: ToolArgs },
    General,
}

#[derive(Debug, Deserialize)]
struct RouteReply {
    tool: String,
    #[serde(default)]
    arguments: serde_json::Map<String, Value>,
}

/// Classify `user_text`, charging the call's tokens to `thread`.
///
/// Never fails: a transport error or a reply outside the grammar both fall
/// back to [`RouterDecision::General`].
pub async fn classify(model: &dyn ChatModel, thread: &mut Thread, user_text: &str) -> RouterDecision {
    let messages = [ChatMessage::system(ROUTER_PROMPT), ChatMessage::user(user_text)];
    match model.complete(&messages).await {
        Ok(completion) => {
            thread.add_tokens(completion.total_tokens);
            debug!(
                thread = thread.id(),
                tokens = completion.total_tokens,
                reply = %completion.content,
                "router reply"
            );
            parse_decision(&completion.content)
        }
        Err(err) => {
            warn!(?err, thread = thread.id(), "router call failed; using general chat");
            RouterDecision::General
        }
    }
}

/// Validate a router reply against the tool grammar.  The reply must be the
/// JSON object itself (optionally fenced); only the argument the chosen tool
/// consumes is kept.
pub fn parse_decision(raw: &str) -> RouterDecision {
    let Some(reply) = extract_json_output::<RouteReply>(raw) else {
        return RouterDecision::General;
    };
    let Some(kind) = ToolKind::from_name(&reply.tool) else {
        return RouterDecision::General;
    };

    let name = kind.argument_name();
    let value = match reply.arguments.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return RouterDecision::General,
    };

    let mut arguments = ToolArgs::new();
    arguments.insert(name.to_string(), value);
    RouterDecision::Tool { kind, arguments }
}
