use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use threadbot_core::{Message, Role};

/// One `{role, content}` entry in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User.as_str().to_string(),
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

/// Reply text plus the provider-reported token usage for the call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    pub content: String,
    pub total_tokens: u64,
}

/// A black-box chat completion service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion>;
}

// ── OpenAI-compatible client ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("threadbot/0.1")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion> {
        let payload = json!({
            "model": self.model,
            "messages": messages,
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let completion = interpret_completion_response(status, &text)?;
        debug!(model = %self.model, tokens = completion.total_tokens, "completion received");
        Ok(completion)
    }
}

/// Turn an HTTP status and raw body into a completion.  Error statuses report
/// the provider's `error.message` when the body is JSON, otherwise the body
/// text itself, so HTML or empty error pages still surface the status.
pub fn interpret_completion_response(status: reqwest::StatusCode, text: &str) -> Result<Completion> {
    let body = serde_json::from_str::<serde_json::Value>(text).ok();
    if !status.is_success() {
        let detail = body
            .as_ref()
            .and_then(|body| body.get("error"))
            .and_then(|error| error.get("message"))
            .and_then(|message| message.as_str())
            .map(ToString::to_string)
            .unwrap_or_else(|| {
                let raw = text.trim();
                if raw.is_empty() {
                    "empty response body".to_string()
                } else {
                    raw.chars().take(200).collect()
                }
            });
        bail!("language model error ({status}): {detail}");
    }

    let Some(body) = body else {
        bail!("language model returned a non-JSON body ({status})");
    };
    parse_completion(&body)
}

/// Pull the reply text and token usage out of a `/chat/completions` body.
/// A body without `usage` counts as zero tokens.
pub fn parse_completion(body: &serde_json::Value) -> Result<Completion> {
    let Some(content) = body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
    else {
        bail!("completion response missing choices[0].message.content");
    };

    let total_tokens = body
        .get("usage")
        .and_then(|usage| usage.get("total_tokens"))
        .and_then(|tokens| tokens.as_u64())
        .unwrap_or(0);

    Ok(Completion {
        content: content.to_string(),
        total_tokens,
    })
}

// ── Structured output extraction ──────────────────────────────────────────────

/// Parse a model reply that is a single JSON value, either bare or as the
/// only content of a ` ```json ` (or plain ` ``` `) fence.  JSON embedded in
/// prose is not accepted.  Returns `None` when the reply does not
/// deserialize as `T`.
pub fn extract_json_output<T: serde::de::DeserializeOwned>(response: &str) -> Option<T> {
    let trimmed = response.trim();
    if let Ok(val) = serde_json::from_str(trimmed) {
        return Some(val);
    }

    let inner = trimmed.strip_prefix("```")?.strip_suffix("```")?;
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    serde_json::from_str(inner.trim()).ok()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::Value;

    #[test]
    fn chat_message_from_transcript_entry() {
        let msg = ChatMessage::from(&Message::assistant("hello"));
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "hello");
        assert_eq!(ChatMessage::system("x").role, "system");
        assert_eq!(ChatMessage::user("x").role, "user");
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client = OpenAiClient::new(
            "http://localhost:8080/v1/",
            "key",
            "gpt-4o-mini",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    // ── parse_completion ───────────────────────────────────────────────────

    #[test]
    fn parse_completion_reads_content_and_usage() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}}],
            "usage": {"prompt_tokens": 30, "completion_tokens": 2, "total_tokens": 32}
        });
        let completion = parse_completion(&body).unwrap();
        assert_eq!(completion.content, "4");
        assert_eq!(completion.total_tokens, 32);
    }

    #[test]
    fn parse_completion_without_usage_counts_zero() {
        let body = json!({"choices": [{"message": {"content": "hi"}}]});
        assert_eq!(parse_completion(&body).unwrap().total_tokens, 0);
    }

    #[test]
    fn parse_completion_rejects_missing_choices() {
        assert!(parse_completion(&json!({"choices": []})).is_err());
        assert!(parse_completion(&json!({"error": {"message": "bad"}})).is_err());
    }

    // ── interpret_completion_response ──────────────────────────────────────

    #[test]
    fn success_status_parses_completion() {
        let body = r#"{"choices": [{"message": {"content": "hi"}}], "usage": {"total_tokens": 7}}"#;
        let completion = interpret_completion_response(StatusCode::OK, body).unwrap();
        assert_eq!(completion.content, "hi");
        assert_eq!(completion.total_tokens, 7);
    }

    #[test]
    fn error_status_uses_provider_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        let err = interpret_completion_response(StatusCode::UNAUTHORIZED, body)
            .unwrap_err()
            .to_string();
        assert!(err.contains("401"));
        assert!(err.contains("Incorrect API key provided"));
    }

    #[test]
    fn error_status_with_html_or_empty_body_keeps_status() {
        let html = "<html><body>502 Bad Gateway</body></html>";
        let err = interpret_completion_response(StatusCode::BAD_GATEWAY, html)
            .unwrap_err()
            .to_string();
        assert!(err.contains("502"));
        assert!(err.contains("Bad Gateway</body>"));
        assert!(!err.contains("decoding"));

        let err = interpret_completion_response(StatusCode::SERVICE_UNAVAILABLE, "")
            .unwrap_err()
            .to_string();
        assert!(err.contains("503"));
        assert!(err.contains("empty response body"));
    }

    #[test]
    fn success_status_with_non_json_body_is_an_error() {
        assert!(interpret_completion_response(StatusCode::OK, "not json").is_err());
    }

    // ── extract_json_output ────────────────────────────────────────────────

    #[test]
    fn extract_plain_object() {
        let raw = r#"{"tool": "calculator", "arguments": {"expression": "2+2"}}"#;
        let out: Value = extract_json_output(raw).unwrap();
        assert_eq!(out["tool"], "calculator");
        assert_eq!(out["arguments"]["expression"], "2+2");
    }

    #[test]
    fn extract_fenced_object() {
        let raw = "```json\n{\"tool\": \"weather\", \"arguments\": {\"city\": \"Paris\"}}\n```";
        let out: Value = extract_json_output(raw).unwrap();
        assert_eq!(out["arguments"]["city"], "Paris");

        let plain = "  ```\n{\"tool\": \"news\"}\n```\n";
        let out: Value = extract_json_output(plain).unwrap();
        assert_eq!(out["tool"], "news");
    }

    #[test]
    fn extract_ignores_json_inside_prose() {
        let raw = "Routing now: {\"tool\": \"news\", \"arguments\": {\"topic\": \"rust\"}} done";
        assert!(extract_json_output::<Value>(raw).is_none());

        let fenced_after_text = "Sure!\n```json\n{\"tool\": \"weather\"}\n```";
        assert!(extract_json_output::<Value>(fenced_after_text).is_none());
    }

    #[test]
    fn extract_returns_none_for_plain_text() {
        assert!(extract_json_output::<Value>("I think you want the calculator.").is_none());
        assert!(extract_json_output::<Value>("").is_none());
        assert!(extract_json_output::<Value>("} backwards {").is_none());
    }

    #[test]
    fn extract_two_bare_objects_returns_none() {
        let raw = r#"first {"tool":"news"} then {"tool":"weather"}"#;
        assert!(extract_json_output::<Value>(raw).is_none());
    }
}
