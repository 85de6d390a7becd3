//! Headline search via the NewsAPI `everything` endpoint.

use async_trait::async_trait;
use serde_json::Value;

use threadbot_core::{ToolArgs, ToolKind};

use super::{parse_body, provider_message, transport_error};
use crate::{Tool, ToolError, ToolParam, ToolSpec, required_arg};

const MAX_HEADLINES: usize = 3;

pub struct NewsTool {
    client: reqwest::Client,
    base_url: String,
}

impl NewsTool {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Tool for NewsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            kind: ToolKind::News,
            description: format!("Top {MAX_HEADLINES} headlines for a topic (NewsAPI)."),
            params: vec![ToolParam::required("topic", "Search topic, e.g. electric cars")],
            requires_api_key: true,
        }
    }

    async fn run(&self, args: &ToolArgs, api_key: Option<&str>) -> Result<String, ToolError> {
        let topic = required_arg(args, "topic")?;
        let api_key = api_key.ok_or(ToolError::MissingCredential(ToolKind::News))?;
        let page_size = MAX_HEADLINES.to_string();

        let resp = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .query(&[("q", topic), ("apiKey", api_key), ("pageSize", page_size.as_str())])
            .send()
            .await
            .map_err(|err| transport_error(ToolKind::News, err))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|err| transport_error(ToolKind::News, err))?;
        interpret_news_response(topic, status, &parse_body(&text))
    }
}

/// Map a provider response onto the tool result.  An empty article list is a
/// successful, explicit "nothing found" answer.
pub fn interpret_news_response(topic: &str, status: u16, body: &Value) -> Result<String, ToolError> {
    if status == 401 {
        return Err(ToolError::InvalidCredential(ToolKind::News));
    }
    if status != 200 {
        return Err(ToolError::Provider {
            kind: ToolKind::News,
            message: provider_message(body, "Failed to fetch news"),
        });
    }

    let articles = body["articles"].as_array().map(Vec::as_slice).unwrap_or_default();
    if articles.is_empty() {
        return Ok(format!("No news found for '{topic}'."));
    }

    let headlines = articles
        .iter()
        .take(MAX_HEADLINES)
        .map(|article| {
            let title = article["title"].as_str().unwrap_or("(untitled)").trim();
            let source = article["source"]["name"].as_str().unwrap_or("unknown source").trim();
            format!("- {title} ({source})")
        })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!("Top news for '{topic}':\n{headlines}"))
}
