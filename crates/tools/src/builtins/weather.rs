//! Current conditions from the OpenWeather "current weather" endpoint.

use async_trait::async_trait;
use serde_json::Value;

use threadbot_core::{ToolArgs, ToolKind};

use super::{parse_body, provider_message, transport_error};
use crate::{Tool, ToolError, ToolParam, ToolSpec, required_arg};

pub struct WeatherTool {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            kind: ToolKind::Weather,
            description: "Current temperature and conditions for a city (OpenWeather).".to_string(),
            params: vec![ToolParam::required("city", "City name, e.g. Paris")],
            requires_api_key: true,
        }
    }

    async fn run(&self, args: &ToolArgs, api_key: Option<&str>) -> Result<String, ToolError> {
        let city = required_arg(args, "city")?;
        let api_key = api_key.ok_or(ToolError::MissingCredential(ToolKind::Weather))?;

        let resp = self
            .client
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|err| transport_error(ToolKind::Weather, err))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|err| transport_error(ToolKind::Weather, err))?;
        interpret_weather_response(city, status, &parse_body(&text))
    }
}

/// Map a provider response onto the tool result.
pub fn interpret_weather_response(city: &str, status: u16, body: &Value) -> Result<String, ToolError> {
    if status == 401 {
        return Err(ToolError::InvalidCredential(ToolKind::Weather));
    }
    if status != 200 {
        return Err(ToolError::Provider {
            kind: ToolKind::Weather,
            message: provider_message(body, "Failed to fetch weather"),
        });
    }

    let temp = body["main"]["temp"].as_f64();
    let description = body["weather"][0]["description"].as_str();
    match (temp, description) {
        (Some(temp), Some(description)) => {
            Ok(format!("Weather in {city}: {temp}°C, {description}"))
        }
        _ => Err(ToolError::Provider {
            kind: ToolKind::Weather,
            message: "weather response is missing temperature or description".to_string(),
        }),
    }
}
