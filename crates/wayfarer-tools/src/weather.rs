//! Current-weather lookup against a wttr.in-compatible endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use wayfarer_core::planner::WEATHER_TOOL;
use wayfarer_core::tool::{
    FieldType, InputField, Tool, ToolDescriptor, ToolFailure, ToolInputs, ToolOutput,
};

use crate::{input_str, send_failure, status_failure};

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    current_condition: Vec<CurrentCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<WeatherDesc>,
    #[serde(rename = "temp_C", default)]
    temp_c: String,
}

#[derive(Debug, Deserialize)]
struct WeatherDesc {
    value: String,
}

/// Fetches current conditions for a city via `GET {base_url}/{city}?format=j1`.
pub struct WeatherTool {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(WEATHER_TOOL, "Look up current weather conditions for a city")
            .with_input(InputField::required("city", FieldType::String))
    }

    async fn execute(&self, inputs: &ToolInputs) -> Result<ToolOutput, ToolFailure> {
        let city = input_str(inputs, "city")
            .ok_or_else(|| ToolFailure::permanent("input 'city' must be a string"))?;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), city);
        tracing::debug!(url = %url, "fetching current weather");
        let response = self
            .client
            .get(&url)
            .query(&[("format", "j1")])
            .send()
            .await
            .map_err(send_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_failure("weather lookup", status, &body));
        }

        let body: WeatherResponse = response
            .json()
            .await
            .map_err(|err| ToolFailure::permanent(format!("unparseable weather body: {err}")))?;
        Ok(ToolOutput::Value(parse_weather(city, &body)?))
    }
}

fn parse_weather(city: &str, body: &WeatherResponse) -> Result<Value, ToolFailure> {
    let current = body
        .current_condition
        .first()
        .ok_or_else(|| ToolFailure::permanent("weather body has no current_condition"))?;
    let condition = current
        .weather_desc
        .first()
        .map(|desc| desc.value.as_str())
        .ok_or_else(|| ToolFailure::permanent("weather body has no condition text"))?;

    Ok(json!({
        "city": city,
        "condition": condition,
        "temperature_c": current.temp_c,
        "report": format!(
            "Current weather in {}: {}, Temperature: {}°C",
            city, condition, current.temp_c
        ),
    }))
}
