//! Attraction search backed by a Tavily-compatible search API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use wayfarer_core::planner::ATTRACTIONS_TOOL;
use wayfarer_core::tool::{
    FieldType, InputField, Tool, ToolDescriptor, ToolFailure, ToolInputs, ToolOutput,
};

use crate::{input_flag, input_str, send_failure, status_failure};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    include_answer: bool,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

/// Searches tourist attractions for a city, optionally steered by the
/// observed weather and an indoor preference.
pub struct AttractionSearchTool {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_results: u32,
}

impl AttractionSearchTool {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        max_results: u32,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            max_results,
        }
    }
}

#[async_trait]
impl Tool for AttractionSearchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            ATTRACTIONS_TOOL,
            "Search tourist attractions for a city, weather-aware",
        )
        .with_input(InputField::required("city", FieldType::String))
        .with_input(InputField::optional("weather", FieldType::String))
        .with_input(InputField::optional("indoor", FieldType::Boolean))
    }

    async fn execute(&self, inputs: &ToolInputs) -> Result<ToolOutput, ToolFailure> {
        let city = input_str(inputs, "city")
            .ok_or_else(|| ToolFailure::permanent("input 'city' must be a string"))?;
        let weather = input_str(inputs, "weather");
        let indoor = input_flag(inputs, "indoor");

        let query = build_query(city, weather, indoor);
        tracing::debug!(query = %query, "searching attractions");

        let request = SearchRequest {
            api_key: &self.api_key,
            query: &query,
            search_depth: "basic",
            include_answer: true,
            max_results: self.max_results,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(send_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_failure("attraction search", status, &body));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|err| ToolFailure::permanent(format!("unparseable search body: {err}")))?;
        match render_results(&body) {
            Some(report) => Ok(ToolOutput::Value(json!({ "report": report }))),
            None => Ok(ToolOutput::Empty),
        }
    }
}

fn build_query(city: &str, weather: Option<&str>, indoor: bool) -> String {
    let subject = if indoor {
        "indoor tourist attractions"
    } else {
        "tourist attractions"
    };
    match weather {
        Some(weather) => format!(
            "Best {} to visit in '{}' during '{}' weather and reasons why",
            subject, city, weather
        ),
        None => format!("Best {} to visit in '{}'", subject, city),
    }
}

/// Prefer the synthesized answer; fall back to listing the raw results.
/// Returns `None` when the response carries nothing usable.
fn render_results(response: &SearchResponse) -> Option<String> {
    if let Some(answer) = &response.answer {
        if !answer.trim().is_empty() {
            return Some(answer.trim().to_string());
        }
    }

    let lines: Vec<String> = response
        .results
        .iter()
        .filter(|result| !result.title.trim().is_empty() || !result.content.trim().is_empty())
        .map(|result| format!("- {}: {}", result.title.trim(), result.content.trim()))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
