//! Fixed travel workflow planner.
//!
//! Deterministic template: weather lookup first when needed, attraction
//! matching wired to the weather observation, and a replan check that steers
//! the attraction step indoors once the recorded weather turns foul.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::store::ContextStore;
use crate::types::{Capability, Plan, PlanDelta, Step, StepId, StepInput, TaskRequest};

use super::{extract_destination, CapabilityMatcher, KeywordMatcher, PlanError, Planner};

pub const WEATHER_TOOL: &str = "get_weather";
pub const ATTRACTIONS_TOOL: &str = "match_attractions";

/// Condition substrings that move attraction matching indoors.
const FOUL_WEATHER_MARKERS: &[&str] = &[
    "rain", "drizzle", "shower", "storm", "thunder", "sleet", "snow", "hail",
];

/// Baseline planner: capability detection plus a fixed step template.
pub struct WorkflowPlanner {
    matcher: Arc<dyn CapabilityMatcher>,
}

impl WorkflowPlanner {
    pub fn new() -> Self {
        Self {
            matcher: Arc::new(KeywordMatcher::new()),
        }
    }

    pub fn with_matcher(matcher: Arc<dyn CapabilityMatcher>) -> Self {
        Self { matcher }
    }
}

impl Default for WorkflowPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Planner for WorkflowPlanner {
    async fn plan(&self, request: &TaskRequest) -> Result<Plan, PlanError> {
        let capabilities = self.matcher.detect(&request.text);
        if capabilities.is_empty() {
            return Err(PlanError::UnsupportedRequest(request.text.clone()));
        }
        let destination = extract_destination(&request.text)
            .ok_or_else(|| PlanError::MissingDestination(request.text.clone()))?;

        let wants_weather = capabilities.contains(&Capability::Weather);
        let wants_attractions = capabilities.contains(&Capability::Attractions);

        let mut steps = Vec::new();
        if wants_weather {
            steps.push(
                Step::invoke(WEATHER_TOOL, WEATHER_TOOL)
                    .with_input(StepInput::literal("city", json!(destination.clone()))),
            );
        }
        if wants_attractions {
            let mut step = Step::invoke(ATTRACTIONS_TOOL, ATTRACTIONS_TOOL)
                .with_input(StepInput::literal("city", json!(destination.clone())));
            if wants_weather {
                // Attraction matching reads the observed condition, so the
                // weather step comes first regardless of mention order.
                step = step
                    .with_input(StepInput::reference_field(
                        "weather",
                        WEATHER_TOOL,
                        "condition",
                    ))
                    .with_depends_on(vec![StepId::from(WEATHER_TOOL)]);
            }
            steps.push(step);
        }

        tracing::debug!(
            destination = %destination,
            steps = steps.len(),
            "built fixed workflow plan"
        );
        Ok(Plan::new(request.text.clone(), steps))
    }

    async fn replan(
        &self,
        _goal: &str,
        context: &ContextStore,
        remaining: &[Step],
    ) -> Result<PlanDelta, PlanError> {
        let Some(condition) = observed_condition(context) else {
            return Ok(PlanDelta::Unchanged);
        };
        if !is_foul_weather(&condition) {
            return Ok(PlanDelta::Unchanged);
        }

        let needs_revision = remaining
            .iter()
            .any(|step| step.tool == ATTRACTIONS_TOOL && !has_input(step, "indoor"));
        if !needs_revision {
            return Ok(PlanDelta::Unchanged);
        }

        tracing::info!(condition = %condition, "foul weather observed, steering attractions indoors");
        let revised = remaining
            .iter()
            .cloned()
            .map(|step| {
                if step.tool == ATTRACTIONS_TOOL && !has_input(&step, "indoor") {
                    step.with_input(StepInput::literal("indoor", json!(true)))
                } else {
                    step
                }
            })
            .collect();
        Ok(PlanDelta::ReplaceSuffix(revised))
    }
}

fn observed_condition(context: &ContextStore) -> Option<String> {
    let observation = context.get(WEATHER_TOOL).ok()?;
    observation
        .value
        .payload()?
        .get("condition")?
        .as_str()
        .map(|condition| condition.to_string())
}

fn is_foul_weather(condition: &str) -> bool {
    let lowered = condition.to_lowercase();
    FOUL_WEATHER_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

fn has_input(step: &Step, name: &str) -> bool {
    step.inputs.iter().any(|input| input.name == name)
}
