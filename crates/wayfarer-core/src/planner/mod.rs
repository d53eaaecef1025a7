//! Planner
//!
//! Turns a raw request into a validated plan and, mid-run, decides whether
//! the remaining steps still apply given what has been observed so far.

mod keyword;
mod workflow;

pub use keyword::{extract_destination, KeywordMatcher};
pub use workflow::{WorkflowPlanner, ATTRACTIONS_TOOL, WEATHER_TOOL};

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::ContextStore;
use crate::types::{Capability, Plan, PlanDelta, Step, StepId, TaskRequest};

/// Planning failures. Fatal for the task; nothing here is retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanError {
    #[error("request matches no supported capability: \"{0}\"")]
    UnsupportedRequest(String),
    #[error("no destination could be extracted from the request: \"{0}\"")]
    MissingDestination(String),
    #[error("planner produced an empty plan")]
    EmptyPlan,
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(StepId),
    #[error("step '{step_id}' depends on '{dependency}', which is not an earlier step")]
    InvalidDependency { step_id: StepId, dependency: StepId },
    #[error("step '{step_id}' names unknown tool '{tool}'")]
    UnknownTool { step_id: StepId, tool: String },
}

/// Detects which capabilities a request mentions. The returned tags are
/// ordered by first mention, left to right, and deduplicated.
pub trait CapabilityMatcher: Send + Sync {
    fn detect(&self, text: &str) -> Vec<Capability>;
}

/// Derives and revises plans.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Build the initial plan for a request.
    async fn plan(&self, request: &TaskRequest) -> Result<Plan, PlanError>;

    /// Decide whether the remaining steps still apply given the observations
    /// recorded so far. The engine merges the delta into the unexecuted
    /// suffix only; executed steps are out of reach by construction.
    async fn replan(
        &self,
        goal: &str,
        context: &ContextStore,
        remaining: &[Step],
    ) -> Result<PlanDelta, PlanError> {
        let _ = (goal, context, remaining);
        Ok(PlanDelta::Unchanged)
    }
}

/// Check plan structure: non-empty, unique step ids, dependencies strictly
/// backwards, every tool registered.
pub fn validate_plan(plan: &Plan, known_tools: &[String]) -> Result<(), PlanError> {
    if plan.steps.is_empty() {
        return Err(PlanError::EmptyPlan);
    }
    validate_steps(&plan.steps, &HashSet::new(), known_tools)
}

/// Validate a step sequence that begins after the `executed` steps. Used for
/// initial plans (empty prefix) and for replanned suffixes.
pub fn validate_steps(
    steps: &[Step],
    executed: &HashSet<StepId>,
    known_tools: &[String],
) -> Result<(), PlanError> {
    let mut seen: HashSet<StepId> = executed.clone();
    for step in steps {
        if seen.contains(&step.id) {
            return Err(PlanError::DuplicateStepId(step.id.clone()));
        }
        if !known_tools.iter().any(|tool| *tool == step.tool) {
            return Err(PlanError::UnknownTool {
                step_id: step.id.clone(),
                tool: step.tool.clone(),
            });
        }
        for dependency in step.dependencies() {
            if !seen.contains(&dependency) {
                return Err(PlanError::InvalidDependency {
                    step_id: step.id.clone(),
                    dependency,
                });
            }
        }
        seen.insert(step.id.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepInput;
    use serde_json::json;

    fn known() -> Vec<String> {
        vec!["get_weather".to_string(), "match_attractions".to_string()]
    }

    #[test]
    fn test_validate_plan_rejects_empty() {
        let plan = Plan::new("nothing", vec![]);
        assert_eq!(validate_plan(&plan, &known()), Err(PlanError::EmptyPlan));
    }

    #[test]
    fn test_validate_plan_rejects_duplicate_ids() {
        let plan = Plan::new(
            "two of a kind",
            vec![
                Step::invoke("s1", "get_weather"),
                Step::invoke("s1", "match_attractions"),
            ],
        );
        assert_eq!(
            validate_plan(&plan, &known()),
            Err(PlanError::DuplicateStepId(StepId::from("s1")))
        );
    }

    #[test]
    fn test_validate_plan_rejects_unknown_tool() {
        let plan = Plan::new("flight", vec![Step::invoke("s1", "book_flight")]);
        assert!(matches!(
            validate_plan(&plan, &known()),
            Err(PlanError::UnknownTool { tool, .. }) if tool == "book_flight"
        ));
    }

    #[test]
    fn test_validate_plan_rejects_forward_reference() {
        // s1 references s2, which runs later.
        let plan = Plan::new(
            "backwards",
            vec![
                Step::invoke("s1", "match_attractions")
                    .with_input(StepInput::reference_field("weather", "s2", "condition")),
                Step::invoke("s2", "get_weather")
                    .with_input(StepInput::literal("city", json!("Beijing"))),
            ],
        );
        assert_eq!(
            validate_plan(&plan, &known()),
            Err(PlanError::InvalidDependency {
                step_id: StepId::from("s1"),
                dependency: StepId::from("s2"),
            })
        );
    }

    #[test]
    fn test_validate_plan_rejects_self_reference() {
        let plan = Plan::new(
            "loop",
            vec![Step::invoke("s1", "get_weather")
                .with_depends_on(vec![StepId::from("s1")])],
        );
        assert!(matches!(
            validate_plan(&plan, &known()),
            Err(PlanError::InvalidDependency { .. })
        ));
    }

    #[test]
    fn test_validate_steps_accepts_suffix_referencing_executed_prefix() {
        let executed: HashSet<StepId> = [StepId::from("get_weather")].into_iter().collect();
        let suffix = vec![Step::invoke("match_attractions", "match_attractions")
            .with_input(StepInput::reference_field(
                "weather",
                "get_weather",
                "condition",
            ))];
        assert!(validate_steps(&suffix, &executed, &known()).is_ok());
    }

    #[test]
    fn test_validate_steps_rejects_suffix_reusing_executed_id() {
        let executed: HashSet<StepId> = [StepId::from("get_weather")].into_iter().collect();
        let suffix = vec![Step::invoke("get_weather", "get_weather")];
        assert_eq!(
            validate_steps(&suffix, &executed, &known()),
            Err(PlanError::DuplicateStepId(StepId::from("get_weather")))
        );
    }

    #[test]
    fn test_valid_workflow_plan_passes() {
        let plan = Plan::new(
            "weather and attractions in Beijing",
            vec![
                Step::invoke("get_weather", "get_weather")
                    .with_input(StepInput::literal("city", json!("Beijing"))),
                Step::invoke("match_attractions", "match_attractions")
                    .with_input(StepInput::literal("city", json!("Beijing")))
                    .with_input(StepInput::reference_field(
                        "weather",
                        "get_weather",
                        "condition",
                    )),
            ],
        );
        assert!(validate_plan(&plan, &known()).is_ok());
    }
}
