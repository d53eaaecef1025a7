//! Final answer synthesis.
//!
//! Runs once, after the engine has finished, over the observations the task
//! recorded. Output is a pure function of those observations so the same
//! context always yields the same answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::ContextStore;
use crate::types::{Observation, ObservationValue, Task, TaskId};

/// User-facing answer assembled for a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub task_id: TaskId,
    pub text: String,
}

/// Turns recorded observations into the final answer.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, task: &Task, context: &ContextStore) -> Answer;
}

/// Default synthesizer: one line per observation, in recording order.
///
/// A success observation carrying a string `report` field contributes that
/// report verbatim; other successes fall back to their JSON payload. Empty
/// observations are stated as such rather than dropped.
pub struct ReportSynthesizer;

#[async_trait]
impl Synthesizer for ReportSynthesizer {
    async fn synthesize(&self, task: &Task, context: &ContextStore) -> Answer {
        let mut lines: Vec<String> = context
            .iter()
            .map(|(key, observation)| render_observation(key, observation))
            .collect();
        if lines.is_empty() {
            lines.push("Nothing was looked up for this request.".to_string());
        }
        Answer {
            task_id: task.id.clone(),
            text: lines.join("\n"),
        }
    }
}

fn render_observation(key: &str, observation: &Observation) -> String {
    match &observation.value {
        ObservationValue::Success { value } => {
            match value.get("report").and_then(Value::as_str) {
                Some(report) => report.to_string(),
                None => format!("{}: {}", key, value),
            }
        }
        ObservationValue::Empty => format!("No results were found by '{}'.", key),
        ObservationValue::Error { message, .. } => format!("'{}' failed: {}", key, message),
    }
}
