//! Sequential plan execution.
//!
//! The engine drives the thought-action-observation loop:
//! - consults the planner against recorded observations before each step
//! - resolves step inputs from the context store
//! - invokes tools through the registry with bounded retries
//! - records exactly one observation per executed step

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::planner::{validate_steps, PlanError, Planner};
use crate::registry::{RegistryError, ToolRegistry};
use crate::store::{ContextError, ContextStore};
use crate::tool::ToolInputs;
use crate::types::{Observation, ObservationValue, Plan, PlanDelta, Step, StepId, TaskId};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_STEPS: usize = 5;

const MAX_LOG_TEXT_CHARS: usize = 2_000;

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}

/// Errors raised while driving a plan to completion.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("step '{step_id}' failed after {attempts} attempt(s): {message}")]
    StepFailed {
        step_id: StepId,
        attempts: u32,
        message: String,
    },
    #[error("step budget of {0} exhausted before the plan completed")]
    StepBudgetExceeded(usize),
    #[error("task cancelled before step '{0}'")]
    Cancelled(StepId),
    #[error("tool invocation rejected: {0}")]
    Registry(#[from] RegistryError),
    #[error("context access failed: {0}")]
    Context(#[from] ContextError),
    #[error("plan revision rejected: {0}")]
    Plan(#[from] PlanError),
}

/// Summary of a completed run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EngineReport {
    /// Step ids in execution order.
    pub executed: Vec<StepId>,
    /// Total retries spent across all steps.
    pub retries: u32,
}

/// Drives plan steps one at a time against the tool registry.
///
/// Steps run strictly in order. Before each step the planner is consulted
/// with the observations recorded so far and may replace or extend the
/// unexecuted suffix of the plan; executed steps and their observations are
/// never revisited.
pub struct TaoEngine {
    registry: Arc<ToolRegistry>,
    max_attempts: u32,
    retry_base_delay: Duration,
    retry_max_delay: Duration,
    invoke_timeout: Duration,
    max_steps: usize,
}

impl TaoEngine {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            retry_max_delay: DEFAULT_RETRY_MAX_DELAY,
            invoke_timeout: DEFAULT_INVOKE_TIMEOUT,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Configure the retry policy: total attempts per step and the
    /// exponential backoff window between them.
    pub fn with_retry_policy(
        mut self,
        max_attempts: u32,
        retry_base_delay: Duration,
        retry_max_delay: Duration,
    ) -> Self {
        self.max_attempts = max_attempts;
        self.retry_base_delay = retry_base_delay;
        self.retry_max_delay = retry_max_delay.max(retry_base_delay);
        self
    }

    /// Configure the default per-invocation timeout. A tool descriptor with
    /// its own `timeout_ms` still wins.
    pub fn with_invoke_timeout(mut self, invoke_timeout: Duration) -> Self {
        self.invoke_timeout = invoke_timeout;
        self
    }

    /// Cap the number of steps a single task may execute.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Execute `plan` to completion, recording one observation per step.
    ///
    /// Returns the first failure: a step whose final observation is an
    /// error, a rejected plan revision, an exhausted step budget, or a
    /// cancellation observed between steps.
    pub async fn run(
        &self,
        task_id: &TaskId,
        plan: &Plan,
        planner: &dyn Planner,
        store: &mut ContextStore,
        cancellation: &CancellationToken,
    ) -> Result<EngineReport, EngineError> {
        let mut remaining: Vec<Step> = plan.steps.clone();
        let mut executed: HashSet<StepId> = HashSet::new();
        let mut report = EngineReport::default();
        let known_tools = self.registry.names();

        while !remaining.is_empty() {
            if cancellation.is_cancelled() {
                tracing::info!(task_id = %task_id, "cancellation requested, stopping before next step");
                return Err(EngineError::Cancelled(remaining[0].id.clone()));
            }

            let delta = planner.replan(&plan.goal, store, &remaining).await?;
            if !delta.is_unchanged() {
                remaining = merge_delta(remaining, delta);
                validate_steps(&remaining, &executed, &known_tools)?;
                tracing::info!(
                    task_id = %task_id,
                    remaining = remaining.len(),
                    "planner revised the remaining steps"
                );
                if remaining.is_empty() {
                    break;
                }
            }

            if report.executed.len() >= self.max_steps {
                return Err(EngineError::StepBudgetExceeded(self.max_steps));
            }

            let step = remaining.remove(0);
            tracing::info!(
                task_id = %task_id,
                step_id = %step.id,
                tool = %step.tool,
                "executing step"
            );
            let inputs = store.resolve(&step.inputs)?;
            let (value, attempts) = self.invoke_with_retry(task_id, &step, &inputs).await?;
            report.retries += attempts.saturating_sub(1);

            if tracing::enabled!(tracing::Level::DEBUG) {
                let preview = serde_json::to_string(&value).unwrap_or_default();
                tracing::debug!(
                    task_id = %task_id,
                    step_id = %step.id,
                    observation = %truncate_for_log(&preview, MAX_LOG_TEXT_CHARS),
                    "step produced an observation"
                );
            }

            let failure = match &value {
                ObservationValue::Error { message, .. } => Some(message.clone()),
                _ => None,
            };
            store.put(step.id.as_str(), Observation::new(step.id.clone(), value))?;
            executed.insert(step.id.clone());
            report.executed.push(step.id.clone());

            if let Some(message) = failure {
                return Err(EngineError::StepFailed {
                    step_id: step.id,
                    attempts,
                    message,
                });
            }
        }

        tracing::info!(
            task_id = %task_id,
            executed = report.executed.len(),
            retries = report.retries,
            "plan executed"
        );
        Ok(report)
    }

    /// Invoke the step's tool, retrying transient errors with exponential
    /// backoff until the attempt budget is spent. Returns the final
    /// observation value and the attempts consumed.
    async fn invoke_with_retry(
        &self,
        task_id: &TaskId,
        step: &Step,
        inputs: &ToolInputs,
    ) -> Result<(ObservationValue, u32), EngineError> {
        let budget = self.attempt_budget(step);
        let mut attempts_made: u32 = 0;

        loop {
            attempts_made = attempts_made.saturating_add(1);
            let value = self
                .registry
                .invoke(&step.tool, inputs, self.invoke_timeout)
                .await?;

            match value {
                ObservationValue::Error {
                    ref message,
                    transient: true,
                } if attempts_made < budget => {
                    let delay = self.compute_retry_backoff(attempts_made - 1);
                    tracing::warn!(
                        task_id = %task_id,
                        step_id = %step.id,
                        tool = %step.tool,
                        message = %truncate_for_log(message, MAX_LOG_TEXT_CHARS),
                        attempt = attempts_made,
                        max_attempts = budget,
                        retry_in_ms = delay.as_millis() as u64,
                        "retrying step after transient error"
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
                _ => return Ok((value, attempts_made)),
            }
        }
    }

    fn attempt_budget(&self, step: &Step) -> u32 {
        self.registry
            .get(&step.tool)
            .and_then(|tool| tool.descriptor().max_attempts)
            .unwrap_or(self.max_attempts)
            .max(1)
    }

    fn compute_retry_backoff(&self, retries_used: u32) -> Duration {
        let base_ms = self.retry_base_delay.as_millis();
        if base_ms == 0 {
            return Duration::from_millis(0);
        }
        let max_ms = self.retry_max_delay.as_millis().max(base_ms);
        let shift = retries_used.min(20);
        let multiplier = 1u128 << shift;
        let backoff_ms = base_ms.saturating_mul(multiplier).min(max_ms);
        let millis = u64::try_from(backoff_ms).unwrap_or(u64::MAX);
        Duration::from_millis(millis)
    }
}

fn merge_delta(remaining: Vec<Step>, delta: PlanDelta) -> Vec<Step> {
    match delta {
        PlanDelta::Unchanged => remaining,
        PlanDelta::ReplaceSuffix(steps) => steps,
        PlanDelta::Append(mut steps) => {
            let mut merged = remaining;
            merged.append(&mut steps);
            merged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Tool, ToolDescriptor, ToolFailure, ToolOutput};
    use crate::types::{StepInput, TaskRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct StaticTool {
        name: &'static str,
        output: serde_json::Value,
    }

    #[async_trait]
    impl Tool for StaticTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "returns a fixed value")
        }

        async fn execute(&self, _inputs: &ToolInputs) -> Result<ToolOutput, ToolFailure> {
            Ok(ToolOutput::Value(self.output.clone()))
        }
    }

    struct FlakyTool {
        name: &'static str,
        calls: AtomicU32,
        fail_first: u32,
    }

    impl FlakyTool {
        fn new(name: &'static str, fail_first: u32) -> Self {
            Self {
                name,
                calls: AtomicU32::new(0),
                fail_first,
            }
        }
    }

    #[async_trait]
    impl Tool for FlakyTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "fails transiently before succeeding")
        }

        async fn execute(&self, _inputs: &ToolInputs) -> Result<ToolOutput, ToolFailure> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_first {
                Err(ToolFailure::transient("upstream briefly unavailable"))
            } else {
                Ok(ToolOutput::Value(json!({ "call": call })))
            }
        }
    }

    struct FailingTool {
        name: &'static str,
        calls: AtomicU32,
        failure: ToolFailure,
    }

    impl FailingTool {
        fn new(name: &'static str, failure: ToolFailure) -> Self {
            Self {
                name,
                calls: AtomicU32::new(0),
                failure,
            }
        }
    }

    #[async_trait]
    impl Tool for FailingTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "always fails")
        }

        async fn execute(&self, _inputs: &ToolInputs) -> Result<ToolOutput, ToolFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(self.failure.clone())
        }
    }

    struct RecordingTool {
        name: &'static str,
        seen: Mutex<Vec<ToolInputs>>,
    }

    impl RecordingTool {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "records the inputs it receives")
        }

        async fn execute(&self, inputs: &ToolInputs) -> Result<ToolOutput, ToolFailure> {
            self.seen.lock().unwrap().push(inputs.clone());
            Ok(ToolOutput::Value(json!({ "ok": true })))
        }
    }

    struct CancellingTool {
        name: &'static str,
        token: CancellationToken,
    }

    #[async_trait]
    impl Tool for CancellingTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "cancels the task from inside a step")
        }

        async fn execute(&self, _inputs: &ToolInputs) -> Result<ToolOutput, ToolFailure> {
            self.token.cancel();
            Ok(ToolOutput::Value(json!("done")))
        }
    }

    struct StaticPlanner;

    #[async_trait]
    impl Planner for StaticPlanner {
        async fn plan(&self, request: &TaskRequest) -> Result<Plan, PlanError> {
            Ok(Plan::new(request.text.clone(), Vec::new()))
        }
    }

    struct HintingPlanner;

    #[async_trait]
    impl Planner for HintingPlanner {
        async fn plan(&self, request: &TaskRequest) -> Result<Plan, PlanError> {
            Ok(Plan::new(request.text.clone(), Vec::new()))
        }

        async fn replan(
            &self,
            _goal: &str,
            context: &ContextStore,
            remaining: &[Step],
        ) -> Result<PlanDelta, PlanError> {
            let needs_hint = context.contains("first")
                && remaining
                    .iter()
                    .any(|step| step.inputs.iter().all(|input| input.name != "hint"));
            if !needs_hint {
                return Ok(PlanDelta::Unchanged);
            }
            let revised = remaining
                .iter()
                .cloned()
                .map(|step| step.with_input(StepInput::literal("hint", json!(true))))
                .collect();
            Ok(PlanDelta::ReplaceSuffix(revised))
        }
    }

    fn engine_with(tools: Vec<Arc<dyn Tool>>) -> TaoEngine {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool).unwrap();
        }
        TaoEngine::new(Arc::new(registry)).with_retry_policy(
            3,
            Duration::from_millis(0),
            Duration::from_millis(0),
        )
    }

    fn run_plan(
        engine: &TaoEngine,
        plan: &Plan,
        store: &mut ContextStore,
    ) -> Result<EngineReport, EngineError> {
        tokio_test::block_on(engine.run(
            &TaskId::generate(),
            plan,
            &StaticPlanner,
            store,
            &CancellationToken::new(),
        ))
    }

    #[test]
    fn test_runs_steps_in_order_and_records_observations() {
        let engine = engine_with(vec![
            Arc::new(StaticTool {
                name: "alpha",
                output: json!({ "value": 1 }),
            }),
            Arc::new(StaticTool {
                name: "beta",
                output: json!({ "value": 2 }),
            }),
        ]);
        let plan = Plan::new(
            "two independent steps",
            vec![Step::invoke("alpha", "alpha"), Step::invoke("beta", "beta")],
        );
        let mut store = ContextStore::new();

        let report = run_plan(&engine, &plan, &mut store).unwrap();
        assert_eq!(
            report.executed,
            vec![StepId::from("alpha"), StepId::from("beta")]
        );
        assert_eq!(report.retries, 0);
        assert_eq!(store.len(), 2);
        assert!(store.get("alpha").unwrap().value.is_success());
    }

    #[test]
    fn test_resolves_references_between_steps() {
        let recorder = Arc::new(RecordingTool::new("beta"));
        let engine = engine_with(vec![
            Arc::new(StaticTool {
                name: "alpha",
                output: json!({ "condition": "Cloudy" }),
            }),
            recorder.clone(),
        ]);
        let plan = Plan::new(
            "reference flow",
            vec![
                Step::invoke("alpha", "alpha"),
                Step::invoke("beta", "beta")
                    .with_input(StepInput::literal("city", json!("Oslo")))
                    .with_input(StepInput::reference_field("weather", "alpha", "condition")),
            ],
        );
        let mut store = ContextStore::new();

        run_plan(&engine, &plan, &mut store).unwrap();
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("city"), Some(&json!("Oslo")));
        assert_eq!(seen[0].get("weather"), Some(&json!("Cloudy")));
    }

    #[test]
    fn test_retries_transient_failures_until_success() {
        let flaky = Arc::new(FlakyTool::new("flaky", 2));
        let engine = engine_with(vec![flaky.clone()]);
        let plan = Plan::new("flaky step", vec![Step::invoke("flaky", "flaky")]);
        let mut store = ContextStore::new();

        let report = run_plan(&engine, &plan, &mut store).unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.retries, 2);
        assert!(store.get("flaky").unwrap().value.is_success());
    }

    #[test]
    fn test_gives_up_once_attempt_budget_is_spent() {
        let failing = Arc::new(FailingTool::new(
            "down",
            ToolFailure::transient("connection refused"),
        ));
        let engine = engine_with(vec![failing.clone()]);
        let plan = Plan::new("down step", vec![Step::invoke("down", "down")]);
        let mut store = ContextStore::new();

        let err = run_plan(&engine, &plan, &mut store).unwrap_err();
        let EngineError::StepFailed {
            step_id, attempts, ..
        } = err
        else {
            panic!("expected a step failure, got {err:?}");
        };
        assert_eq!(step_id, "down");
        assert_eq!(attempts, 3);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 3);
        // The final error is still recorded as the step's observation.
        assert!(store.get("down").unwrap().value.is_error());
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let failing = Arc::new(FailingTool::new(
            "broken",
            ToolFailure::permanent("unsupported city"),
        ));
        let engine = engine_with(vec![failing.clone()]);
        let plan = Plan::new("broken step", vec![Step::invoke("broken", "broken")]);
        let mut store = ContextStore::new();

        let err = run_plan(&engine, &plan, &mut store).unwrap_err();
        assert!(matches!(
            err,
            EngineError::StepFailed { attempts: 1, .. }
        ));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_step_budget_stops_runaway_plans() {
        let engine = engine_with(vec![
            Arc::new(StaticTool {
                name: "alpha",
                output: json!(1),
            }),
            Arc::new(StaticTool {
                name: "beta",
                output: json!(2),
            }),
        ])
        .with_max_steps(1);
        let plan = Plan::new(
            "too many steps",
            vec![Step::invoke("alpha", "alpha"), Step::invoke("beta", "beta")],
        );
        let mut store = ContextStore::new();

        let err = run_plan(&engine, &plan, &mut store).unwrap_err();
        assert!(matches!(err, EngineError::StepBudgetExceeded(1)));
        assert!(store.contains("alpha"));
        assert!(!store.contains("beta"));
    }

    #[test]
    fn test_cancellation_before_first_step() {
        let engine = engine_with(vec![Arc::new(StaticTool {
            name: "alpha",
            output: json!(1),
        })]);
        let plan = Plan::new("cancelled", vec![Step::invoke("alpha", "alpha")]);
        let mut store = ContextStore::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = tokio_test::block_on(engine.run(
            &TaskId::generate(),
            &plan,
            &StaticPlanner,
            &mut store,
            &token,
        ))
        .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled(step_id) if step_id == "alpha"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_cancellation_takes_effect_between_steps() {
        let token = CancellationToken::new();
        let engine = engine_with(vec![
            Arc::new(CancellingTool {
                name: "alpha",
                token: token.clone(),
            }),
            Arc::new(StaticTool {
                name: "beta",
                output: json!(2),
            }),
        ]);
        let plan = Plan::new(
            "cancel mid-run",
            vec![Step::invoke("alpha", "alpha"), Step::invoke("beta", "beta")],
        );
        let mut store = ContextStore::new();

        let err = tokio_test::block_on(engine.run(
            &TaskId::generate(),
            &plan,
            &StaticPlanner,
            &mut store,
            &token,
        ))
        .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled(step_id) if step_id == "beta"));
        // The step that ran to completion keeps its observation.
        assert!(store.contains("alpha"));
        assert!(!store.contains("beta"));
    }

    #[test]
    fn test_replan_replaces_the_unexecuted_suffix() {
        let recorder = Arc::new(RecordingTool::new("second"));
        let engine = engine_with(vec![
            Arc::new(StaticTool {
                name: "first",
                output: json!({ "value": 1 }),
            }),
            recorder.clone(),
        ]);
        let plan = Plan::new(
            "revisable plan",
            vec![
                Step::invoke("first", "first"),
                Step::invoke("second", "second"),
            ],
        );
        let mut store = ContextStore::new();

        let report = tokio_test::block_on(engine.run(
            &TaskId::generate(),
            &plan,
            &HintingPlanner,
            &mut store,
            &CancellationToken::new(),
        ))
        .unwrap();
        assert_eq!(report.executed.len(), 2);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].get("hint"), Some(&json!(true)));
        // The executed prefix is untouched by the revision.
        assert_eq!(
            store.get("first").unwrap().value.payload(),
            Some(&json!({ "value": 1 }))
        );
    }

    #[test]
    fn test_unknown_tool_invocation_fails() {
        let engine = engine_with(vec![Arc::new(StaticTool {
            name: "alpha",
            output: json!(1),
        })]);
        let plan = Plan::new("ghost step", vec![Step::invoke("ghost", "ghost")]);
        let mut store = ContextStore::new();

        let err = run_plan(&engine, &plan, &mut store).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Registry(RegistryError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_descriptor_attempt_budget_overrides_default() {
        struct OneShotTool {
            calls: AtomicU32,
        }

        #[async_trait]
        impl Tool for OneShotTool {
            fn descriptor(&self) -> ToolDescriptor {
                ToolDescriptor::new("one_shot", "never worth retrying").with_max_attempts(1)
            }

            async fn execute(&self, _inputs: &ToolInputs) -> Result<ToolOutput, ToolFailure> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(ToolFailure::transient("busy"))
            }
        }

        let tool = Arc::new(OneShotTool {
            calls: AtomicU32::new(0),
        });
        let engine = engine_with(vec![tool.clone()]);
        let plan = Plan::new("one shot", vec![Step::invoke("one_shot", "one_shot")]);
        let mut store = ContextStore::new();

        let err = run_plan(&engine, &plan, &mut store).unwrap_err();
        assert!(matches!(
            err,
            EngineError::StepFailed { attempts: 1, .. }
        ));
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let registry = Arc::new(ToolRegistry::new());
        let engine = TaoEngine::new(registry).with_retry_policy(
            5,
            Duration::from_millis(100),
            Duration::from_millis(400),
        );
        assert_eq!(engine.compute_retry_backoff(0), Duration::from_millis(100));
        assert_eq!(engine.compute_retry_backoff(1), Duration::from_millis(200));
        assert_eq!(engine.compute_retry_backoff(2), Duration::from_millis(400));
        assert_eq!(engine.compute_retry_backoff(3), Duration::from_millis(400));

        let zero = TaoEngine::new(Arc::new(ToolRegistry::new())).with_retry_policy(
            5,
            Duration::from_millis(0),
            Duration::from_millis(400),
        );
        assert_eq!(zero.compute_retry_backoff(4), Duration::from_millis(0));
    }
}
