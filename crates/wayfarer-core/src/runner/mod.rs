//! Task lifecycle orchestration.
//!
//! The runner owns one task from request to terminal state: it asks the
//! planner for a plan, hands the plan to the engine, and synthesizes the
//! final answer from the recorded observations. Tasks are independent, so a
//! shared runner can drive any number of them concurrently while each
//! task's steps stay strictly sequential.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineError, TaoEngine};
use crate::planner::{validate_plan, PlanError, Planner};
use crate::registry::ToolRegistry;
use crate::store::ContextStore;
use crate::synthesizer::{Answer, ReportSynthesizer, Synthesizer};
use crate::types::{Task, TaskFailureKind, TaskRequest, TaskState};

/// Why a task ended without an answer.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("planning failed: {0}")]
    Planning(#[from] PlanError),
    #[error("execution failed: {0}")]
    Execution(#[from] EngineError),
}

impl TaskError {
    /// Failure category recorded on the task's terminal state.
    pub fn kind(&self) -> TaskFailureKind {
        match self {
            TaskError::Planning(_) => TaskFailureKind::Planning,
            TaskError::Execution(EngineError::StepFailed { .. }) => TaskFailureKind::ToolExecution,
            TaskError::Execution(EngineError::Registry(_)) => TaskFailureKind::ToolInvocation,
            TaskError::Execution(EngineError::Context(_)) => TaskFailureKind::Context,
            TaskError::Execution(EngineError::Plan(_)) => TaskFailureKind::Planning,
            TaskError::Execution(EngineError::StepBudgetExceeded(_)) => TaskFailureKind::Planning,
            TaskError::Execution(EngineError::Cancelled(_)) => TaskFailureKind::Cancelled,
        }
    }
}

/// Terminal task plus its answer or failure.
#[derive(Debug)]
pub struct TaskOutcome {
    pub task: Task,
    pub result: Result<Answer, TaskError>,
}

/// Entry point for running tasks against a tool registry.
pub struct TaskRunner {
    registry: Arc<ToolRegistry>,
    planner: Arc<dyn Planner>,
    synthesizer: Arc<dyn Synthesizer>,
    engine: TaoEngine,
}

impl TaskRunner {
    pub fn new(registry: Arc<ToolRegistry>, planner: Arc<dyn Planner>) -> Self {
        let engine = TaoEngine::new(registry.clone());
        Self {
            registry,
            planner,
            synthesizer: Arc::new(ReportSynthesizer),
            engine,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_engine(mut self, engine: TaoEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Run a task to a terminal state with no external cancellation.
    pub async fn run_task(&self, text: &str) -> TaskOutcome {
        self.run_with_cancellation(text, CancellationToken::new())
            .await
    }

    /// Run a task to a terminal state. Cancelling the token stops the task
    /// at the next step boundary.
    pub async fn run_with_cancellation(
        &self,
        text: &str,
        cancellation: CancellationToken,
    ) -> TaskOutcome {
        let mut task = Task::new(TaskRequest::new(text));
        tracing::info!(task_id = %task.id, request = %text, "task accepted");
        task.set_state(TaskState::Running);

        match self.drive(&task, &cancellation).await {
            Ok(answer) => {
                task.set_state(TaskState::Succeeded);
                tracing::info!(task_id = %task.id, "task succeeded");
                TaskOutcome {
                    task,
                    result: Ok(answer),
                }
            }
            Err(error) => {
                let kind = error.kind();
                task.set_state(TaskState::Failed {
                    kind,
                    reason: error.to_string(),
                });
                tracing::error!(task_id = %task.id, kind = %kind, error = %error, "task failed");
                TaskOutcome {
                    task,
                    result: Err(error),
                }
            }
        }
    }

    async fn drive(
        &self,
        task: &Task,
        cancellation: &CancellationToken,
    ) -> Result<Answer, TaskError> {
        let plan = self.planner.plan(&task.request).await?;
        validate_plan(&plan, &self.registry.names())?;
        tracing::info!(task_id = %task.id, steps = plan.len(), "plan accepted");

        let mut context = ContextStore::new();
        self.engine
            .run(
                &task.id,
                &plan,
                self.planner.as_ref(),
                &mut context,
                cancellation,
            )
            .await?;

        Ok(self.synthesizer.synthesize(task, &context).await)
    }
}
