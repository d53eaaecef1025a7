//! Core data model: requests, plans, tasks, and observations.

mod observation;
mod plan;
mod request;
mod step;
mod task;

pub use observation::{Observation, ObservationValue};
pub use plan::{Plan, PlanDelta};
pub use request::{Capability, TaskRequest};
pub use step::{InputValue, Step, StepId, StepInput};
pub use task::{Task, TaskFailureKind, TaskId, TaskState};
