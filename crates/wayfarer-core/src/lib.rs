//! # Wayfarer Core
//!
//! Core abstractions and deterministic logic for the Wayfarer travel agent.
//!
//! This crate contains:
//! - Task / Plan / Step / Observation definitions
//! - Planner / Tool / Synthesizer abstractions
//! - The sequential thought-action-observation engine
//! - The write-once context store and the tool registry
//!
//! This crate does NOT care about:
//! - Which HTTP services back the tools
//! - How configuration is loaded
//! - How answers are displayed

pub mod engine;
pub mod planner;
pub mod registry;
pub mod runner;
pub mod store;
pub mod synthesizer;
pub mod tool;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::{EngineError, EngineReport, TaoEngine};
    pub use crate::planner::{
        CapabilityMatcher, KeywordMatcher, PlanError, Planner, WorkflowPlanner,
    };
    pub use crate::registry::{RegistryError, ToolRegistry};
    pub use crate::runner::{TaskError, TaskOutcome, TaskRunner};
    pub use crate::store::{ContextError, ContextStore};
    pub use crate::synthesizer::{Answer, ReportSynthesizer, Synthesizer};
    pub use crate::tool::{
        FieldType, InputField, Tool, ToolDescriptor, ToolFailure, ToolInputs, ToolOutput,
    };
    pub use crate::types::{
        Capability, InputValue, Observation, ObservationValue, Plan, PlanDelta, Step, StepId,
        StepInput, Task, TaskFailureKind, TaskId, TaskRequest, TaskState,
    };
}

// Re-export key types at crate root
pub use engine::{EngineError, EngineReport, TaoEngine};
pub use planner::{CapabilityMatcher, KeywordMatcher, PlanError, Planner, WorkflowPlanner};
pub use registry::{RegistryError, ToolRegistry};
pub use runner::{TaskError, TaskOutcome, TaskRunner};
pub use store::{ContextError, ContextStore};
pub use synthesizer::{Answer, ReportSynthesizer, Synthesizer};
pub use tool::{Tool, ToolDescriptor, ToolFailure, ToolInputs, ToolOutput};
pub use types::{
    Observation, ObservationValue, Plan, PlanDelta, Step, StepId, StepInput, Task,
    TaskFailureKind, TaskId, TaskRequest, TaskState,
};
