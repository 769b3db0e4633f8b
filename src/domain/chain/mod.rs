//! Chain domain - step store, placeholder resolution and run contracts

mod context;
mod document;
mod entity;
mod error;
mod policy;
mod runner;
mod step;

pub use context::{argument_names, ExecutionContext};
pub use document::ChainDocument;
pub use entity::{Chain, ChainName};
pub use error::ChainError;
pub use policy::{ErrorPolicy, ErrorPolicyConfig};
pub use runner::{ChainRunResult, ChainRunner, RunMode, RunRequest, StepResponse, StepStatus};
pub use step::{
    ChainCallStep, ChainStep, CommandStep, InstructionStep, PromptStep, StepKind, StepType,
    TaskStep,
};
