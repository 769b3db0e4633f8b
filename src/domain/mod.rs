//! Domain layer - Core business logic and entities

pub mod agent;
pub mod chain;
pub mod command;
pub mod error;
pub mod llm;
pub mod storage;

pub use agent::{Agent, AgentInference, AgentName, AgentSettings};
pub use chain::{
    Chain, ChainDocument, ChainError, ChainName, ChainRunResult, ChainRunner, ChainStep, ErrorPolicy,
    ErrorPolicyConfig, ExecutionContext, RunMode, RunRequest, StepKind, StepResponse, StepStatus,
    StepType,
};
pub use command::{
    CommandDescriptor, CommandError, CommandHandler, CommandInvocation, CommandRegistry,
};
pub use error::DomainError;
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole,
    Usage,
};
pub use storage::{Storage, StorageEntity, StorageKey};
