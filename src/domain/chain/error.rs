//! Chain error types

use thiserror::Error;

use crate::domain::DomainError;

/// Errors raised while editing or running chains
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChainError {
    #[error("Chain not found: {0}")]
    ChainNotFound(String),

    #[error("Invalid step position {position}: must be between 1 and {max}")]
    InvalidPosition { position: u32, max: u32 },

    #[error("Step {step_number} does not exist in chain '{chain}'")]
    OutOfRange { chain: String, step_number: u32 },

    #[error("Chain '{0}' already exists")]
    NameConflict(String),

    #[error("Cyclic chain reference: {}", .0.join(" -> "))]
    CyclicChainReference(Vec<String>),

    #[error("Maximum chain nesting depth of {0} exceeded")]
    MaxDepthExceeded(usize),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Provider error for agent '{agent}': {message}")]
    Provider { agent: String, message: String },

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command '{command}' is not enabled for agent '{agent}'")]
    CommandNotEnabled { command: String, agent: String },

    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Step {step_number} timed out after {timeout_secs}s")]
    Timeout { step_number: u32, timeout_secs: u64 },

    #[error("Step {step_number} of chain '{chain}' failed: {source}")]
    StepFailed {
        chain: String,
        step_number: u32,
        source: Box<ChainError>,
    },
}

impl ChainError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::ChainNotFound(name.into())
    }

    pub fn out_of_range(chain: impl Into<String>, step_number: u32) -> Self {
        Self::OutOfRange {
            chain: chain.into(),
            step_number,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn provider(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            agent: agent.into(),
            message: message.into(),
        }
    }

    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn step_failed(chain: impl Into<String>, step_number: u32, source: ChainError) -> Self {
        Self::StepFailed {
            chain: chain.into(),
            step_number,
            source: Box::new(source),
        }
    }

    /// Structural errors are never absorbed by an error policy
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ChainNotFound(_)
                | Self::InvalidPosition { .. }
                | Self::OutOfRange { .. }
                | Self::NameConflict(_)
                | Self::CyclicChainReference(_)
                | Self::MaxDepthExceeded(_)
                | Self::Validation(_)
                | Self::Storage(_)
        )
    }

    /// The innermost error, unwrapping halted step failures
    pub fn root_cause(&self) -> &ChainError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<DomainError> for ChainError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { message } => Self::Validation(message),
            other => Self::Storage(other.to_string()),
        }
    }
}
