//! Error policy applied to failed step executions

use serde::{Deserialize, Serialize};

use super::step::StepType;

/// What the runner does when a step fails with an execution error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Record `"Error: <message>"` as the step output and keep going
    Continue,
    /// Stop the run and propagate the error
    Halt,
}

/// Per step type default policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorPolicyConfig {
    pub prompt: ErrorPolicy,
    pub command: ErrorPolicy,
    pub chain: ErrorPolicy,
    pub task: ErrorPolicy,
    pub instruction: ErrorPolicy,
}

impl Default for ErrorPolicyConfig {
    fn default() -> Self {
        Self {
            prompt: ErrorPolicy::Continue,
            command: ErrorPolicy::Continue,
            chain: ErrorPolicy::Halt,
            task: ErrorPolicy::Continue,
            instruction: ErrorPolicy::Continue,
        }
    }
}

impl ErrorPolicyConfig {
    pub fn for_step_type(&self, step_type: StepType) -> ErrorPolicy {
        match step_type {
            StepType::Prompt => self.prompt,
            StepType::Command => self.command,
            StepType::Chain => self.chain,
            StepType::Task => self.task,
            StepType::Instruction => self.instruction,
        }
    }

    /// Uniform policy for every step type
    pub fn uniform(policy: ErrorPolicy) -> Self {
        Self {
            prompt: policy,
            command: policy,
            chain: policy,
            task: policy,
            instruction: policy,
        }
    }
}
