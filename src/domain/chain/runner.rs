//! Chain runner trait and run results

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::entity::Chain;
use super::error::ChainError;
use super::step::StepType;

/// Which steps of a chain a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Steps `1..=N`
    #[default]
    Full,
    /// Steps `n..=N`
    FromStep(u32),
    /// Step `n` only
    SingleStep(u32),
}

/// Parameters for a chain run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub user_input: String,
    pub agent_override: Option<String>,
    pub args: HashMap<String, String>,
    pub mode: RunMode,
    /// Outputs of steps not executed in this run, used by partial runs
    pub step_outputs: BTreeMap<u32, String>,
}

impl RunRequest {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Default::default()
        }
    }

    pub fn with_agent_override(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_override = Some(agent_name.into());
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_step_output(mut self, step_number: u32, output: impl Into<String>) -> Self {
        self.step_outputs.insert(step_number, output.into());
        self
    }
}

/// Outcome of a single step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    /// Failed, but the error policy let the run continue
    Failed,
}

/// Record of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResponse {
    pub step_number: u32,
    pub step_type: StepType,
    pub agent_name: String,
    pub output: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

impl StepResponse {
    pub fn success(
        step_number: u32,
        step_type: StepType,
        agent_name: impl Into<String>,
        output: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            step_number,
            step_type,
            agent_name: agent_name.into(),
            output: output.into(),
            status: StepStatus::Succeeded,
            error: None,
            execution_time_ms,
        }
    }

    /// A failed step whose output is the error text
    pub fn failure(
        step_number: u32,
        step_type: StepType,
        agent_name: impl Into<String>,
        error: &ChainError,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            step_number,
            step_type,
            agent_name: agent_name.into(),
            output: format!("Error: {}", error),
            status: StepStatus::Failed,
            error: Some(error.to_string()),
            execution_time_ms,
        }
    }
}

/// Result of running a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRunResult {
    pub chain_name: String,
    /// Output of the last executed step, or the user input for an empty chain
    pub output: String,
    pub responses: Vec<StepResponse>,
    pub execution_time_ms: u64,
}

impl ChainRunResult {
    pub fn response(&self, step_number: u32) -> Option<&StepResponse> {
        self.responses.iter().find(|r| r.step_number == step_number)
    }

    /// Step number to output for every executed step
    pub fn outputs(&self) -> BTreeMap<u32, String> {
        self.responses
            .iter()
            .map(|r| (r.step_number, r.output.clone()))
            .collect()
    }

    pub fn failed_steps(&self) -> usize {
        self.responses
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .count()
    }
}

/// Executes chains against agents, commands and other chains
#[async_trait]
pub trait ChainRunner: Send + Sync + Debug {
    /// Run a snapshot of `chain`; nested chains are loaded when their step begins
    async fn run(&self, chain: &Chain, request: RunRequest) -> Result<ChainRunResult, ChainError>;
}
