//! Chain step and its typed variants

use serde::{Deserialize, Serialize};

use super::policy::ErrorPolicy;

/// Discriminant of a [`StepKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Prompt,
    Command,
    Chain,
    Task,
    Instruction,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Command => "command",
            Self::Chain => "chain",
            Self::Task => "task",
            Self::Instruction => "instruction",
        }
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template sent to the agent's language model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptStep {
    pub prompt: String,
}

/// Invocation of a registered command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStep {
    #[serde(alias = "prompt_name")]
    pub command_name: String,
    /// JSON object (placeholders resolved inside its strings) or plain text
    #[serde(default, alias = "prompt")]
    pub args: String,
}

/// Nested run of another stored chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainCallStep {
    #[serde(alias = "prompt_name")]
    pub chain_name: String,
    /// Becomes the sub-chain's user input after resolution
    #[serde(default = "default_chain_input", alias = "prompt")]
    pub input: String,
}

fn default_chain_input() -> String {
    "{user_input}".to_string()
}

/// Instruction the agent works through with repeated command use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStep {
    #[serde(alias = "prompt")]
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
}

/// Instruction answered with at most one round of command use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionStep {
    #[serde(alias = "prompt")]
    pub instruction: String,
}

/// The typed payload of a step, tagged by `step_type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "snake_case")]
pub enum StepKind {
    Prompt(PromptStep),
    Command(CommandStep),
    Chain(ChainCallStep),
    Task(TaskStep),
    Instruction(InstructionStep),
}

impl StepKind {
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::Prompt(PromptStep {
            prompt: prompt.into(),
        })
    }

    pub fn command(command_name: impl Into<String>, args: impl Into<String>) -> Self {
        Self::Command(CommandStep {
            command_name: command_name.into(),
            args: args.into(),
        })
    }

    pub fn chain(chain_name: impl Into<String>, input: impl Into<String>) -> Self {
        Self::Chain(ChainCallStep {
            chain_name: chain_name.into(),
            input: input.into(),
        })
    }

    pub fn task(instruction: impl Into<String>, max_rounds: Option<u32>) -> Self {
        Self::Task(TaskStep {
            instruction: instruction.into(),
            max_rounds,
        })
    }

    pub fn instruction(instruction: impl Into<String>) -> Self {
        Self::Instruction(InstructionStep {
            instruction: instruction.into(),
        })
    }

    pub fn step_type(&self) -> StepType {
        match self {
            Self::Prompt(_) => StepType::Prompt,
            Self::Command(_) => StepType::Command,
            Self::Chain(_) => StepType::Chain,
            Self::Task(_) => StepType::Task,
            Self::Instruction(_) => StepType::Instruction,
        }
    }

    /// The text subject to placeholder resolution
    pub fn template(&self) -> &str {
        match self {
            Self::Prompt(step) => &step.prompt,
            Self::Command(step) => &step.args,
            Self::Chain(step) => &step.input,
            Self::Task(step) => &step.instruction,
            Self::Instruction(step) => &step.instruction,
        }
    }

    /// Name of the chain this step calls, if it is a chain step
    pub fn referenced_chain(&self) -> Option<&str> {
        match self {
            Self::Chain(step) => Some(&step.chain_name),
            _ => None,
        }
    }
}

/// A single step of a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    pub step_number: u32,
    pub agent_name: String,
    #[serde(flatten)]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<ErrorPolicy>,
}

impl ChainStep {
    pub fn new(step_number: u32, agent_name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            step_number,
            agent_name: agent_name.into(),
            kind,
            on_error: None,
        }
    }

    pub fn with_on_error(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = Some(policy);
        self
    }

    pub fn step_type(&self) -> StepType {
        self.kind.step_type()
    }
}
