//! Command handler contract

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned by command handlers and the registry
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments for '{command}': {message}")]
    InvalidArguments { command: String, message: String },

    #[error("Command '{command}' failed: {message}")]
    Failed { command: String, message: String },
}

impl CommandError {
    pub fn invalid_arguments(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// A resolved request to run a command on behalf of an agent
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInvocation {
    pub command_name: String,
    pub agent_name: String,
    pub args: Map<String, Value>,
}

impl CommandInvocation {
    pub fn new(
        command_name: impl Into<String>,
        agent_name: impl Into<String>,
        args: Map<String, Value>,
    ) -> Self {
        Self {
            command_name: command_name.into(),
            agent_name: agent_name.into(),
            args,
        }
    }

    /// Parse step arguments: a JSON object is used as-is, anything else becomes `{"input": text}`
    pub fn parse_args(text: &str) -> Map<String, Value> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Map::new();
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => map,
            _ => {
                let mut map = Map::new();
                map.insert("input".to_string(), Value::String(text.to_string()));
                map
            }
        }
    }

    /// A string argument; non-string JSON values are rendered as JSON text
    pub fn arg(&self, key: &str) -> Option<String> {
        self.args.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn required_arg(&self, key: &str) -> Result<String, CommandError> {
        self.arg(key).ok_or_else(|| {
            CommandError::invalid_arguments(&self.command_name, format!("missing '{}'", key))
        })
    }
}

/// Public description of a registered command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: &'static [&'static str],
}

/// A statically registered capability agents can invoke
#[async_trait]
pub trait CommandHandler: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Argument names the command understands
    fn parameters(&self) -> &'static [&'static str] {
        &[]
    }

    async fn execute(&self, invocation: &CommandInvocation) -> Result<String, CommandError>;

    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor {
            name: self.name(),
            description: self.description(),
            parameters: self.parameters(),
        }
    }
}
