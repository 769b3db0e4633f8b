//! Executes a single chain step

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::chain::{
    ChainCallStep, ChainError, ChainRunResult, ChainStep, CommandStep, ExecutionContext, StepKind,
};
use crate::domain::command::{
    parse_command_requests, render_command_catalog, CommandError, CommandInvocation,
    CommandRegistry,
};
use crate::domain::{Agent, AgentInference, AgentName, Message, Storage};

/// Command arguments for a step; a JSON object template is resolved value by value
fn resolve_command_args(
    template: &str,
    context: &ExecutionContext,
    step_number: u32,
) -> Map<String, Value> {
    match serde_json::from_str::<Value>(template.trim()) {
        Ok(object @ Value::Object(_)) => match context.resolve_json(&object, step_number) {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        _ => CommandInvocation::parse_args(&context.resolve(template, step_number)),
    }
}

/// Runs a nested chain on behalf of a chain step
#[async_trait]
pub trait SubChainRunner: Send + Sync {
    async fn run_sub_chain(
        &self,
        chain_name: &str,
        context: ExecutionContext,
    ) -> Result<ChainRunResult, ChainError>;
}

/// Dispatches a step to its agent, a command or a nested chain
#[derive(Clone)]
pub struct StepExecutor {
    agents: Arc<dyn Storage<Agent>>,
    inference: Arc<dyn AgentInference>,
    commands: Arc<CommandRegistry>,
    max_depth: usize,
    task_max_rounds: u32,
}

impl Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("commands", &self.commands.names())
            .field("max_depth", &self.max_depth)
            .field("task_max_rounds", &self.task_max_rounds)
            .finish()
    }
}

impl StepExecutor {
    pub fn new(
        agents: Arc<dyn Storage<Agent>>,
        inference: Arc<dyn AgentInference>,
        commands: Arc<CommandRegistry>,
    ) -> Self {
        Self {
            agents,
            inference,
            commands,
            max_depth: 8,
            task_max_rounds: 5,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_task_max_rounds(mut self, rounds: u32) -> Self {
        self.task_max_rounds = rounds.max(1);
        self
    }

    /// Execute `step` and return its output text
    pub async fn execute(
        &self,
        step: &ChainStep,
        context: &ExecutionContext,
        sub_chains: &dyn SubChainRunner,
    ) -> Result<String, ChainError> {
        let agent_name = context.agent_for(&step.agent_name);
        let text = context.resolve(step.kind.template(), step.step_number);

        match &step.kind {
            StepKind::Prompt(_) => {
                let agent = self.load_agent(agent_name).await?;
                self.complete(&agent, vec![Message::user(text)]).await
            }
            StepKind::Command(command) => {
                let args = resolve_command_args(&command.args, context, step.step_number);
                self.execute_command(command, agent_name, args).await
            }
            StepKind::Chain(call) => self.execute_chain(call, context, text, sub_chains).await,
            StepKind::Task(task) => {
                let agent = self.load_agent(agent_name).await?;
                let rounds = task.max_rounds.unwrap_or(self.task_max_rounds).max(1);
                self.run_with_commands(&agent, text, rounds).await
            }
            StepKind::Instruction(_) => {
                let agent = self.load_agent(agent_name).await?;
                self.run_with_commands(&agent, text, 1).await
            }
        }
    }

    async fn load_agent(&self, name: &str) -> Result<Agent, ChainError> {
        let key = AgentName::new(name).map_err(|_| ChainError::AgentNotFound(name.to_string()))?;

        self.agents
            .get(&key)
            .await
            .map_err(|e| ChainError::storage(e.to_string()))?
            .ok_or_else(|| ChainError::AgentNotFound(name.to_string()))
    }

    async fn complete(&self, agent: &Agent, messages: Vec<Message>) -> Result<String, ChainError> {
        self.inference
            .complete(agent, messages)
            .await
            .map(|response| response.content().to_string())
            .map_err(|e| ChainError::provider(agent.name.as_str(), e.to_string()))
    }

    async fn execute_command(
        &self,
        step: &CommandStep,
        agent_name: &str,
        args: Map<String, Value>,
    ) -> Result<String, ChainError> {
        if !self.commands.contains(&step.command_name) {
            return Err(ChainError::CommandNotFound(step.command_name.clone()));
        }

        let agent = self.load_agent(agent_name).await?;
        if !agent.can_use_command(&step.command_name) {
            return Err(ChainError::CommandNotEnabled {
                command: step.command_name.clone(),
                agent: agent_name.to_string(),
            });
        }

        let invocation = CommandInvocation::new(&step.command_name, agent_name, args);

        self.commands
            .dispatch(&invocation)
            .await
            .map_err(|e| match e {
                CommandError::NotFound(name) => ChainError::CommandNotFound(name),
                other => ChainError::command_failed(&step.command_name, other.to_string()),
            })
    }

    async fn execute_chain(
        &self,
        step: &ChainCallStep,
        context: &ExecutionContext,
        input: String,
        sub_chains: &dyn SubChainRunner,
    ) -> Result<String, ChainError> {
        let child = context.child(&step.chain_name, input, self.max_depth)?;
        debug!(
            parent = %context.chain_name(),
            chain = %step.chain_name,
            depth = child.call_stack().len(),
            "Running sub-chain"
        );

        let result = sub_chains.run_sub_chain(&step.chain_name, child).await?;
        Ok(result.output)
    }

    /// Prompt the agent with its command catalog, running requested commands for up to `max_rounds` rounds
    async fn run_with_commands(
        &self,
        agent: &Agent,
        instruction: String,
        max_rounds: u32,
    ) -> Result<String, ChainError> {
        let available: Vec<_> = self
            .commands
            .descriptors()
            .into_iter()
            .filter(|d| agent.can_use_command(d.name))
            .collect();

        let mut messages = vec![Message::user(format!(
            "{}\n\n{}",
            instruction,
            render_command_catalog(&available)
        ))];

        for round in 1..=max_rounds {
            let response = self.complete(agent, messages.clone()).await?;
            let requests = parse_command_requests(&response);

            if requests.is_empty() {
                return Ok(response);
            }

            let mut results = Vec::with_capacity(requests.len());
            for request in requests {
                results.push(match request {
                    Ok(request) => {
                        self.run_requested_command(agent, &request.command_name, request.command_args)
                            .await
                    }
                    Err(problem) => problem,
                });
            }
            let results = results.join("\n\n");

            if round == max_rounds {
                debug!(agent = %agent.name, rounds = max_rounds, "Command rounds exhausted");
                return Ok(format!("{}\n\n{}", response, results));
            }

            messages.push(Message::assistant(response));
            messages.push(Message::user(format!(
                "Command results:\n\n{}\n\nContinue. Reply without command blocks once you have the final answer.",
                results
            )));
        }

        Ok(String::new())
    }

    /// Run a command requested by the agent; failures are reported back as text
    async fn run_requested_command(
        &self,
        agent: &Agent,
        command_name: &str,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> String {
        if !agent.can_use_command(command_name) {
            return format!(
                "Command `{}` is not enabled for agent '{}'",
                command_name, agent.name
            );
        }

        let invocation = CommandInvocation::new(command_name, agent.name.as_str(), args);
        match self.commands.dispatch(&invocation).await {
            Ok(output) => format!("Output of `{}`:\n{}", command_name, output),
            Err(e) => {
                warn!(agent = %agent.name, command = %command_name, error = %e, "Requested command failed");
                format!("Command `{}` failed: {}", command_name, e)
            }
        }
    }
}
