//! Agent inference seam between the chain engine and LLM providers

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::Agent;
use crate::domain::llm::{LlmResponse, Message};
use crate::domain::DomainError;

/// Submits a conversation to the provider and model an agent is configured with
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AgentInference: Send + Sync {
    async fn complete(&self, agent: &Agent, messages: Vec<Message>) -> Result<LlmResponse, DomainError>;
}
