//! Application state for shared services

use std::sync::Arc;

use crate::domain::chain::{
    Chain, ChainDocument, ChainError, ChainRunResult, ChainStep, RunRequest,
};
use crate::domain::command::CommandRegistry;
use crate::domain::{Agent, DomainError};
use crate::infrastructure::services::{
    AgentService, ChainService, CreateChainRequest, UpsertAgentRequest,
};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub chain_service: Arc<dyn ChainServiceTrait>,
    pub agent_service: Arc<dyn AgentServiceTrait>,
    pub commands: Arc<CommandRegistry>,
    /// Key required on `/api` routes when set
    pub api_key: Option<Arc<str>>,
}

/// Trait for chain service operations
#[async_trait::async_trait]
pub trait ChainServiceTrait: Send + Sync {
    async fn list(&self) -> Result<Vec<Chain>, ChainError>;
    async fn get(&self, name: &str) -> Result<Chain, ChainError>;
    async fn create(&self, request: CreateChainRequest) -> Result<Chain, ChainError>;
    async fn delete(&self, name: &str) -> Result<(), ChainError>;
    async fn rename(&self, name: &str, new_name: &str) -> Result<Chain, ChainError>;
    async fn add_step(&self, name: &str, step: ChainStep) -> Result<Chain, ChainError>;
    async fn upsert_step(&self, name: &str, step: ChainStep) -> Result<Chain, ChainError>;
    async fn move_step(
        &self,
        name: &str,
        old_step_number: u32,
        new_step_number: u32,
    ) -> Result<Chain, ChainError>;
    async fn delete_step(&self, name: &str, step_number: u32) -> Result<Chain, ChainError>;
    async fn chain_args(&self, name: &str) -> Result<Vec<String>, ChainError>;
    async fn export(&self, name: &str) -> Result<ChainDocument, ChainError>;
    async fn import(&self, document: ChainDocument, overwrite: bool) -> Result<Chain, ChainError>;
    async fn run(&self, name: &str, request: RunRequest) -> Result<ChainRunResult, ChainError>;
}

/// Trait for agent service operations
#[async_trait::async_trait]
pub trait AgentServiceTrait: Send + Sync {
    async fn list(&self) -> Result<Vec<Agent>, DomainError>;
    async fn get(&self, name: &str) -> Result<Option<Agent>, DomainError>;
    async fn upsert(&self, name: &str, request: UpsertAgentRequest) -> Result<Agent, DomainError>;
    async fn delete(&self, name: &str) -> Result<bool, DomainError>;
}

#[async_trait::async_trait]
impl ChainServiceTrait for ChainService {
    async fn list(&self) -> Result<Vec<Chain>, ChainError> {
        ChainService::list(self).await
    }

    async fn get(&self, name: &str) -> Result<Chain, ChainError> {
        ChainService::get(self, name).await
    }

    async fn create(&self, request: CreateChainRequest) -> Result<Chain, ChainError> {
        ChainService::create(self, request).await
    }

    async fn delete(&self, name: &str) -> Result<(), ChainError> {
        ChainService::delete(self, name).await
    }

    async fn rename(&self, name: &str, new_name: &str) -> Result<Chain, ChainError> {
        ChainService::rename(self, name, new_name).await
    }

    async fn add_step(&self, name: &str, step: ChainStep) -> Result<Chain, ChainError> {
        ChainService::add_step(self, name, step).await
    }

    async fn upsert_step(&self, name: &str, step: ChainStep) -> Result<Chain, ChainError> {
        ChainService::upsert_step(self, name, step).await
    }

    async fn move_step(
        &self,
        name: &str,
        old_step_number: u32,
        new_step_number: u32,
    ) -> Result<Chain, ChainError> {
        ChainService::move_step(self, name, old_step_number, new_step_number).await
    }

    async fn delete_step(&self, name: &str, step_number: u32) -> Result<Chain, ChainError> {
        ChainService::delete_step(self, name, step_number).await
    }

    async fn chain_args(&self, name: &str) -> Result<Vec<String>, ChainError> {
        ChainService::chain_args(self, name).await
    }

    async fn export(&self, name: &str) -> Result<ChainDocument, ChainError> {
        ChainService::export(self, name).await
    }

    async fn import(&self, document: ChainDocument, overwrite: bool) -> Result<Chain, ChainError> {
        ChainService::import(self, document, overwrite).await
    }

    async fn run(&self, name: &str, request: RunRequest) -> Result<ChainRunResult, ChainError> {
        ChainService::run(self, name, request).await
    }
}

#[async_trait::async_trait]
impl AgentServiceTrait for AgentService {
    async fn list(&self) -> Result<Vec<Agent>, DomainError> {
        AgentService::list(self).await
    }

    async fn get(&self, name: &str) -> Result<Option<Agent>, DomainError> {
        AgentService::get(self, name).await
    }

    async fn upsert(&self, name: &str, request: UpsertAgentRequest) -> Result<Agent, DomainError> {
        AgentService::upsert(self, name, request).await
    }

    async fn delete(&self, name: &str) -> Result<bool, DomainError> {
        AgentService::delete(self, name).await
    }
}

impl AppState {
    /// Create new application state with provided services
    pub fn new(
        chain_service: Arc<dyn ChainServiceTrait>,
        agent_service: Arc<dyn AgentServiceTrait>,
        commands: Arc<CommandRegistry>,
    ) -> Self {
        Self {
            chain_service,
            agent_service,
            commands,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty()).map(Arc::from);
        self
    }
}
