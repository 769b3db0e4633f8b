//! Agent service - registry of named agents

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::domain::storage::Storage;
use crate::domain::{Agent, AgentName, AgentSettings, DomainError};

/// Request to create or replace an agent
#[derive(Debug, Clone)]
pub struct UpsertAgentRequest {
    pub provider: String,
    pub model: String,
    pub settings: AgentSettings,
    pub system_prompt: Option<String>,
    pub commands: Vec<String>,
}

impl UpsertAgentRequest {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            settings: AgentSettings::default(),
            system_prompt: None,
            commands: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }
}

/// Agent service for CRUD operations
pub struct AgentService {
    storage: Arc<dyn Storage<Agent>>,
    known_providers: Option<BTreeSet<String>>,
}

impl std::fmt::Debug for AgentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentService")
            .field("known_providers", &self.known_providers)
            .finish()
    }
}

impl AgentService {
    /// Create a new agent service
    pub fn new(storage: Arc<dyn Storage<Agent>>) -> Self {
        Self {
            storage,
            known_providers: None,
        }
    }

    /// Reject agents whose provider is not one of `providers`
    pub fn with_known_providers(mut self, providers: impl IntoIterator<Item = String>) -> Self {
        self.known_providers = Some(providers.into_iter().collect());
        self
    }

    /// List all agents ordered by name
    pub async fn list(&self) -> Result<Vec<Agent>, DomainError> {
        self.storage.list().await
    }

    /// Get an agent by name
    pub async fn get(&self, name: &str) -> Result<Option<Agent>, DomainError> {
        let agent_name = AgentName::new(name)?;
        self.storage.get(&agent_name).await
    }

    /// Create an agent or replace an existing one, keeping its creation time
    pub async fn upsert(&self, name: &str, request: UpsertAgentRequest) -> Result<Agent, DomainError> {
        let agent_name = AgentName::new(name)?;
        self.validate(&request)?;

        let mut agent = Agent::new(agent_name.clone(), request.provider, request.model)
            .with_settings(request.settings)
            .with_commands(request.commands);

        if let Some(system_prompt) = request.system_prompt {
            agent = agent.with_system_prompt(system_prompt);
        }

        if let Some(existing) = self.storage.get(&agent_name).await? {
            agent.created_at = existing.created_at;
            agent.updated_at = Utc::now();
        }

        let saved = self.storage.save(agent).await?;
        info!(agent = %saved.name, provider = %saved.provider, model = %saved.model, "Agent saved");
        Ok(saved)
    }

    /// Delete an agent
    pub async fn delete(&self, name: &str) -> Result<bool, DomainError> {
        let agent_name = AgentName::new(name)?;
        self.storage.delete(&agent_name).await
    }

    /// Store configured agents that are not registered yet
    pub async fn seed(&self, agents: Vec<Agent>) -> Result<usize, DomainError> {
        let mut seeded = 0;

        for agent in agents {
            if self.storage.exists(&agent.name).await? {
                debug!(agent = %agent.name, "Agent already registered, skipping seed");
                continue;
            }

            self.validate_provider(&agent.provider)?;
            self.storage.create(agent).await?;
            seeded += 1;
        }

        info!(count = seeded, "Seeded agents from configuration");
        Ok(seeded)
    }

    fn validate(&self, request: &UpsertAgentRequest) -> Result<(), DomainError> {
        if request.model.trim().is_empty() {
            return Err(DomainError::validation("Agent model cannot be empty"));
        }

        self.validate_provider(&request.provider)
    }

    fn validate_provider(&self, provider: &str) -> Result<(), DomainError> {
        match &self.known_providers {
            Some(known) if !known.contains(provider) => Err(DomainError::validation(format!(
                "Unknown provider '{}'; configured providers: {}",
                provider,
                known.iter().cloned().collect::<Vec<_>>().join(", ")
            ))),
            _ => Ok(()),
        }
    }
}
