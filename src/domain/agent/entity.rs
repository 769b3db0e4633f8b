//! Agent entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::DomainError;

const MAX_AGENT_NAME_LENGTH: usize = 100;

/// Unique agent name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentName(String);

impl AgentName {
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::validation("Agent name cannot be empty"));
        }

        if trimmed.chars().count() > MAX_AGENT_NAME_LENGTH
            || trimmed.contains('/')
            || trimmed.chars().any(char::is_control)
        {
            return Err(DomainError::validation(format!(
                "Invalid agent name '{}'",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AgentName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AgentName> for String {
    fn from(name: AgentName) -> Self {
        name.0
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for AgentName {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sampling parameters forwarded to the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// A named configuration bundle: provider, model, settings and enabled commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: AgentName,
    /// Key of the configured provider (e.g. `openai`, `anthropic`)
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub settings: AgentSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Commands this agent may run; empty enables every registered command
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: AgentName, provider: impl Into<String>, model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name,
            provider: provider.into(),
            model: model.into(),
            settings: AgentSettings::default(),
            system_prompt: None,
            commands: Vec::new(),
            created_at: now,
            updated_at: now,
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

    pub fn can_use_command(&self, command_name: &str) -> bool {
        self.commands.is_empty() || self.commands.iter().any(|c| c == command_name)
    }
}

impl StorageEntity for Agent {
    type Key = AgentName;

    fn key(&self) -> &Self::Key {
        &self.name
    }
}
