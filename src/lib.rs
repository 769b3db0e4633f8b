//! PMP Chain Engine
//!
//! Stores named chains of typed steps and runs them:
//! - Prompt, task and instruction steps answered by configured agents
//! - Command steps dispatched to a static command table
//! - Chain steps that run other chains with cycle detection
//! - Placeholder substitution of user input, earlier step outputs and run arguments

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::collections::HashMap;
use std::sync::Arc;

use api::state::AppState;
use domain::{Agent, Chain, LlmProvider};
use infrastructure::{
    chain::{ChainRunnerImpl, StepExecutor},
    command::builtin_registry,
    llm::{HttpClient, LlmProviderFactory, ProviderAgentInference},
    services::{AgentService, ChainService},
    storage::StorageFactory,
};
use tracing::info;

const CHAIN_TABLE: &str = "chains";
const AGENT_TABLE: &str = "agents";

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage = StorageFactory::connect(&config.storage.to_storage_config()?).await?;
    info!(storage = ?storage.storage_type(), "Storage backend connected");

    let providers = LlmProviderFactory::create_all(&config.providers)?;
    build_app_state(config, &storage, providers).await
}

/// Wire services over an already connected storage backend and provider table
pub async fn build_app_state(
    config: &AppConfig,
    storage: &StorageFactory,
    providers: HashMap<String, Arc<dyn LlmProvider>>,
) -> anyhow::Result<AppState> {
    let chains = storage.create::<Chain>(CHAIN_TABLE).await?;
    let agents = storage.create::<Agent>(AGENT_TABLE).await?;

    let provider_names: Vec<String> = providers.keys().cloned().collect();
    info!(providers = ?provider_names, "LLM providers configured");

    let inference = Arc::new(ProviderAgentInference::new(providers));
    let commands = Arc::new(builtin_registry(HttpClient::new()));
    info!(commands = ?commands.names(), "Command registry built");

    let executor = StepExecutor::new(agents.clone(), inference, commands.clone())
        .with_max_depth(config.execution.max_depth)
        .with_task_max_rounds(config.execution.task_max_rounds);
    let runner = ChainRunnerImpl::new(chains.clone(), executor)
        .with_settings(config.execution.settings());

    let agent_service = AgentService::new(agents).with_known_providers(provider_names);
    agent_service.seed(config.agents.clone()).await?;

    let chain_service = ChainService::new(chains, Arc::new(runner));
    if let Some(ref dir) = config.chains.seed_dir {
        chain_service.load_seed_dir(dir).await?;
    }

    Ok(AppState::new(Arc::new(chain_service), Arc::new(agent_service), commands)
        .with_api_key(config.auth.api_key.clone()))
}
