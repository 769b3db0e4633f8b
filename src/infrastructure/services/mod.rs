//! Infrastructure services

mod agent_service;
mod chain_service;

pub use agent_service::{AgentService, UpsertAgentRequest};
pub use chain_service::{ChainService, CreateChainRequest};
