//! Agent registry endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{Agent, AgentSettings};
use crate::infrastructure::services::UpsertAgentRequest;

/// Request to create or replace an agent
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertAgentApiRequest {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub settings: AgentSettings,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl From<UpsertAgentApiRequest> for UpsertAgentRequest {
    fn from(request: UpsertAgentApiRequest) -> Self {
        Self {
            provider: request.provider,
            model: request.model,
            settings: request.settings,
            system_prompt: request.system_prompt,
            commands: request.commands,
        }
    }
}

/// List agents response
#[derive(Debug, Clone, Serialize)]
pub struct ListAgentsResponse {
    pub agents: Vec<Agent>,
    pub total: usize,
}

/// GET /api/agent
pub async fn list_agents(
    State(state): State<AppState>,
) -> Result<Json<ListAgentsResponse>, ApiError> {
    let agents = state.agent_service.list().await?;
    let total = agents.len();

    Ok(Json(ListAgentsResponse { agents, total }))
}

/// GET /api/agent/{name}
pub async fn get_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    let agent = state
        .agent_service
        .get(&name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Agent '{}' not found", name)))?;

    Ok(Json(agent))
}

/// PUT /api/agent/{name}
pub async fn upsert_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpsertAgentApiRequest>,
) -> Result<Json<Agent>, ApiError> {
    debug!(agent = %name, provider = %request.provider, "Saving agent");

    let agent = state.agent_service.upsert(&name, request.into()).await?;
    Ok(Json(agent))
}

/// DELETE /api/agent/{name}
pub async fn delete_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.agent_service.delete(&name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Agent '{}' not found", name)))
    }
}
