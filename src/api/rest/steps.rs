//! Step editing endpoints

use axum::extract::{Path, State};
use serde::Deserialize;

use super::chains::ChainResponse;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::chain::{ChainStep, ErrorPolicy, StepKind};

/// Step body for `PUT /step/{n}`; the position comes from the path
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertStepApiRequest {
    pub agent_name: String,
    #[serde(flatten)]
    pub kind: StepKind,
    #[serde(default)]
    pub on_error: Option<ErrorPolicy>,
}

/// Request to swap two steps
#[derive(Debug, Clone, Deserialize)]
pub struct MoveStepApiRequest {
    pub old_step_number: u32,
    pub new_step_number: u32,
}

/// POST /api/chain/{name}/step
pub async fn add_step(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(step): Json<ChainStep>,
) -> Result<Json<ChainResponse>, ApiError> {
    let chain = state.chain_service.add_step(&name, step).await?;
    Ok(Json(ChainResponse::from(&chain)))
}

/// PUT /api/chain/{name}/step/{step_number}
pub async fn upsert_step(
    State(state): State<AppState>,
    Path((name, step_number)): Path<(String, u32)>,
    Json(request): Json<UpsertStepApiRequest>,
) -> Result<Json<ChainResponse>, ApiError> {
    let mut step = ChainStep::new(step_number, request.agent_name, request.kind);
    step.on_error = request.on_error;

    let chain = state.chain_service.upsert_step(&name, step).await?;
    Ok(Json(ChainResponse::from(&chain)))
}

/// PATCH /api/chain/{name}/step/move
pub async fn move_step(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<MoveStepApiRequest>,
) -> Result<Json<ChainResponse>, ApiError> {
    let chain = state
        .chain_service
        .move_step(&name, request.old_step_number, request.new_step_number)
        .await?;

    Ok(Json(ChainResponse::from(&chain)))
}

/// DELETE /api/chain/{name}/step/{step_number}
pub async fn delete_step(
    State(state): State<AppState>,
    Path((name, step_number)): Path<(String, u32)>,
) -> Result<Json<ChainResponse>, ApiError> {
    let chain = state.chain_service.delete_step(&name, step_number).await?;
    Ok(Json(ChainResponse::from(&chain)))
}
