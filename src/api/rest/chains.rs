//! Chain endpoints: CRUD, rename, import/export and runs

use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::middleware::truncate_for_log;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::chain::{
    Chain, ChainDocument, ChainRunResult, ChainStep, RunMode, RunRequest, StepResponse,
};
use crate::infrastructure::services::CreateChainRequest;

/// Request to create a new chain
#[derive(Debug, Clone, Deserialize)]
pub struct CreateChainApiRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<ChainStep>,
}

/// Request to rename a chain
#[derive(Debug, Clone, Deserialize)]
pub struct RenameChainApiRequest {
    #[serde(alias = "name")]
    pub new_name: String,
}

/// Request to run a chain, fully or from a given step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunChainApiRequest {
    #[serde(default)]
    pub user_input: String,
    /// Agent used for every step of this run instead of the stored ones
    #[serde(default, alias = "agent_name")]
    pub agent_override: Option<String>,
    /// Include the per-step responses in the result
    #[serde(default)]
    pub all_responses: bool,
    /// Values for `{name}` placeholders
    #[serde(default)]
    pub args: HashMap<String, String>,
    #[serde(default)]
    pub start_from_step: Option<u32>,
    /// Outputs of steps skipped by a partial run
    #[serde(default)]
    pub step_outputs: BTreeMap<u32, String>,
}

impl RunChainApiRequest {
    fn into_run_request(self, mode: RunMode) -> RunRequest {
        let mut request = RunRequest::new(self.user_input).with_mode(mode);
        request.agent_override = self.agent_override.filter(|a| !a.trim().is_empty());
        request.args = self.args;
        request.step_outputs = self.step_outputs;
        request
    }
}

/// Query parameters for chain import
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportChainQuery {
    #[serde(default)]
    pub overwrite: bool,
}

/// Chain response
#[derive(Debug, Clone, Serialize)]
pub struct ChainResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub step_count: usize,
    pub steps: Vec<ChainStep>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Chain> for ChainResponse {
    fn from(chain: &Chain) -> Self {
        Self {
            name: chain.name().to_string(),
            description: chain.description().map(String::from),
            step_count: chain.len(),
            steps: chain.steps().to_vec(),
            created_at: chain.created_at().to_rfc3339(),
            updated_at: chain.updated_at().to_rfc3339(),
        }
    }
}

/// List chains response
#[derive(Debug, Clone, Serialize)]
pub struct ListChainsResponse {
    pub chains: Vec<ChainResponse>,
    pub total: usize,
}

/// Chain argument names response
#[derive(Debug, Clone, Serialize)]
pub struct ChainArgsResponse {
    pub chain_name: String,
    pub args: Vec<String>,
}

/// Result of a chain run; per-step responses only when requested
#[derive(Debug, Clone, Serialize)]
pub struct RunChainResponse {
    pub chain_name: String,
    pub output: String,
    pub execution_time_ms: u64,
    pub failed_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<BTreeMap<u32, StepResponse>>,
}

impl RunChainResponse {
    fn new(result: ChainRunResult, all_responses: bool) -> Self {
        let failed_steps = result.failed_steps();
        let responses = all_responses.then(|| {
            result
                .responses
                .into_iter()
                .map(|r| (r.step_number, r))
                .collect()
        });

        Self {
            chain_name: result.chain_name,
            output: result.output,
            execution_time_ms: result.execution_time_ms,
            failed_steps,
            responses,
        }
    }
}

/// GET /api/chain
pub async fn list_chains(
    State(state): State<AppState>,
) -> Result<Json<ListChainsResponse>, ApiError> {
    let chains = state.chain_service.list().await?;
    let chains: Vec<ChainResponse> = chains.iter().map(ChainResponse::from).collect();
    let total = chains.len();

    Ok(Json(ListChainsResponse { chains, total }))
}

/// POST /api/chain
pub async fn create_chain(
    State(state): State<AppState>,
    Json(request): Json<CreateChainApiRequest>,
) -> Result<(StatusCode, Json<ChainResponse>), ApiError> {
    debug!(chain = %request.name, "Creating chain");

    let mut create_request = CreateChainRequest::new(request.name).with_steps(request.steps);
    create_request.description = request.description;

    let chain = state.chain_service.create(create_request).await?;

    Ok((StatusCode::CREATED, Json(ChainResponse::from(&chain))))
}

/// GET /api/chain/{name}
pub async fn get_chain(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ChainResponse>, ApiError> {
    let chain = state.chain_service.get(&name).await?;
    Ok(Json(ChainResponse::from(&chain)))
}

/// PUT /api/chain/{name}
pub async fn rename_chain(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<RenameChainApiRequest>,
) -> Result<Json<ChainResponse>, ApiError> {
    let chain = state
        .chain_service
        .rename(&name, &request.new_name)
        .await?;

    Ok(Json(ChainResponse::from(&chain)))
}

/// DELETE /api/chain/{name}
pub async fn delete_chain(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.chain_service.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/chain/{name}
pub async fn run_chain(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<RunChainApiRequest>,
) -> Result<Json<RunChainResponse>, ApiError> {
    let mode = match request.start_from_step {
        Some(step_number) => RunMode::FromStep(step_number),
        None => RunMode::Full,
    };

    execute_run(&state, &name, request, mode).await
}

/// POST /api/chain/{name}/run/step/{step_number}
pub async fn run_single_step(
    State(state): State<AppState>,
    Path((name, step_number)): Path<(String, u32)>,
    Json(request): Json<RunChainApiRequest>,
) -> Result<Json<RunChainResponse>, ApiError> {
    execute_run(&state, &name, request, RunMode::SingleStep(step_number)).await
}

/// GET /api/chain/{name}/args
pub async fn chain_args(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ChainArgsResponse>, ApiError> {
    let args = state.chain_service.chain_args(&name).await?;

    Ok(Json(ChainArgsResponse {
        chain_name: name,
        args,
    }))
}

/// GET /api/chain/{name}/export
pub async fn export_chain(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ChainDocument>, ApiError> {
    Ok(Json(state.chain_service.export(&name).await?))
}

/// POST /api/chain/import
pub async fn import_chain(
    State(state): State<AppState>,
    Query(query): Query<ImportChainQuery>,
    Json(document): Json<ChainDocument>,
) -> Result<(StatusCode, Json<ChainResponse>), ApiError> {
    debug!(chain = %document.name, overwrite = query.overwrite, "Importing chain");

    let chain = state
        .chain_service
        .import(document, query.overwrite)
        .await?;

    Ok((StatusCode::CREATED, Json(ChainResponse::from(&chain))))
}

async fn execute_run(
    state: &AppState,
    name: &str,
    request: RunChainApiRequest,
    mode: RunMode,
) -> Result<Json<RunChainResponse>, ApiError> {
    let all_responses = request.all_responses;
    debug!(
        chain = %name,
        mode = ?mode,
        user_input = %truncate_for_log(&request.user_input, 200),
        "Running chain"
    );

    let result = state
        .chain_service
        .run(name, request.into_run_request(mode))
        .await?;

    info!(
        chain = %name,
        failed_steps = result.failed_steps(),
        duration_ms = result.execution_time_ms,
        "Chain run finished"
    );

    Ok(Json(RunChainResponse::new(result, all_responses)))
}
