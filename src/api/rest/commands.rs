//! Command catalog endpoint

use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::types::Json;
use crate::domain::CommandDescriptor;

/// List commands response
#[derive(Debug, Clone, Serialize)]
pub struct ListCommandsResponse {
    pub commands: Vec<CommandDescriptor>,
    pub total: usize,
}

/// GET /api/command
pub async fn list_commands(State(state): State<AppState>) -> Json<ListCommandsResponse> {
    let commands = state.commands.descriptors();
    let total = commands.len();

    Json(ListCommandsResponse { commands, total })
}
