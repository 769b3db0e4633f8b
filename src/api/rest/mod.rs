//! REST API for chains, steps, agents and commands

pub mod agents;
pub mod chains;
pub mod commands;
pub mod steps;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use super::state::AppState;

/// Create the `/api` router
pub fn create_rest_router() -> Router<AppState> {
    Router::new()
        // Chains
        .route("/chain", get(chains::list_chains).post(chains::create_chain))
        .route("/chain/import", post(chains::import_chain))
        .route(
            "/chain/{name}",
            get(chains::get_chain)
                .post(chains::run_chain)
                .put(chains::rename_chain)
                .delete(chains::delete_chain),
        )
        .route("/chain/{name}/args", get(chains::chain_args))
        .route("/chain/{name}/export", get(chains::export_chain))
        .route(
            "/chain/{name}/run/step/{step_number}",
            post(chains::run_single_step),
        )
        // Steps
        .route("/chain/{name}/step", post(steps::add_step))
        .route("/chain/{name}/step/move", patch(steps::move_step))
        .route(
            "/chain/{name}/step/{step_number}",
            put(steps::upsert_step).delete(steps::delete_step),
        )
        // Agents
        .route("/agent", get(agents::list_agents))
        .route(
            "/agent/{name}",
            get(agents::get_agent)
                .put(agents::upsert_agent)
                .delete(agents::delete_agent),
        )
        // Commands
        .route("/command", get(commands::list_commands))
}
