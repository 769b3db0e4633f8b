//! Optional API key check for the `/api` routes

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;

/// Reject requests without the configured key; a no-op when no key is configured
///
/// The key is read from either:
/// - Authorization header: `Bearer <api_key>`
/// - X-API-Key header: `<api_key>`
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    match extract_api_key_from_headers(request.headers()) {
        Ok(provided) if provided == expected => next.run(request).await,
        Ok(provided) => {
            debug!(
                key_prefix = %provided.chars().take(4).collect::<String>(),
                "Rejected request with invalid API key"
            );
            ApiError::unauthorized("Invalid API key").into_response()
        }
        Err(e) => e.into_response(),
    }
}

fn extract_api_key_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    if let Some(api_key_header) = headers.get("x-api-key") {
        let key = api_key_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid X-API-Key header encoding"))?;

        return Ok(key.trim().to_string());
    }

    Err(ApiError::unauthorized(
        "API key required. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header",
    ))
}
