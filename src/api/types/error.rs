//! API error envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::{ChainError, DomainError};

/// Error categories reported in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    AuthenticationError,
    NotFoundError,
    ConflictError,
    UnprocessableError,
    ProviderError,
    TimeoutError,
    ServerError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::AuthenticationError => write!(f, "authentication_error"),
            Self::NotFoundError => write!(f, "not_found_error"),
            Self::ConflictError => write!(f, "conflict_error"),
            Self::UnprocessableError => write!(f, "unprocessable_error"),
            Self::ProviderError => write!(f, "provider_error"),
            Self::TimeoutError => write!(f, "timeout_error"),
            Self::ServerError => write!(f, "server_error"),
        }
    }
}

/// `{"error": {...}}` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                    code: None,
                },
            },
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.response.error.code = Some(code.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidRequestError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ApiErrorType::AuthenticationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiErrorType::NotFoundError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ApiErrorType::ConflictError, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorType::UnprocessableError,
            message,
        )
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, ApiErrorType::ProviderError, message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, ApiErrorType::TimeoutError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiErrorType::ServerError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::NotFound { message } => Self::not_found(message).with_code("not_found"),
            DomainError::Validation { message } => {
                Self::bad_request(message).with_code("validation_error")
            }
            DomainError::Conflict { message } => Self::conflict(message).with_code("conflict"),
            DomainError::Provider { .. } => {
                Self::bad_gateway(err.to_string()).with_code("provider_error")
            }
            DomainError::Configuration { message }
            | DomainError::Internal { message }
            | DomainError::Storage { message } => Self::internal(message),
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        let message = err.to_string();

        // A halted step reports the full path but is classified by its cause
        match err.root_cause() {
            ChainError::ChainNotFound(_) => Self::not_found(message).with_code("chain_not_found"),
            ChainError::AgentNotFound(_) => Self::not_found(message).with_code("agent_not_found"),
            ChainError::CommandNotFound(_) => {
                Self::not_found(message).with_code("command_not_found")
            }
            ChainError::InvalidPosition { .. } => {
                Self::bad_request(message).with_code("invalid_position")
            }
            ChainError::OutOfRange { .. } => Self::bad_request(message).with_code("out_of_range"),
            ChainError::Validation(_) => Self::bad_request(message).with_code("validation_error"),
            ChainError::CommandNotEnabled { .. } => {
                Self::bad_request(message).with_code("command_not_enabled")
            }
            ChainError::NameConflict(_) => Self::conflict(message).with_code("name_conflict"),
            ChainError::CyclicChainReference(_) => {
                Self::unprocessable(message).with_code("cyclic_chain_reference")
            }
            ChainError::MaxDepthExceeded(_) => {
                Self::unprocessable(message).with_code("max_depth_exceeded")
            }
            ChainError::Provider { .. } => Self::bad_gateway(message).with_code("provider_error"),
            ChainError::CommandFailed { .. } => {
                Self::bad_gateway(message).with_code("command_failed")
            }
            ChainError::Timeout { .. } => Self::gateway_timeout(message).with_code("step_timeout"),
            ChainError::Storage(_) | ChainError::StepFailed { .. } => Self::internal(message),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.response.error.error_type, self.response.error.message
        )
    }
}

impl std::error::Error for ApiError {}
