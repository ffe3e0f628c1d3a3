use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use opshub_agent::AgentError;
use opshub_clients::ClientError;
use opshub_core::{ApplicationError, DomainError, InterfaceError};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error returned by every route: a status and the `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn not_configured(service: &'static str) -> Self {
        ClientError::NotConfigured { service }.into()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        match value {
            InterfaceError::BadRequest { message, .. } => Self::bad_request(message),
            InterfaceError::NotFound { message, .. } => Self::not_found(message),
            InterfaceError::ServiceUnavailable { message, .. } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
            }
            InterfaceError::Internal { message, correlation_id } => {
                error!(
                    event_name = "http.request.failed",
                    correlation_id = %correlation_id,
                    detail = %message,
                    "request failed"
                );
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(value: ApplicationError) -> Self {
        value.into_interface(Uuid::new_v4().to_string()).into()
    }
}

impl From<ClientError> for ApiError {
    fn from(value: ClientError) -> Self {
        let message = value.to_string();
        let application = match value {
            ClientError::NotConfigured { service } => ApplicationError::NotConfigured(service.to_owned()),
            ClientError::InvalidInput(detail) => ApplicationError::InvalidInput(detail),
            ClientError::NotFound { .. } => ApplicationError::NotFound(message),
            ClientError::Transport { .. }
            | ClientError::Status { .. }
            | ClientError::Authentication { .. }
            | ClientError::Decode { .. } => ApplicationError::Integration(message),
        };
        application.into()
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        ApplicationError::from(value).into()
    }
}

impl From<AgentError> for ApiError {
    fn from(value: AgentError) -> Self {
        match value {
            AgentError::Rejected { user_message, .. } => ApplicationError::InvalidInput(user_message).into(),
            other => ApplicationError::Integration(other.to_string()).into(),
        }
    }
}
