use thiserror::Error;

use opshub_core::DomainError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned HTTP {status}: {body}")]
    Status { service: &'static str, status: u16, body: String },
    #[error("{service} resource not found: {resource}")]
    NotFound { service: &'static str, resource: String },
    #[error("{service} rejected the credentials: {detail}")]
    Authentication { service: &'static str, detail: String },
    #[error("{service} response could not be decoded: {detail}")]
    Decode { service: &'static str, detail: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    pub fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { service, source }
    }

    pub fn decode(service: &'static str, detail: impl ToString) -> Self {
        Self::Decode { service, detail: detail.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn service(&self) -> Option<&'static str> {
        match self {
            Self::NotConfigured { service }
            | Self::Transport { service, .. }
            | Self::Status { service, .. }
            | Self::NotFound { service, .. }
            | Self::Authentication { service, .. }
            | Self::Decode { service, .. } => Some(service),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<DomainError> for ClientError {
    fn from(value: DomainError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}
