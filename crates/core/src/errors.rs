use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid Salesforce account id `{0}` (expected 15 or 18 alphanumeric characters)")]
    InvalidAccountId(String),
    #[error("invalid date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("{0} is not configured")]
    NotConfigured(String),
    #[error("integration failure: {0}")]
    Integration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl ApplicationError {
    /// Classifies the failure for the caller. Input and lookup problems keep
    /// their message; integration failures are reported as internal.
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Domain(error) => InterfaceError::BadRequest { message: error.to_string(), correlation_id },
            Self::InvalidInput(message) => InterfaceError::BadRequest { message, correlation_id },
            Self::NotFound(message) => InterfaceError::NotFound { message, correlation_id },
            error @ Self::NotConfigured(_) => {
                InterfaceError::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            Self::Integration(message) => InterfaceError::Internal { message, correlation_id },
        }
    }
}
