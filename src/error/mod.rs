use crate::fallback::FallbackAttempt;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for configuration and admin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by configuration loading and the admin surface
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Circuit breaker not found: {0}")]
    BreakerNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BreakerNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Outcome errors of the resilience primitives, generic over the wrapped
/// operation's own error type.
#[derive(Error, Debug)]
pub enum ResilienceError<E> {
    /// The breaker rejected the call without running the operation
    #[error("Circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    #[error("No fallback options provided")]
    NoFallbackOptions,

    /// Every fallback option failed; one entry per option tried
    #[error("All {} fallback options failed", .attempts.len())]
    AllFallbacksFailed { attempts: Vec<FallbackAttempt> },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Operation(E),
}

impl<E> ResilienceError<E> {
    /// Get the HTTP status code a boundary layer should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResilienceError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ResilienceError::NoFallbackOptions => StatusCode::INTERNAL_SERVER_ERROR,
            ResilienceError::AllFallbacksFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ResilienceError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            ResilienceError::Operation(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResilienceError::Cancelled)
    }

    /// Unwrap the operation's own error, if this is one
    pub fn into_operation(self) -> Option<E> {
        match self {
            ResilienceError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Low-level connection failure kinds an upstream call can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFault {
    Reset,
    Refused,
    TimedOut,
}

/// Ready-made operation error for callers that do not bring their own
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UpstreamError {
    /// HTTP-style status reported by the upstream, if any
    pub status: Option<u16>,
    /// Connection-level failure, if any
    pub connection: Option<ConnectionFault>,
    pub message: String,
}

impl UpstreamError {
    /// An error carrying an upstream HTTP status
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            connection: None,
            message: message.into(),
        }
    }

    /// A connection-level error without a status
    pub fn connection(fault: ConnectionFault, message: impl Into<String>) -> Self {
        Self {
            status: None,
            connection: Some(fault),
            message: message.into(),
        }
    }

    /// An error with neither status nor connection fault
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            status: None,
            connection: None,
            message: message.into(),
        }
    }
}
