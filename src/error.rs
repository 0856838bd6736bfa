use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::LOG_TARGET;

/// Gate error taxonomy.
///
/// Only `Internal` (and `ConfigError` at startup) is fatal. Address and
/// detection failures degrade to "allowlist did not match" inside the gate,
/// and `Unauthorized`/`AccessDenied` exist to shape deny responses.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("IP detection failed: {0}")]
    IpDetectionFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("Internal gate error: {0}")]
    Internal(String),
}

impl GateError {
    /// Build an `Unauthorized` error, defaulting the message when empty.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::Unauthorized(crate::gate::DEFAULT_FAIL_MESSAGE.to_string())
        } else {
            Self::Unauthorized(message)
        }
    }

    /// HTTP status associated with this error kind.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            GateError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GateError::AccessDenied(_) => StatusCode::FORBIDDEN,
            GateError::IpDetectionFailed(_)
            | GateError::ConfigError(_)
            | GateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body for unexpected failures.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: &'static str,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            // Deny responses carry the operator-configured text verbatim
            GateError::Unauthorized(message) | GateError::AccessDenied(message) => {
                (status, message).into_response()
            }
            other => {
                // Full detail stays in the logs; clients get a fixed message
                tracing::error!(target: LOG_TARGET, error = %other, "Access key gate failed");

                let body = ErrorResponse {
                    error: "internal_error",
                    message: "An error occurred in the access key gate. Please check the logs.",
                };
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
            }
        }
    }
}

/// Convenience type alias for Results with GateError.
pub type GateResult<T> = Result<T, GateError>;
