//! Error types for the HTTP services

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hook_relay_core::{DecodeError, SignatureError, SinkError, Timestamp};
use relay_runtime::RelayError;
use tracing::{error, warn};

use crate::responses::ErrorResponse;

/// Detail returned for every authentication failure
pub const UNAUTHORIZED_DETAIL: &str = "Unauthorized: Invalid signature";

/// Handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: the request body or envelope cannot be understood
/// - `401 Unauthorized`: the delivery signature is absent or wrong
/// - `500 Internal Server Error`: the channel or the sink failed
///
/// Authentication failures never reveal why the signature was refused.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Request body is not valid JSON
    ///
    /// Maps to: `400 Bad Request`
    #[error("Invalid JSON payload: {message}")]
    MalformedBody { message: String },

    /// Signature header absent or not matching
    ///
    /// Maps to: `401 Unauthorized`
    #[error("Unauthorized: {0}")]
    Unauthorized(SignatureError),

    /// Channel did not accept the message
    ///
    /// Maps to: `500 Internal Server Error`
    #[error("Error publishing to Pub/Sub: {0}")]
    RelayFailed(#[from] RelayError),

    /// Push envelope could not be decoded
    ///
    /// Maps to: `400 Bad Request`
    #[error("Error processing message: {0}")]
    DecodeFailed(#[from] DecodeError),

    /// Sink refused rows or could not be reached
    ///
    /// Maps to: `500 Internal Server Error`
    #[error("{0}")]
    SinkFailed(#[from] SinkError),

    /// Unexpected internal failure; details are logged, not returned
    ///
    /// Maps to: `500 Internal Server Error`
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl From<SignatureError> for HandlerError {
    fn from(error: SignatureError) -> Self {
        if error.is_authentication_failure() {
            Self::Unauthorized(error)
        } else {
            Self::Internal {
                message: error.to_string(),
            }
        }
    }
}

impl HandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedBody { .. } | Self::DecodeFailed(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RelayFailed(_) | Self::SinkFailed(_) | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing detail string
    pub fn detail(&self) -> String {
        match self {
            Self::Unauthorized(_) => UNAUTHORIZED_DETAIL.to_string(),
            Self::Internal { .. } => "Internal server error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorResponse {
            detail: self.detail(),
            status: status.as_u16(),
            timestamp: Timestamp::now(),
        };

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {message}")]
    Load { message: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
