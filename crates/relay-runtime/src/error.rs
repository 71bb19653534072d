//! Error types for channel operations.

use thiserror::Error;

/// Comprehensive error type for all publish operations
///
/// Every variant is a relay failure from the caller's point of view. None of
/// them is an authentication failure of the inbound webhook; the
/// [`RelayError::Authentication`] variant concerns the credentials this
/// process presents to the channel.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Topic not found: {topic}")]
    TopicNotFound { topic: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Channel authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("Permission denied for topic: {topic}")]
    PermissionDenied { topic: String },

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("Provider error ({provider}): {code} - {message}")]
    ProviderError {
        provider: String,
        code: String,
        message: String,
    },

    #[error("Publish was not acknowledged: {message}")]
    NotAcknowledged { message: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors obtaining or presenting Google access tokens
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Token request failed: {message}")]
    TokenRequestFailed { message: String },

    #[error("Token response was invalid: {message}")]
    InvalidTokenResponse { message: String },

    #[error("Credentials rejected: {message}")]
    Rejected { message: String },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
