//! Response bodies for the HTTP services.

use hook_relay_core::Timestamp;
use serde::{Deserialize, Serialize};

/// Ingress success response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub status: String,
    pub message_id: String,
}

impl PublishResponse {
    pub fn ok(message_id: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message_id: message_id.into(),
        }
    }
}

/// Loader success response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResponse {
    pub status: String,
    pub inserted_rows: usize,
}

impl LoadResponse {
    pub fn ok(inserted_rows: usize) -> Self {
        Self {
            status: "ok".to_string(),
            inserted_rows,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: Timestamp,
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub status: u16,
    pub timestamp: Timestamp,
}
