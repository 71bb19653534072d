//! # Hook-Relay Core
//!
//! Core business logic for the Hook-Relay webhook ingress and loader services.
//!
//! This crate contains the domain logic for verifying webhook signatures,
//! decoding push-delivered relay envelopes, normalizing event records onto the
//! fixed sink schema, and loading rows into the analytical sink.
//!
//! ## Architecture
//!
//! - Business logic is pure and returns explicit error types
//! - External services are reached through traits ([`sink::RowSink`],
//!   [`relay_runtime::RelayPublisher`])
//! - Concrete infrastructure lives in [`adapters`] and is injected at startup
//!
//! ## Usage
//!
//! ```rust
//! use hook_relay_core::{envelope, normalize::normalize};
//! use serde_json::json;
//!
//! let push = json!({"message": {"data": "eyJhcHBJZCI6MX0="}});
//! let records = envelope::decode(&push).unwrap();
//! let rows = normalize(&records);
//! assert_eq!(rows[0].get("appId"), Some(&json!(1)));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod adapters;
pub mod envelope;
pub mod normalize;
pub mod signature;
pub mod sink;

// Re-export commonly used types
pub use envelope::{decode, DecodeError, EventRecord, PushEnvelope};
pub use normalize::{normalize, NormalizedRow, EXPECTED_COLUMNS};
pub use signature::{SignatureError, SignatureVerifier};
pub use sink::{RowInsertError, RowSink, SinkError, TableRef};
pub use uuid::Uuid;

// ============================================================================
// Shared Types
// ============================================================================

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Identifier tying together the log lines and relayed message of one request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new random correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Adopt an incoming correlation ID, or mint one when the value is
    /// unusable as a header value
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() && v.len() <= 128 && v.chars().all(|c| c.is_ascii_graphic()) => {
                Self(v.to_string())
            }
            _ => Self::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_header(Some(s)))
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
