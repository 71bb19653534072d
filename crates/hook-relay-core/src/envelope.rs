//! Push-delivery envelope decoding.
//!
//! The channel delivers each relayed message to the loader as
//!
//! ```json
//! {
//!   "message": {
//!     "data": "<base64 of the JSON payload>",
//!     "messageId": "...",
//!     "attributes": {"source": "hubspot"},
//!     "publishTime": "..."
//!   },
//!   "subscription": "projects/.../subscriptions/..."
//! }
//! ```
//!
//! Only `message.data` is required. The decoded payload is either a single
//! event object or an ordered array of them.

use base64::Engine;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// One webhook event as a loosely typed key/value map
pub type EventRecord = Map<String, Value>;

/// Errors produced while decoding a push envelope
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid push envelope: {reason}")]
    InvalidEnvelope { reason: String },

    #[error("message data is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("message data is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("unexpected payload shape: {reason}")]
    UnexpectedShape { reason: String },
}

/// Parsed push envelope with the metadata kept for logging
#[derive(Debug, Clone, PartialEq)]
pub struct PushEnvelope {
    pub data: String,
    pub message_id: Option<String>,
    pub publish_time: Option<String>,
    pub attributes: HashMap<String, String>,
    pub subscription: Option<String>,
}

impl PushEnvelope {
    /// Extract the envelope fields from a parsed request body
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidEnvelope`] if `message` is not an object
    /// or `message.data` is not a string.
    pub fn from_value(body: &Value) -> Result<Self, DecodeError> {
        let message = body
            .get("message")
            .and_then(Value::as_object)
            .ok_or_else(|| DecodeError::InvalidEnvelope {
                reason: "missing 'message' object".to_string(),
            })?;

        let data = message
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::InvalidEnvelope {
                reason: "missing 'message.data' string".to_string(),
            })?;

        let attributes = message
            .get("attributes")
            .and_then(Value::as_object)
            .map(|attrs| {
                attrs
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            data: data.to_string(),
            message_id: string_field(message.get("messageId").or_else(|| message.get("message_id"))),
            publish_time: string_field(
                message
                    .get("publishTime")
                    .or_else(|| message.get("publish_time")),
            ),
            attributes,
            subscription: string_field(body.get("subscription")),
        })
    }

    /// Base64-decoded message data
    pub fn payload_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(base64::engine::general_purpose::STANDARD.decode(self.data.trim())?)
    }

    /// Decode the payload into event records
    pub fn records(&self) -> Result<Vec<EventRecord>, DecodeError> {
        let bytes = self.payload_bytes()?;
        let payload: Value = serde_json::from_slice(&bytes)?;
        records_from_json(payload)
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// Decode a push envelope into its event records
///
/// A single object yields a one-element vector; an array yields its elements
/// in order. Any failure rejects the whole envelope.
pub fn decode(body: &Value) -> Result<Vec<EventRecord>, DecodeError> {
    let envelope = PushEnvelope::from_value(body)?;
    let records = envelope.records()?;

    debug!(
        message_id = envelope.message_id.as_deref().unwrap_or("-"),
        record_count = records.len(),
        "Decoded push envelope"
    );

    Ok(records)
}

/// Interpret a decoded payload as one or more event records
pub fn records_from_json(payload: Value) -> Result<Vec<EventRecord>, DecodeError> {
    match payload {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(DecodeError::UnexpectedShape {
                    reason: format!("element {} is {}, expected an object", index, kind(&other)),
                }),
            })
            .collect(),
        other => Err(DecodeError::UnexpectedShape {
            reason: format!("payload is {}, expected an object or array", kind(&other)),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
