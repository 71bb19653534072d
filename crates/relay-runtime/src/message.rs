//! Message types for channel operations including core identifiers.

use crate::error::{RelayError, ValidationError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

// ============================================================================
// Core Identifiers
// ============================================================================

/// Fully qualified Pub/Sub topic: `projects/{project}/topics/{topic}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicPath {
    project_id: String,
    topic_id: String,
}

impl TopicPath {
    /// Create new topic path with validation
    ///
    /// Topic IDs follow the Pub/Sub resource naming rules: 3-255 characters,
    /// starting with a letter, drawn from `[A-Za-z0-9-_.~+%]`, and not
    /// starting with `goog`.
    pub fn new(project_id: &str, topic_id: &str) -> Result<Self, ValidationError> {
        if project_id.is_empty() {
            return Err(ValidationError::Required {
                field: "project_id".to_string(),
            });
        }

        if project_id.contains('/') || project_id.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidFormat {
                field: "project_id".to_string(),
                message: "must not contain slashes or whitespace".to_string(),
            });
        }

        if topic_id.is_empty() {
            return Err(ValidationError::Required {
                field: "topic_id".to_string(),
            });
        }

        if topic_id.len() < 3 || topic_id.len() > 255 {
            return Err(ValidationError::OutOfRange {
                field: "topic_id".to_string(),
                message: "must be 3-255 characters".to_string(),
            });
        }

        if !topic_id.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidFormat {
                field: "topic_id".to_string(),
                message: "must start with a letter".to_string(),
            });
        }

        if !topic_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.~+%".contains(c))
        {
            return Err(ValidationError::InvalidFormat {
                field: "topic_id".to_string(),
                message: "only letters, digits and -_.~+% allowed".to_string(),
            });
        }

        if topic_id.starts_with("goog") {
            return Err(ValidationError::InvalidFormat {
                field: "topic_id".to_string(),
                message: "must not start with 'goog'".to_string(),
            });
        }

        Ok(Self {
            project_id: project_id.to_string(),
            topic_id: topic_id.to_string(),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    /// Resource name as used in REST paths
    pub fn resource_name(&self) -> String {
        format!("projects/{}/topics/{}", self.project_id, self.topic_id)
    }
}

impl std::fmt::Display for TopicPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resource_name())
    }
}

/// Identifier the channel assigns to an accepted message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// A message to be published to the relay channel
#[derive(Debug, Clone, PartialEq)]
pub struct RelayMessage {
    pub body: Bytes,
    pub attributes: HashMap<String, String>,
}

impl RelayMessage {
    /// Create new message with body
    pub fn new(body: Bytes) -> Self {
        Self {
            body,
            attributes: HashMap::new(),
        }
    }

    /// JSON-encode a payload as UTF-8 bytes, without any field filtering
    pub fn from_json<T: Serialize + ?Sized>(payload: &T) -> Result<Self, RelayError> {
        let body = serde_json::to_vec(payload)?;
        Ok(Self::new(Bytes::from(body)))
    }

    /// Add message attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Size of the body in bytes
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
