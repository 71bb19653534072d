//! Provider types and configuration.

use crate::error::{ConfigurationError, RelayError};
use crate::message::TopicPath;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default Pub/Sub REST endpoint
pub const PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// Enumeration of supported channel providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    PubSub,
    InMemory,
}

impl ProviderType {
    /// Get maximum message size for provider
    pub fn max_message_size(&self) -> usize {
        match self {
            Self::PubSub => 10 * 1024 * 1024, // 10MB
            Self::InMemory => 10 * 1024 * 1024,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PubSub => write!(f, "PubSub"),
            Self::InMemory => write!(f, "InMemory"),
        }
    }
}

/// Provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    PubSub(PubSubConfig),
    InMemory(InMemoryConfig),
}

/// Google Cloud Pub/Sub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
    pub project_id: String,
    pub topic_id: String,

    /// REST endpoint, overridable for regional endpoints and tests
    #[serde(default = "default_pubsub_endpoint")]
    pub endpoint: String,

    /// `host:port` of a Pub/Sub emulator; when set, requests go over plain
    /// HTTP without credentials
    #[serde(default)]
    pub emulator_host: Option<String>,
}

fn default_pubsub_endpoint() -> String {
    PUBSUB_ENDPOINT.to_string()
}

impl PubSubConfig {
    /// Create configuration for the public Pub/Sub endpoint
    pub fn new(project_id: impl Into<String>, topic_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            topic_id: topic_id.into(),
            endpoint: default_pubsub_endpoint(),
            emulator_host: None,
        }
    }

    /// Validated topic path
    pub fn topic(&self) -> Result<TopicPath, RelayError> {
        Ok(TopicPath::new(&self.project_id, &self.topic_id)?)
    }

    /// Base URL requests are issued against
    pub fn base_url(&self) -> Result<Url, ConfigurationError> {
        let raw = match &self.emulator_host {
            Some(host) if !host.is_empty() => format!("http://{}", host),
            _ => self.endpoint.clone(),
        };

        Url::parse(&raw).map_err(|e| ConfigurationError::Invalid {
            message: format!("invalid Pub/Sub endpoint '{}': {}", raw, e),
        })
    }

    /// Whether requests target an emulator
    pub fn uses_emulator(&self) -> bool {
        self.emulator_host.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// In-memory channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Publishes beyond this many retained messages are refused
    pub max_messages: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 10000,
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
