//! In-memory channel implementation for testing and development.
//!
//! Published messages are retained in order so tests can inspect exactly
//! what the ingress relayed, and so a retained message can be replayed to a
//! loader as a push envelope.

use crate::client::RelayPublisher;
use crate::error::RelayError;
use crate::message::{MessageId, RelayMessage};
use crate::provider::{InMemoryConfig, ProviderType};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// A message accepted by the in-memory channel
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub message_id: MessageId,
    pub body: Bytes,
    pub attributes: HashMap<String, String>,
    pub published_at: DateTime<Utc>,
}

impl PublishedMessage {
    /// Render the message as the push envelope a subscription would deliver
    pub fn push_envelope(&self, subscription: &str) -> serde_json::Value {
        serde_json::json!({
            "message": {
                "data": general_purpose::STANDARD.encode(&self.body),
                "messageId": self.message_id.as_str(),
                "attributes": self.attributes,
                "publishTime": self.published_at.to_rfc3339(),
            },
            "subscription": subscription,
        })
    }
}

/// Thread-safe in-memory channel
#[derive(Clone)]
pub struct InMemoryChannel {
    messages: Arc<RwLock<Vec<PublishedMessage>>>,
    config: InMemoryConfig,
}

impl InMemoryChannel {
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
            config,
        }
    }

    /// Snapshot of retained messages in publish order
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.messages
            .read()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Remove and return all retained messages
    pub fn drain(&self) -> Vec<PublishedMessage> {
        self.messages
            .write()
            .map(|mut messages| std::mem::take(&mut *messages))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl RelayPublisher for InMemoryChannel {
    async fn publish(&self, message: RelayMessage) -> Result<MessageId, RelayError> {
        let max_size = ProviderType::InMemory.max_message_size();
        if message.size() > max_size {
            return Err(RelayError::MessageTooLarge {
                size: message.size(),
                max_size,
            });
        }

        let mut messages = self
            .messages
            .write()
            .map_err(|e| RelayError::ProviderError {
                provider: ProviderType::InMemory.to_string(),
                code: "LockPoisoned".to_string(),
                message: e.to_string(),
            })?;

        if messages.len() >= self.config.max_messages {
            return Err(RelayError::ProviderError {
                provider: ProviderType::InMemory.to_string(),
                code: "ResourceExhausted".to_string(),
                message: format!("channel holds {} messages", messages.len()),
            });
        }

        let message_id = MessageId::new();
        messages.push(PublishedMessage {
            message_id: message_id.clone(),
            body: message.body,
            attributes: message.attributes,
            published_at: Utc::now(),
        });

        Ok(message_id)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }

    fn destination(&self) -> String {
        "in-memory".to_string()
    }
}
