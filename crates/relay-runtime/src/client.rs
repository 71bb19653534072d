//! Publisher trait and factory for relay channels.

use crate::auth::AccessTokenProvider;
use crate::error::RelayError;
use crate::message::{MessageId, RelayMessage};
use crate::provider::{ChannelConfig, ProviderType};
use crate::providers::{InMemoryChannel, PubSubPublisher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Main interface for handing payloads to a durable channel
///
/// Implementations must be safe to share across concurrent requests; one
/// publisher is built at startup and reused for the life of the process.
#[async_trait]
pub trait RelayPublisher: Send + Sync {
    /// Publish one message and wait until the channel acknowledges durable
    /// acceptance
    ///
    /// Delivery is at-least-once: calling this twice with the same message
    /// publishes it twice.
    async fn publish(&self, message: RelayMessage) -> Result<MessageId, RelayError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// Human-readable destination, for logs
    fn destination(&self) -> String;
}

/// Builds publishers from configuration
pub struct RelayClientFactory;

impl RelayClientFactory {
    /// Create a publisher for the configured provider
    ///
    /// `http` is the process-wide HTTP client; `tokens` supplies credentials
    /// for Google endpoints and is ignored for emulators and in-memory
    /// channels.
    pub fn create_publisher(
        config: ChannelConfig,
        http: reqwest::Client,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Arc<dyn RelayPublisher>, RelayError> {
        let publisher: Arc<dyn RelayPublisher> = match config {
            ChannelConfig::PubSub(pubsub) => {
                Arc::new(PubSubPublisher::new(http, &pubsub, tokens)?)
            }
            ChannelConfig::InMemory(memory) => Arc::new(InMemoryChannel::new(memory)),
        };

        info!(
            provider = %publisher.provider_type(),
            destination = %publisher.destination(),
            "Created relay publisher"
        );

        Ok(publisher)
    }
}
