//! Tests for the publisher factory.

use super::*;
use crate::auth::StaticTokenProvider;
use crate::provider::{InMemoryConfig, PubSubConfig};

fn tokens() -> Arc<dyn AccessTokenProvider> {
    Arc::new(StaticTokenProvider::new("token"))
}

#[test]
fn test_factory_creates_in_memory_publisher() {
    let publisher = RelayClientFactory::create_publisher(
        ChannelConfig::InMemory(InMemoryConfig::default()),
        reqwest::Client::new(),
        tokens(),
    )
    .unwrap();

    assert_eq!(publisher.provider_type(), ProviderType::InMemory);
}

#[test]
fn test_factory_creates_pubsub_publisher() {
    let publisher = RelayClientFactory::create_publisher(
        ChannelConfig::PubSub(PubSubConfig::new("proj", "webhooks")),
        reqwest::Client::new(),
        tokens(),
    )
    .unwrap();

    assert_eq!(publisher.provider_type(), ProviderType::PubSub);
    assert_eq!(publisher.destination(), "projects/proj/topics/webhooks");
}

#[test]
fn test_factory_propagates_invalid_topic() {
    let result = RelayClientFactory::create_publisher(
        ChannelConfig::PubSub(PubSubConfig::new("proj", "")),
        reqwest::Client::new(),
        tokens(),
    );

    assert!(matches!(result, Err(RelayError::Validation(_))));
}

#[tokio::test]
async fn test_publisher_is_shareable_across_tasks() {
    let publisher = RelayClientFactory::create_publisher(
        ChannelConfig::InMemory(InMemoryConfig::default()),
        reqwest::Client::new(),
        tokens(),
    )
    .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let publisher = Arc::clone(&publisher);
            tokio::spawn(async move {
                publisher
                    .publish(RelayMessage::new(bytes::Bytes::from(i.to_string())))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}
