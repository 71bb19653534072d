//! Tests for the in-memory channel.

use super::*;

#[tokio::test]
async fn test_publish_retains_messages_in_order() {
    let channel = InMemoryChannel::default();

    let first = channel
        .publish(RelayMessage::new(Bytes::from_static(b"1")))
        .await
        .unwrap();
    let second = channel
        .publish(RelayMessage::new(Bytes::from_static(b"2")))
        .await
        .unwrap();

    let published = channel.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].message_id, first);
    assert_eq!(published[1].message_id, second);
    assert_eq!(&published[1].body[..], b"2");
}

#[tokio::test]
async fn test_republishing_same_message_is_not_deduplicated() {
    let channel = InMemoryChannel::default();
    let message = RelayMessage::new(Bytes::from_static(b"{}"));

    let first = channel.publish(message.clone()).await.unwrap();
    let second = channel.publish(message).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(channel.len(), 2);
}

#[tokio::test]
async fn test_capacity_limit_refuses_publish() {
    let channel = InMemoryChannel::new(InMemoryConfig { max_messages: 1 });

    channel
        .publish(RelayMessage::new(Bytes::from_static(b"a")))
        .await
        .unwrap();
    let error = channel
        .publish(RelayMessage::new(Bytes::from_static(b"b")))
        .await
        .unwrap_err();

    assert!(matches!(error, RelayError::ProviderError { ref code, .. } if code == "ResourceExhausted"));
}

#[tokio::test]
async fn test_drain_empties_channel() {
    let channel = InMemoryChannel::default();
    channel
        .publish(RelayMessage::new(Bytes::from_static(b"x")))
        .await
        .unwrap();

    let drained = channel.drain();

    assert_eq!(drained.len(), 1);
    assert!(channel.is_empty());
}

#[tokio::test]
async fn test_push_envelope_shape() {
    let channel = InMemoryChannel::default();
    let id = channel
        .publish(
            RelayMessage::new(Bytes::from_static(br#"{"appId":1}"#))
                .with_attribute("source", "hubspot"),
        )
        .await
        .unwrap();

    let envelope = channel.published()[0].push_envelope("projects/p/subscriptions/s");

    assert_eq!(envelope["message"]["data"], "eyJhcHBJZCI6MX0=");
    assert_eq!(envelope["message"]["messageId"], id.as_str());
    assert_eq!(envelope["message"]["attributes"]["source"], "hubspot");
    assert_eq!(envelope["subscription"], "projects/p/subscriptions/s");
}
