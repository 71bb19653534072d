//! Tests for the webhook ingress handler.

use super::*;
use crate::{create_ingress_router, ServerConfig, ServiceMetrics};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use hook_relay_core::SignatureVerifier;
use mockall::mock;
use relay_runtime::{InMemoryChannel, MessageId, ProviderType, RelayError, RelayPublisher};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

mock! {
    pub Publisher {}

    #[async_trait]
    impl RelayPublisher for Publisher {
        async fn publish(&self, message: RelayMessage) -> Result<MessageId, RelayError>;
        fn provider_type(&self) -> ProviderType;
        fn destination(&self) -> String;
    }
}

fn router_with(publisher: Arc<dyn RelayPublisher>) -> (Router, Arc<ServiceMetrics>) {
    let metrics = ServiceMetrics::new("relay-ingress").unwrap();
    let state = IngressState::new(
        Arc::new(SignatureVerifier::new(SECRET)),
        publisher,
        "X-HubSpot-Signature",
        Arc::clone(&metrics),
    )
    .unwrap();
    (create_ingress_router(state, &ServerConfig::default()), metrics)
}

fn sign(body: &str) -> String {
    SignatureVerifier::new(SECRET).compute_raw(body.as_bytes())
}

fn webhook(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("X-HubSpot-Signature", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_valid_signature_publishes_payload() {
    let channel = InMemoryChannel::default();
    let (router, metrics) = router_with(Arc::new(channel.clone()));
    let body = r#"[{"eventId":1,"subscriptionType":"contact.creation"}]"#;

    let response = router.oneshot(webhook(body, Some(&sign(body)))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");

    let published = channel.published();
    assert_eq!(published.len(), 1);
    assert_eq!(json["message_id"], published[0].message_id.as_str());
    let relayed: Value = serde_json::from_slice(&published[0].body).unwrap();
    assert_eq!(relayed, serde_json::from_str::<Value>(body).unwrap());
    assert_eq!(metrics.webhooks_received_total.get(), 1);
}

#[tokio::test]
async fn test_numbers_beyond_u64_are_relayed_exactly() {
    let channel = InMemoryChannel::default();
    let (router, _) = router_with(Arc::new(channel.clone()));
    let body = r#"{"objectId":18446744073709551617,"occurredAt":-9223372036854775809,"score":0.1}"#;

    let response = router.oneshot(webhook(body, Some(&sign(body)))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(channel.published()[0].body.as_ref(), body.as_bytes());
}

#[tokio::test]
async fn test_published_message_carries_source_and_correlation() {
    let channel = InMemoryChannel::default();
    let (router, _) = router_with(Arc::new(channel.clone()));
    let body = r#"{"a":1}"#;
    let mut request = webhook(body, Some(&sign(body)));
    request
        .headers_mut()
        .insert("x-correlation-id", "corr-42".parse().unwrap());

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        "corr-42"
    );
    let attributes = &channel.published()[0].attributes;
    assert_eq!(attributes.get(SOURCE_ATTRIBUTE).map(String::as_str), Some(SOURCE_HUBSPOT));
    assert_eq!(
        attributes.get(CORRELATION_ATTRIBUTE).map(String::as_str),
        Some("corr-42")
    );
}

#[tokio::test]
async fn test_canonical_signature_is_accepted_for_spaced_body() {
    let channel = InMemoryChannel::default();
    let (router, _) = router_with(Arc::new(channel.clone()));
    let body = r#"{ "a": 1 }"#;

    let response = router
        .oneshot(webhook(body, Some(&sign(r#"{"a":1}"#))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(channel.len(), 1);
}

#[tokio::test]
async fn test_wrong_signature_is_unauthorized_and_not_published() {
    let channel = InMemoryChannel::default();
    let (router, metrics) = router_with(Arc::new(channel.clone()));
    let body = r#"{"a":1}"#;

    let response = router
        .oneshot(webhook(body, Some(&"0".repeat(64))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["detail"], "Unauthorized: Invalid signature");
    assert!(channel.is_empty());
    assert_eq!(metrics.signature_failures_total.get(), 1);
}

#[tokio::test]
async fn test_missing_signature_is_unauthorized() {
    let channel = InMemoryChannel::default();
    let (router, _) = router_with(Arc::new(channel.clone()));

    let response = router.oneshot(webhook(r#"{"a":1}"#, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(channel.is_empty());
}

#[tokio::test]
async fn test_uppercase_signature_is_unauthorized() {
    let channel = InMemoryChannel::default();
    let (router, _) = router_with(Arc::new(channel.clone()));
    let body = r#"{"a":1}"#;

    let response = router
        .oneshot(webhook(body, Some(&sign(body).to_uppercase())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let channel = InMemoryChannel::default();
    let (router, _) = router_with(Arc::new(channel.clone()));
    let body = "{not json";

    let response = router.oneshot(webhook(body, Some(&sign(body)))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(channel.is_empty());
}

#[tokio::test]
async fn test_publish_failure_is_server_error() {
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(1).returning(|_| {
        Err(RelayError::ConnectionFailed {
            message: "connection refused".to_string(),
        })
    });
    publisher
        .expect_destination()
        .returning(|| "projects/p/topics/t".to_string());
    let (router, metrics) = router_with(Arc::new(publisher));
    let body = r#"{"a":1}"#;

    let response = router.oneshot(webhook(body, Some(&sign(body)))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("Error publishing to Pub/Sub"));
    assert_eq!(json["status"], 500);
    assert_eq!(metrics.relay_publish_failures_total.get(), 1);
}

#[tokio::test]
async fn test_bad_signature_never_reaches_publisher() {
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(0);
    let (router, _) = router_with(Arc::new(publisher));

    let response = router
        .oneshot(webhook(r#"{"a":1}"#, Some("deadbeef")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_invalid_signature_header_name_is_rejected() {
    let result = IngressState::new(
        Arc::new(SignatureVerifier::new(SECRET)),
        Arc::new(InMemoryChannel::default()),
        "bad header",
        ServiceMetrics::new("relay-ingress").unwrap(),
    );

    assert!(matches!(result, Err(crate::ConfigError::Invalid { .. })));
}
