//! Common test utilities for Hook-Relay integration tests
//!
//! This module provides:
//! - Router builders wired to in-memory collaborators
//! - Request builders for signed webhooks and push envelopes
//! - Response helpers

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use base64::Engine;
use hook_relay_api::{
    create_ingress_router, create_loader_router, IngressState, LoaderState, ServerConfig,
    ServiceMetrics, INGRESS_SERVICE, LOADER_PATH, LOADER_SERVICE,
};
use hook_relay_core::adapters::InMemorySink;
use hook_relay_core::signature::SIGNATURE_HEADER;
use hook_relay_core::{RowSink, SignatureVerifier};
use relay_runtime::{InMemoryChannel, RelayPublisher};
use std::sync::Arc;

/// Shared secret used by every test router
pub const TEST_SECRET: &str = "integration-secret";

/// Subscription name placed on synthesized push envelopes
pub const TEST_SUBSCRIPTION: &str = "projects/test-project/subscriptions/hubspot-loader";

// ============================================================================
// Router Builders
// ============================================================================

/// Ingress router publishing to `publisher`
#[allow(dead_code)]
pub fn ingress_router(publisher: Arc<dyn RelayPublisher>) -> Router {
    let metrics = ServiceMetrics::new(INGRESS_SERVICE).unwrap();
    let state = IngressState::new(
        Arc::new(SignatureVerifier::new(TEST_SECRET)),
        publisher,
        SIGNATURE_HEADER,
        metrics,
    )
    .unwrap();
    create_ingress_router(state, &ServerConfig::default())
}

/// Ingress router with an in-memory channel the test can inspect
#[allow(dead_code)]
pub fn ingress_with_channel() -> (Router, InMemoryChannel) {
    let channel = InMemoryChannel::default();
    (ingress_router(Arc::new(channel.clone())), channel)
}

/// Loader router writing to `sink`
#[allow(dead_code)]
pub fn loader_router(sink: Arc<dyn RowSink>) -> Router {
    let metrics = ServiceMetrics::new(LOADER_SERVICE).unwrap();
    create_loader_router(LoaderState::new(sink, metrics), &ServerConfig::default())
}

/// Loader router with an in-memory sink the test can inspect
#[allow(dead_code)]
pub fn loader_with_sink() -> (Router, InMemorySink) {
    let sink = InMemorySink::default();
    (loader_router(Arc::new(sink.clone())), sink)
}

// ============================================================================
// Request Builders
// ============================================================================

/// Signature the platform would send for `body`
#[allow(dead_code)]
pub fn sign(body: &str) -> String {
    SignatureVerifier::new(TEST_SECRET).compute_raw(body.as_bytes())
}

/// Webhook delivery signed with the test secret
#[allow(dead_code)]
pub fn signed_webhook(body: &str) -> Request<Body> {
    webhook_with_signature(body, Some(&sign(body)))
}

/// Webhook delivery with an arbitrary (or no) signature
#[allow(dead_code)]
pub fn webhook_with_signature(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Push delivery whose `message.data` is `payload` base64-encoded
#[allow(dead_code)]
pub fn push_of(payload: &str) -> Request<Body> {
    let data = base64::engine::general_purpose::STANDARD.encode(payload);
    push_request(&serde_json::json!({
        "message": {"data": data, "messageId": "1", "attributes": {"source": "hubspot"}},
        "subscription": TEST_SUBSCRIPTION
    }))
}

/// Push delivery carrying an arbitrary envelope
#[allow(dead_code)]
pub fn push_request(envelope: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(LOADER_PATH)
        .header("content-type", "application/json")
        .body(Body::from(envelope.to_string()))
        .unwrap()
}

// ============================================================================
// Response Helpers
// ============================================================================

/// Parse a response body as JSON
#[allow(dead_code)]
pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
