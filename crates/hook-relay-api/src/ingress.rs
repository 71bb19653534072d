//! Webhook ingress handler.
//!
//! A delivery moves through Received -> Verified -> Published -> Acked, or
//! stops at Rejected (bad JSON, bad signature) or Failed (channel error).
//! Nothing is retried here; the platform redelivers on any non-2xx answer.

use axum::{extract::State, http::HeaderMap, response::Json};
use bytes::Bytes;
use relay_runtime::RelayMessage;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{correlation_id, HandlerError, IngressState, PublishResponse};

/// Attribute naming the system the payload came from
pub const SOURCE_ATTRIBUTE: &str = "source";

/// Value of [`SOURCE_ATTRIBUTE`] on every relayed message
pub const SOURCE_HUBSPOT: &str = "hubspot";

/// Attribute carrying the request's correlation ID
pub const CORRELATION_ATTRIBUTE: &str = "correlation_id";

/// Verify and relay one webhook delivery
#[instrument(skip_all, fields(correlation_id, body_len = body.len()))]
pub async fn handle_webhook(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PublishResponse>, HandlerError> {
    state.metrics.webhooks_received_total.inc();

    let correlation_id = correlation_id(&headers);
    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    let payload: Value = serde_json::from_slice(&body).map_err(|e| HandlerError::MalformedBody {
        message: e.to_string(),
    })?;

    let header_token = headers
        .get(&state.signature_header)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = state.verifier.verify(header_token, &body, &payload) {
        state.metrics.signature_failures_total.inc();
        warn!(reason = %e, "Webhook signature rejected");
        return Err(e.into());
    }

    let message = RelayMessage::from_json(&payload)?
        .with_attribute(SOURCE_ATTRIBUTE, SOURCE_HUBSPOT)
        .with_attribute(CORRELATION_ATTRIBUTE, correlation_id.as_str());

    let message_id = match state.publisher.publish(message).await {
        Ok(id) => id,
        Err(e) => {
            state.metrics.relay_publish_failures_total.inc();
            return Err(e.into());
        }
    };

    info!(
        message_id = %message_id,
        destination = %state.publisher.destination(),
        "Webhook relayed"
    );

    Ok(Json(PublishResponse::ok(message_id.to_string())))
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod tests;
