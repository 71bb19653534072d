//! Push-delivery loader handler.
//!
//! Decodes the envelope, projects every record onto the sink schema and
//! inserts the rows in one call. A non-2xx answer makes the channel
//! redeliver the envelope, so a batch that partially landed before a failure
//! can land twice.

use axum::{extract::State, http::HeaderMap, response::Json};
use bytes::Bytes;
use hook_relay_core::{normalize, PushEnvelope};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{correlation_id, HandlerError, LoadResponse, LoaderState};

/// Decode one push envelope and load its rows
#[instrument(skip_all, fields(correlation_id, message_id))]
pub async fn handle_push(
    State(state): State<LoaderState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<LoadResponse>, HandlerError> {
    state.metrics.envelopes_received_total.inc();

    let correlation_id = correlation_id(&headers);
    let span = tracing::Span::current();
    span.record("correlation_id", correlation_id.as_str());

    let body: Value = serde_json::from_slice(&body).map_err(|e| HandlerError::MalformedBody {
        message: e.to_string(),
    })?;

    let records = match PushEnvelope::from_value(&body).and_then(|envelope| {
        if let Some(message_id) = &envelope.message_id {
            span.record("message_id", message_id.as_str());
        }
        envelope.records()
    }) {
        Ok(records) => records,
        Err(e) => {
            state.metrics.decode_failures_total.inc();
            warn!(error = %e, "Push envelope could not be decoded");
            return Err(e.into());
        }
    };

    let rows = normalize(&records);
    if rows.is_empty() {
        debug!("Envelope carried an empty batch");
        return Ok(Json(LoadResponse::ok(0)));
    }

    let inserted = match state.sink.insert_rows(&rows).await {
        Ok(inserted) => inserted,
        Err(e) => {
            state.metrics.sink_failures_total.inc();
            if let Some(row_errors) = e.row_errors() {
                warn!(
                    failed_rows = row_errors.len(),
                    submitted_rows = rows.len(),
                    table = %state.sink.table(),
                    "Sink refused rows"
                );
            }
            return Err(e.into());
        }
    };

    state.metrics.rows_inserted_total.inc_by(inserted as u64);
    info!(
        inserted_rows = inserted,
        table = %state.sink.table(),
        "Rows loaded"
    );

    Ok(Json(LoadResponse::ok(inserted)))
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
