//! Metrics collection for the HTTP services.
//!
//! Each service instance owns its own [`Registry`] so that several routers
//! can coexist in one process (tests) without duplicate-registration errors.

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_request_duration: HistogramVec,

    // Ingress metrics
    pub webhooks_received_total: IntCounter,
    pub signature_failures_total: IntCounter,
    pub relay_publish_failures_total: IntCounter,

    // Loader metrics
    pub envelopes_received_total: IntCounter,
    pub decode_failures_total: IntCounter,
    pub rows_inserted_total: IntCounter,
    pub sink_failures_total: IntCounter,
}

impl ServiceMetrics {
    /// Create metrics registered under `service` as a constant label
    pub fn new(service: &str) -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let counter = IntCounter::with_opts(Opts::new(name, help).const_label("service", service))?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let webhooks_received_total =
            counter("webhooks_received_total", "Webhook deliveries received")?;
        let signature_failures_total = counter(
            "signature_failures_total",
            "Webhook deliveries rejected for an absent or wrong signature",
        )?;
        let relay_publish_failures_total = counter(
            "relay_publish_failures_total",
            "Verified webhooks the channel did not accept",
        )?;
        let envelopes_received_total =
            counter("envelopes_received_total", "Push envelopes received")?;
        let decode_failures_total = counter(
            "decode_failures_total",
            "Push envelopes that could not be decoded",
        )?;
        let rows_inserted_total =
            counter("rows_inserted_total", "Rows accepted by the sink")?;
        let sink_failures_total = counter(
            "sink_failures_total",
            "Insert calls the sink refused or could not complete",
        )?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request processing time",
            )
            .const_label("service", service)
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_request_duration,
            webhooks_received_total,
            signature_failures_total,
            relay_publish_failures_total,
            envelopes_received_total,
            decode_failures_total,
            rows_inserted_total,
            sink_failures_total,
        }))
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: Duration) {
        self.http_request_duration
            .with_label_values(&[method, path, &status.to_string()])
            .observe(duration.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
