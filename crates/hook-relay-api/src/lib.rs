//! # Hook-Relay HTTP Services
//!
//! HTTP routers for the two halves of the relay:
//!
//! - the **ingress** (`POST /`) verifies webhook signatures and publishes
//!   payloads onto the message channel;
//! - the **loader** (`POST /hubspot-events`) decodes push-delivered envelopes
//!   and inserts normalized rows into the warehouse.
//!
//! Both services also expose `GET /health` and `GET /metrics`.

pub mod config;
pub mod errors;
pub mod ingress;
pub mod loader;
pub mod metrics;
pub mod responses;

pub use config::{IngressSettings, LoaderSettings, LoggingConfig, ServerConfig};
pub use errors::{ConfigError, HandlerError, ServiceError};
pub use metrics::ServiceMetrics;
pub use responses::{ErrorResponse, HealthResponse, LoadResponse, PublishResponse};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use hook_relay_core::{CorrelationId, RowSink, SignatureVerifier, Timestamp};
use relay_runtime::RelayPublisher;
use std::{
    future::{Future, IntoFuture},
    sync::Arc,
    time::Duration,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

/// Service name reported by the ingress
pub const INGRESS_SERVICE: &str = "relay-ingress";

/// Service name reported by the loader
pub const LOADER_SERVICE: &str = "relay-loader";

/// Header carrying the per-request correlation ID
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Path the loader receives push deliveries on
pub const LOADER_PATH: &str = "/hubspot-events";

// ============================================================================
// Application State
// ============================================================================

/// Shared state of the ingress service
#[derive(Clone)]
pub struct IngressState {
    /// Verifier holding the shared secret
    pub verifier: Arc<SignatureVerifier>,

    /// Channel publisher
    pub publisher: Arc<dyn RelayPublisher>,

    /// Header the signature is read from
    pub signature_header: HeaderName,

    pub metrics: Arc<ServiceMetrics>,
}

impl IngressState {
    /// Create ingress state
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `signature_header` is not a valid
    /// HTTP header name.
    pub fn new(
        verifier: Arc<SignatureVerifier>,
        publisher: Arc<dyn RelayPublisher>,
        signature_header: &str,
        metrics: Arc<ServiceMetrics>,
    ) -> Result<Self, ConfigError> {
        let signature_header =
            HeaderName::try_from(signature_header).map_err(|e| ConfigError::Invalid {
                message: format!("invalid signature header '{}': {}", signature_header, e),
            })?;

        Ok(Self {
            verifier,
            publisher,
            signature_header,
            metrics,
        })
    }
}

/// Shared state of the loader service
#[derive(Clone)]
pub struct LoaderState {
    /// Warehouse sink
    pub sink: Arc<dyn RowSink>,

    pub metrics: Arc<ServiceMetrics>,
}

impl LoaderState {
    pub fn new(sink: Arc<dyn RowSink>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { sink, metrics }
    }
}

// ============================================================================
// HTTP Routers
// ============================================================================

/// Create the ingress router
pub fn create_ingress_router(state: IngressState, server: &ServerConfig) -> Router {
    let metrics = Arc::clone(&state.metrics);

    let webhook_routes = Router::new()
        .route("/", post(ingress::handle_webhook))
        .with_state(state);

    with_service_routes(webhook_routes, INGRESS_SERVICE, metrics, server)
}

/// Create the loader router
pub fn create_loader_router(state: LoaderState, server: &ServerConfig) -> Router {
    let metrics = Arc::clone(&state.metrics);

    let push_routes = Router::new()
        .route(LOADER_PATH, post(loader::handle_push))
        .with_state(state);

    with_service_routes(push_routes, LOADER_SERVICE, metrics, server)
}

/// Attach health and metrics endpoints plus the shared middleware stack
fn with_service_routes(
    routes: Router,
    service: &'static str,
    metrics: Arc<ServiceMetrics>,
    server: &ServerConfig,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .with_state(service);

    let observability_routes = Router::new()
        .route("/metrics", get(metrics_endpoint))
        .with_state(Arc::clone(&metrics));

    Router::new()
        .merge(routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(middleware::from_fn_with_state(metrics, metrics_middleware))
                .into_inner(),
        )
        .layer(DefaultBodyLimit::max(server.max_body_size))
}

// ============================================================================
// Health and Observability Handlers
// ============================================================================

/// Liveness endpoint
#[instrument(skip_all)]
async fn handle_health_check(State(service): State<&'static str>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: service.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Timestamp::now(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(
    State(metrics): State<Arc<ServiceMetrics>>,
) -> Result<String, StatusCode> {
    metrics.render().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Correlation ID of the current request
///
/// The logging middleware guarantees the header is present on every request
/// that reaches a handler.
pub fn correlation_id(headers: &HeaderMap) -> CorrelationId {
    CorrelationId::from_header(
        headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    )
}

/// Request logging middleware with correlation ID tracking
///
/// Adopts the caller's `x-correlation-id` or generates one, makes it visible
/// to handlers through the request headers, and echoes it on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = correlation_id(request.headers());
    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    let header_value = HeaderValue::from_str(correlation_id.as_str()).ok();
    if let Some(value) = &header_value {
        request
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, value.clone());
    }

    info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Some(value) = header_value {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

/// Metrics collection middleware
async fn metrics_middleware(
    State(metrics): State<Arc<ServiceMetrics>>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();
    let method = request.method().to_string();
    let path = metrics_path(request.uri().path());

    let response = next.run(request).await;

    metrics.record_http_request(&method, path, response.status().as_u16(), start.elapsed());
    response
}

/// Collapse request paths onto the fixed route set to bound label cardinality
fn metrics_path(path: &str) -> &'static str {
    match path {
        "/" => "/",
        LOADER_PATH => LOADER_PATH,
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Bind to the configured address and serve until SIGINT or SIGTERM
pub async fn start_server(router: Router, server: &ServerConfig) -> Result<(), ServiceError> {
    let address = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_timeout = Duration::from_secs(server.shutdown_timeout_seconds);
    serve_with_shutdown(listener, router, shutdown_signal(), shutdown_timeout).await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Serve on an already bound listener until `shutdown` resolves
///
/// After `shutdown` resolves the server stops accepting connections and
/// in-flight requests get up to `shutdown_timeout` to finish.
pub async fn serve_with_shutdown<F>(
    listener: tokio::net::TcpListener,
    router: Router,
    shutdown: F,
    shutdown_timeout: Duration,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (fired_tx, mut fired_rx) = tokio::sync::watch::channel(false);

    let signal = async move {
        shutdown.await;
        let _ = fired_tx.send(true);
    };

    let deadline = async move {
        if fired_rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .into_future() => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })
        }
        _ = deadline => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; abandoning in-flight requests"
            );
            Ok(())
        }
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
