//! Tests for routers, middleware and server lifecycle.

use super::*;
use axum::{body::Body, http::Request};
use hook_relay_core::adapters::InMemorySink;
use relay_runtime::InMemoryChannel;
use tower::ServiceExt;

fn ingress_router(server: &ServerConfig) -> Router {
    let metrics = ServiceMetrics::new(INGRESS_SERVICE).unwrap();
    let state = IngressState::new(
        Arc::new(SignatureVerifier::new("secret")),
        Arc::new(InMemoryChannel::default()),
        hook_relay_core::signature::SIGNATURE_HEADER,
        metrics,
    )
    .unwrap();
    create_ingress_router(state, server)
}

fn loader_router() -> Router {
    let metrics = ServiceMetrics::new(LOADER_SERVICE).unwrap();
    create_loader_router(
        LoaderState::new(Arc::new(InMemorySink::default()), metrics),
        &ServerConfig::default(),
    )
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_ingress_health_reports_service() {
        let response = ingress_router(&ServerConfig::default())
            .oneshot(get_request("/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], INGRESS_SERVICE);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_loader_health_reports_service() {
        let response = loader_router().oneshot(get_request("/health")).await.unwrap();

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["service"], LOADER_SERVICE);
    }
}

mod observability_tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_endpoint_renders_prometheus_text() {
        let response = loader_router().oneshot(get_request("/metrics")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("# TYPE envelopes_received_total counter"));
    }

    #[test]
    fn test_metrics_path_bounds_cardinality() {
        assert_eq!(metrics_path("/"), "/");
        assert_eq!(metrics_path(LOADER_PATH), LOADER_PATH);
        assert_eq!(metrics_path("/wp-admin/setup.php"), "other");
    }
}

mod middleware_tests {
    use super::*;

    #[tokio::test]
    async fn test_correlation_id_is_generated_when_absent() {
        let response = ingress_router(&ServerConfig::default())
            .oneshot(get_request("/health"))
            .await
            .unwrap();

        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(hook_relay_core::Uuid::parse_str(header).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_is_echoed() {
        let request = Request::builder()
            .uri("/health")
            .header(CORRELATION_ID_HEADER, "abc-123")
            .body(Body::empty())
            .unwrap();

        let response = ingress_router(&ServerConfig::default())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.headers().get(CORRELATION_ID_HEADER).unwrap(), "abc-123");
    }

    #[test]
    fn test_correlation_id_reads_header() {
        let mut headers = HeaderMap::new();
        headers.insert(CORRELATION_ID_HEADER, HeaderValue::from_static("req-9"));

        assert_eq!(correlation_id(&headers).as_str(), "req-9");
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let server = ServerConfig {
            max_body_size: 16,
            ..ServerConfig::default()
        };
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(format!("{{\"padding\":\"{}\"}}", "x".repeat(64))))
            .unwrap();

        let response = ingress_router(&server).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = ingress_router(&ServerConfig::default())
            .oneshot(get_request("/admin"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod shutdown_tests {
    use super::*;

    #[tokio::test]
    async fn test_server_stops_when_shutdown_resolves() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve_with_shutdown(
            listener,
            loader_router(),
            async move {
                let _ = rx.await;
            },
            Duration::from_secs(5),
        ));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..ServerConfig::default()
        };

        let result = start_server(loader_router(), &server).await;

        assert!(matches!(result, Err(ServiceError::BindFailed { .. })));
    }
}
