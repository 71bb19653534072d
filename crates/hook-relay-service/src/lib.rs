//! # Hook-Relay Service
//!
//! Startup code shared by the `relay-ingress` and `relay-loader` binaries:
//! command-line parsing, configuration loading, logging initialization and
//! construction of the process-wide clients.
//!
//! Configuration sources, applied in order (later sources override earlier
//! ones):
//!
//! 1. `/etc/hook-relay/<service>.yaml` (optional)
//! 2. `./config/<service>.yaml` (optional)
//! 3. the file named by `--config` / `RELAY_CONFIG_FILE` (required if given)
//! 4. unprefixed environment variables (`HUBSPOT_SECRET_TOKEN`, `PORT`, ...)

use clap::Parser;
use hook_relay_api::{
    create_ingress_router, create_loader_router, ConfigError, IngressSettings, IngressState,
    LoaderSettings, LoaderState, LoggingConfig, ServiceError, ServiceMetrics, INGRESS_SERVICE,
    LOADER_SERVICE,
};
use hook_relay_core::adapters::BigQuerySink;
use hook_relay_core::SignatureVerifier;
use relay_runtime::{default_token_provider, ChannelConfig, RelayClientFactory};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code for configuration and startup failures
pub const EXIT_CONFIG: i32 = 3;

/// Command-line arguments shared by both binaries
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// YAML configuration file applied after the default locations
    #[arg(short, long, env = "RELAY_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "RELAY_LOG_JSON")]
    pub log_json: bool,
}

// ============================================================================
// Logging
// ============================================================================

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `logging.level`. Returns `false` when a
/// subscriber was already installed; the first one stays in effect.
pub fn init_tracing(logging: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directives(&logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.is_ok()
}

fn default_directives(level: &str) -> String {
    [
        "hook_relay_service",
        "hook_relay_api",
        "hook_relay_core",
        "relay_runtime",
        "tower_http",
    ]
    .iter()
    .map(|target| format!("{}={}", target, level))
    .collect::<Vec<_>>()
    .join(",")
}

// ============================================================================
// Configuration
// ============================================================================

/// Load settings for `service` from files and the environment
///
/// Missing files are skipped, except `explicit`, which must exist.
pub fn load_settings<T: DeserializeOwned>(
    service: &str,
    explicit: Option<&Path>,
) -> Result<T, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name(&format!("/etc/hook-relay/{}", service))
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name(&format!("config/{}", service))
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = explicit {
        info!(path = %path.display(), "Loading configuration from explicit path");
        builder = builder.add_source(
            config::File::from(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    builder
        .add_source(config::Environment::default())
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })
}

// ============================================================================
// Client Construction
// ============================================================================

/// Build the process-wide HTTP client
///
/// Without a timeout, outbound calls wait as long as the peer takes.
pub fn build_http_client(timeout_seconds: Option<u64>) -> Result<reqwest::Client, ConfigError> {
    let mut builder = reqwest::Client::builder();
    if let Some(seconds) = timeout_seconds {
        builder = builder.timeout(Duration::from_secs(seconds));
    }

    builder.build().map_err(|e| ConfigError::Invalid {
        message: format!("failed to build HTTP client: {}", e),
    })
}

/// Build the ingress router from validated settings
pub fn build_ingress_router(settings: &IngressSettings) -> Result<axum::Router, ConfigError> {
    let http = build_http_client(settings.http_timeout_seconds)?;
    let tokens = default_token_provider(http.clone());

    let publisher =
        RelayClientFactory::create_publisher(ChannelConfig::PubSub(settings.pubsub()), http, tokens)
            .map_err(|e| ConfigError::Invalid {
                message: format!("cannot create publisher: {}", e),
            })?;

    let metrics = ServiceMetrics::new(INGRESS_SERVICE).map_err(|e| ConfigError::Invalid {
        message: format!("failed to initialize metrics: {}", e),
    })?;

    let state = IngressState::new(
        Arc::new(SignatureVerifier::new(settings.hubspot_secret_token.clone())),
        publisher,
        &settings.signature_header,
        metrics,
    )?;

    Ok(create_ingress_router(state, &settings.server()))
}

/// Build the loader router from validated settings
pub fn build_loader_router(settings: &LoaderSettings) -> Result<axum::Router, ConfigError> {
    let http = build_http_client(settings.http_timeout_seconds)?;
    let table = settings.table()?;

    let sink = match settings.bigquery_endpoint() {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "Using custom BigQuery endpoint; credentials disabled");
            BigQuerySink::with_endpoint(http, table, None, endpoint)
        }
        None => {
            let tokens = default_token_provider(http.clone());
            BigQuerySink::new(http, table, Some(tokens))
        }
    };

    let metrics = ServiceMetrics::new(LOADER_SERVICE).map_err(|e| ConfigError::Invalid {
        message: format!("failed to initialize metrics: {}", e),
    })?;

    Ok(create_loader_router(
        LoaderState::new(Arc::new(sink), metrics),
        &settings.server(),
    ))
}

/// Process exit code for a fatal error
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(service_error) = error.downcast_ref::<ServiceError>() {
        return match service_error {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => EXIT_CONFIG,
        };
    }
    if error.downcast_ref::<ConfigError>().is_some() {
        return EXIT_CONFIG;
    }
    1
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
