//! # Relay Ingress
//!
//! Receives signed webhook deliveries on `POST /` and publishes them to the
//! configured Pub/Sub topic.

use anyhow::Context;
use clap::Parser;
use hook_relay_api::{start_server, IngressSettings, LoggingConfig, INGRESS_SERVICE};
use hook_relay_service::{build_ingress_router, exit_code, init_tracing, load_settings, Cli};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        // No-op when run() got far enough to install its own subscriber
        init_tracing(&LoggingConfig {
            json_format: cli.log_json,
            ..LoggingConfig::default()
        });
        let message = format!("{:#}", e);
        error!(error = %message, "{} terminated", INGRESS_SERVICE);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut settings: IngressSettings =
        load_settings(INGRESS_SERVICE, cli.config.as_deref()).context("loading configuration")?;
    settings.log_json |= cli.log_json;

    if !init_tracing(&settings.logging()) {
        eprintln!("tracing subscriber already installed; ignoring logging settings");
    }
    info!("Starting {}", INGRESS_SERVICE);

    settings.validate().context("validating configuration")?;

    let router = build_ingress_router(&settings).context("building ingress")?;

    info!(
        host = %settings.host,
        port = settings.port,
        project = %settings.pubsub_project_id,
        topic = %settings.pubsub_topic_id,
        "Starting HTTP server"
    );

    start_server(router, &settings.server()).await?;
    Ok(())
}
