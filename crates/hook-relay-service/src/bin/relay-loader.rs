//! # Relay Loader
//!
//! Receives push deliveries on `POST /hubspot-events` and streams the
//! normalized rows into the configured BigQuery table.

use anyhow::Context;
use clap::Parser;
use hook_relay_api::{start_server, LoaderSettings, LoggingConfig, LOADER_SERVICE};
use hook_relay_service::{build_loader_router, exit_code, init_tracing, load_settings, Cli};
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
        error!(error = %message, "{} terminated", LOADER_SERVICE);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut settings: LoaderSettings =
        load_settings(LOADER_SERVICE, cli.config.as_deref()).context("loading configuration")?;
    settings.log_json |= cli.log_json;

    if !init_tracing(&settings.logging()) {
        eprintln!("tracing subscriber already installed; ignoring logging settings");
    }
    info!("Starting {}", LOADER_SERVICE);

    settings.validate().context("validating configuration")?;

    let table = settings.table().context("resolving destination table")?;
    let router = build_loader_router(&settings).context("building loader")?;

    info!(
        host = %settings.host,
        port = settings.port,
        table = %table,
        "Starting HTTP server"
    );

    start_server(router, &settings.server()).await?;
    Ok(())
}
