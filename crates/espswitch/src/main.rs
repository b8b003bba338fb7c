use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use espswitch::api;
use espswitch::device::HttpDeviceClient;
use espswitch::hap::MemoryRegistry;
use espswitch::Config;
use espswitch::EspSwitch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Bridge an ESP-01S relay into a home-automation switch accessory.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "espswitch.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.filter())
        .init();

    tracing::info!("espswitchd starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    let client = HttpDeviceClient::new(
        config.accessory.host.clone(),
        config.accessory.effective_request_timeout(),
    )
    .context("Failed to create device client")?;

    let registry = Arc::new(MemoryRegistry::new());
    let accessory = Arc::new(
        EspSwitch::new(&config.accessory, registry.as_ref(), Arc::new(client))
            .context("Failed to create accessory")?,
    );

    // Start the local API, if configured
    let mut api_task = None;
    if let Some(api_config) = config.api.clone() {
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let state = api::AppState::new(accessory.clone(), registry.clone());
        let handle = tokio::spawn(async move {
            if let Err(e) = api::serve(api_config.listen, api_config.port, state, shutdown_rx).await
            {
                tracing::error!("HTTP API server failed: {}", e);
            }
        });
        api_task = Some((shutdown_tx, handle));
    }

    tracing::info!("Press Ctrl+C to exit");

    // Wait for Ctrl+C
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received shutdown signal");
        }
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    accessory.shutdown().await;

    if let Some((shutdown_tx, handle)) = api_task {
        let _ = shutdown_tx.send(());
        if let Err(e) = handle.await {
            tracing::error!("HTTP API task failed: {}", e);
        }
    }

    tracing::info!("espswitchd shutdown complete");

    Ok(())
}
