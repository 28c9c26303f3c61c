//! Prometheus exporter for SmartThings.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use smartthings_common::{SmartThingsClient, init_tracing};
use smartthings_exporter::{DeviceCollector, ExporterConfig, HttpServer, MetricCatalog};

/// Prometheus exporter for SmartThings.
#[derive(Parser, Debug)]
#[command(name = "smartthings-exporter")]
#[command(about = "Export SmartThings device attributes as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error). Overrides config.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // Override from CLI
    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    init_tracing(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting SmartThings exporter");

    // Parse listen address
    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let client = SmartThingsClient::connect(&config.smartthings).await?;

    let catalog = Arc::new(MetricCatalog::smartthings());
    let collector = Arc::new(DeviceCollector::new(
        catalog,
        Arc::new(client),
        config.prometheus.namespace.clone(),
    ));

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start HTTP server
    let http_server = HttpServer::new(
        collector.clone(),
        listen_addr,
        config.prometheus.path.clone(),
    );
    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = &mut http_task => {
            anyhow::bail!("HTTP server exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    info!(
        invalid_metrics = collector.invalid_metrics(),
        "Exporter stopped"
    );
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
