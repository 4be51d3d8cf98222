//! nmdcd entry point.

use nmdcd::config::Config;
use nmdcd::telemetry;
use std::path::Path;
use tracing::info;

/// Resolve the configuration path from CLI arguments.
/// Supports `-c <path>`, `--config <path>`, or a bare path.
/// Falls back to `config.toml` when no argument is provided.
fn resolve_config_path() -> String {
    let mut args = std::env::args().skip(1);

    let raw_path = match args.next() {
        Some(flag) if flag == "-c" || flag == "--config" => args.next().unwrap_or_else(|| {
            eprintln!("Missing path after {}", flag);
            std::process::exit(1);
        }),
        Some(path) => path,
        None => "config.toml".to_string(),
    };

    match std::fs::canonicalize(Path::new(&raw_path)) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => raw_path,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = resolve_config_path();
    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path).map_err(|e| {
            eprintln!("ERROR: Failed to load config from {}: {}", config_path, e);
            e
        })?
    } else {
        Config::default()
    };

    let (remote_layer, remote_rx) = telemetry::RemoteLogLayer::new();
    telemetry::init(&config, remote_layer);

    let server = nmdcd::server::start(config).await?;
    telemetry::spawn_remote_log_relay(server.hub.clone(), remote_rx);

    // Graceful shutdown on SIGINT/SIGTERM.
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT - initiating graceful shutdown"),
            _ = sigterm.recv() => info!("Received SIGTERM - initiating graceful shutdown"),
        }
    }

    server.shutdown().await;
    Ok(())
}
