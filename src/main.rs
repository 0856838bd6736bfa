use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use accesskey_gate::{AppState, Config, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!(
        "Starting access key gate v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        admin_prefix = %config.admin_path_prefix,
        gate_enabled = config.gate_enabled(),
        "Configuration loaded"
    );
    if !config.gate_enabled() {
        warn!("No ACCESS_KEY configured: the administrator area is not protected");
    }

    // Metrics failures are not fatal; the gate works without an exporter
    if let Some(metrics_addr) = config.metrics_addr()
        && let Err(e) = metrics::init_metrics(metrics_addr)
    {
        warn!("Metrics disabled: {e}");
    }

    let state = AppState::new(config.clone());
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("  GET  /                       - Public site");
    info!("  GET  /health                 - Health check");
    info!("  GET  {}   - Administrator area (gated)", config.admin_path_prefix);

    // The remote address feeds the last IP source of the gate
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("Server shutdown complete");
    Ok(())
}
