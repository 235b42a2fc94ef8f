//! PMMS sync engine (pmms-sync) - Main entry point
//!
//! Loads the bootstrap configuration, performs the host startup handshake,
//! starts the engine task and serves the host bridge until shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pmms_common::config::{load_toml_or_default, resolve_config_path};
use pmms_sync::api::{self, startup_handshake, AppContext, HostForwarder};
use pmms_sync::backend::SimulatedBackendFactory;
use pmms_sync::config::{Environment, MediaConfig, TomlConfig};
use pmms_sync::events::EventBus;
use pmms_sync::SyncEngine;

/// Outbound notification buffer per subscriber
const EVENT_BUS_CAPACITY: usize = 1000;

/// Command-line arguments for pmms-sync
#[derive(Parser, Debug)]
#[command(name = "pmms-sync")]
#[command(about = "Spatialized media playback sync engine")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "PMMS_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PMMS_PORT")]
    port: Option<u16>,

    /// Media server endpoint (host:port) for non-absolute identifiers
    #[arg(long, env = "PMMS_SERVER_ENDPOINT")]
    server_endpoint: Option<String>,

    /// Host callback base URL for outbound notifications
    #[arg(long, env = "PMMS_CALLBACK_URL")]
    callback_url: Option<String>,

    /// Audio filter environment
    #[arg(long, value_enum, env = "PMMS_ENVIRONMENT")]
    environment: Option<Environment>,

    /// Skip the startup handshake even when a callback URL is set
    #[arg(long)]
    no_handshake: bool,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "PMMS_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), "PMMS_CONFIG");
    let toml_config: TomlConfig = load_toml_or_default(config_path.as_deref())
        .context("Failed to load configuration file")?;

    // Initialize tracing
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pmms_sync={level},pmms_common={level},tower_http=info").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &config_path {
        Some(path) if path.exists() => info!("Configuration loaded from {}", path.display()),
        Some(path) => info!("No configuration at {}, using defaults", path.display()),
        None => info!("No configuration file, using defaults"),
    }

    let port = args.port.unwrap_or(toml_config.port);

    // Media configuration: TOML, then command line, then handshake
    let mut media = MediaConfig::from_section(&toml_config.media);
    if let Some(endpoint) = args.server_endpoint.clone() {
        media.server_endpoint = endpoint;
    }
    if let Some(environment) = args.environment {
        media.environment = environment;
    }

    let callback_url = args
        .callback_url
        .clone()
        .or_else(|| toml_config.host.callback_url.clone());
    let forwarder = callback_url
        .as_deref()
        .map(|url| HostForwarder::new(url, toml_config.host.callback_timeout()))
        .transpose()
        .context("Failed to create host callback client")?;

    if let Some(fwd) = &forwarder {
        if toml_config.host.startup_handshake && !args.no_handshake {
            match startup_handshake(fwd).await {
                Ok(handshake) => media.apply_handshake(handshake),
                Err(e) => warn!("Startup handshake failed, keeping configured media settings: {}", e),
            }
        }
    }

    info!(
        "Media server {}://{}/{} ({:?})",
        media.scheme, media.server_endpoint, media.namespace, media.environment
    );

    // Engine
    let bus = EventBus::new(EVENT_BUS_CAPACITY);
    let factory = SimulatedBackendFactory::new(
        Duration::from_millis(toml_config.simulation.ready_delay_ms),
        toml_config.simulation.default_duration_secs,
    );
    let (engine, queue_rx) = SyncEngine::new(Arc::new(media), Box::new(factory), bus.clone());
    let engine_handle = engine.handle();
    let engine_task = tokio::spawn(engine.run(queue_rx));

    let forwarder_task = forwarder.map(|fwd| fwd.spawn(&bus));

    // Host bridge
    let app = api::create_router(AppContext::new(engine_handle.clone(), bus, port));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting host bridge on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if engine_handle.shutdown().is_ok() {
        engine_task.await.context("Engine task panicked")?;
    }
    if let Some(task) = forwarder_task {
        task.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
