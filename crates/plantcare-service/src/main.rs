//! PlantCare dashboard - refresh loop, HTTP API and web UI.
//!
//! Run with: `cargo run -p plantcare-service -- --controller http://192.168.1.50`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use plantcare_core::{ClassifierHandle, HttpPlant};
use plantcare_service::{AppState, Collector, Config, api, dashboard, ws};

/// PlantCare dashboard - greenhouse monitoring and control.
#[derive(Parser, Debug)]
#[command(name = "plantcare")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long, env = "PLANTCARE_BIND")]
    bind: Option<String>,

    /// Controller base URL (overrides config).
    #[arg(long, env = "PLANTCARE_CONTROLLER")]
    controller: Option<String>,

    /// Camera base URL (overrides config).
    #[arg(long, env = "PLANTCARE_CAMERA")]
    camera: Option<String>,

    /// Do not start the refresh loop (API only mode).
    #[arg(long)]
    no_refresh: bool,

    /// Skip loading the disease classifier.
    #[arg(long)]
    no_classifier: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("plantcare_service=info".parse()?)
                .add_directive("plantcare_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(controller) = args.controller {
        config.device.controller = controller;
    }
    if let Some(camera) = args.camera {
        config.device.camera = Some(camera);
    }
    if args.no_classifier {
        config.classifier.enabled = false;
    }

    config.validate()?;

    let device = HttpPlant::new(&config.device.controller, config.device.camera.as_deref())
        .context("failed to set up device clients")?
        .with_timeouts(config.device.timeouts());
    info!(
        "Controller at {}, camera {}",
        config.device.controller,
        config.device.camera.as_deref().unwrap_or("not configured")
    );

    let classifier = if config.classifier.enabled {
        let classifier = &config.classifier;
        ClassifierHandle::load_onnx(
            &classifier.model,
            &classifier.categories,
            classifier.input_size,
        )
    } else {
        ClassifierHandle::disabled("disabled in configuration")
    };
    if !classifier.is_ready() {
        warn!("Disease detection is disabled");
    }

    let addr: SocketAddr = config.server.bind.parse()?;

    // Create application state
    let state = AppState::new(config, Arc::new(device), classifier);

    // Start the refresh loop
    if !args.no_refresh {
        Collector::new(Arc::clone(&state)).start().await;
    } else {
        info!("Refresh loop disabled");
    }

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .merge(ws::router())
        .merge(dashboard::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(Arc::clone(&state));

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.refresh.signal_stop();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
