//! Quarry server binary - composition root.
//!
//! Ties the Quarry crates together into a single executable:
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the agent, session store, and orchestrator
//! 4. Start the axum HTTP / WebSocket server

mod agent;
mod cli;

use std::sync::Arc;

use clap::Parser;

use quarry_api::routes;
use quarry_api::state::AppState;
use quarry_chat::Agent;
use quarry_core::config::QuarryConfig;

use crate::agent::OfflineAgent;
use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Flags and env vars override file values.
    let config_file = args.resolve_config_path();
    let mut config = QuarryConfig::load_or_default(&config_file);
    config.server.port = args.resolve_port(config.server.port);
    config.server.host = args.resolve_host(&config.server.host);
    config.general.log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.general.log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Quarry v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Artifacts.
    let artifact_root = args.resolve_artifact_root();
    let artifact_dir = artifact_root.join(&config.artifacts.dir);
    if let Err(e) = std::fs::create_dir_all(&artifact_dir) {
        tracing::error!(path = %artifact_dir.display(), error = %e, "Failed to create artifact directory");
        return Err(e.into());
    }
    tracing::info!(path = %artifact_dir.display(), "Serving artifacts");

    // Agent.
    let agent: Arc<dyn Agent> = Arc::new(OfflineAgent::new());
    tracing::warn!("No model backend configured; answering with the offline echo agent");

    let state = AppState::new(config.clone(), agent, artifact_root);

    // === API server ===

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = routes::create_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind - is another instance running?");
            tracing::error!("Try: QUARRY_PORT={} quarry", config.server.port.saturating_add(1));
            return Err(e.into());
        }
    };

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router).await?;

    Ok(())
}
