//! Application state shared across all route handlers.
//!
//! AppState holds the conversation services and is passed to handlers via
//! axum's State extractor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use quarry_chat::{Agent, ArtifactEnricher, ConversationOrchestrator, Delimiters, SessionStore};
use quarry_core::config::QuarryConfig;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, fixed for the lifetime of the server.
    pub config: Arc<QuarryConfig>,
    /// Drives request/response and streaming exchanges.
    pub orchestrator: Arc<ConversationOrchestrator>,
    /// Session registry, shared with the orchestrator.
    pub sessions: Arc<SessionStore>,
    /// Directory generated artifacts are served from.
    pub artifact_dir: PathBuf,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Wire an agent into a fresh session store and orchestrator.
    ///
    /// Artifact paths reported by tools are resolved relative to `artifact_root`.
    pub fn new(config: QuarryConfig, agent: Arc<dyn Agent>, artifact_root: impl Into<PathBuf>) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let enricher = ArtifactEnricher::new(&config.artifacts, artifact_root);
        let artifact_dir = enricher.artifact_dir();
        let delimiters = Delimiters::from(&config.chat);
        let orchestrator =
            ConversationOrchestrator::new(agent, Arc::clone(&sessions), enricher, delimiters);

        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            sessions,
            artifact_dir,
            start_time: Instant::now(),
        }
    }
}
