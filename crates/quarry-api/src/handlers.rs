//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path parameters and bodies via axum extractors,
//! calls into the session store or orchestrator, and returns JSON responses.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quarry_chat::{ExchangeResult, SessionSummary};

use crate::error::{parse_session_id, ApiError};
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: usize,
    pub uptime_secs: u64,
}

// =============================================================================
// Sessions
// =============================================================================

/// POST /api/sessions - create an empty session.
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let session_id = state.sessions.create()?;
    Ok(Json(CreateSessionResponse { session_id }))
}

/// GET /api/sessions - active sessions, oldest first.
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.sessions.list())
}

/// DELETE /api/sessions/{id} - remove a session and its transcript.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = parse_session_id(&raw_id)?;
    state.sessions.delete(session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/{id}/ask - one request/response exchange.
pub async fn ask(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(body): Json<AskRequest>,
) -> Result<Json<ExchangeResult>, ApiError> {
    let session_id = parse_session_id(&raw_id)?;
    if body.question.trim().is_empty() {
        return Err(ApiError::BadRequest("'question' must not be empty".to_string()));
    }

    let result = state.orchestrator.ask(session_id, &body.question).await?;
    Ok(Json(result))
}

// =============================================================================
// Artifacts
// =============================================================================

/// GET {public_prefix}/{name} - serve a generated artifact.
///
/// Only plain file names inside the artifact directory are served.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound(format!("File not found: {}", name));

    if !is_plain_file_name(&name) {
        return Err(not_found());
    }

    let path = state.artifact_dir.join(&name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            return Err(ApiError::Internal(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    tracing::debug!(file = %name, bytes = bytes.len(), "Serving artifact");
    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes))
}

/// A single path component that cannot name a hidden file or leave the directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

fn content_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.len(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("sales_by_region.html"));
        assert!(is_plain_file_name("top customers.csv"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("../secret.html"));
        assert!(!is_plain_file_name("nested/file.csv"));
        assert!(!is_plain_file_name("..\\secret"));
        assert!(!is_plain_file_name(".env"));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("a.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("a.CSV"), "text/csv; charset=utf-8");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
