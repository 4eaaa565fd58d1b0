//! Error types for the conversation layer.

/// Errors from the conversation layer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Session not found, session_id provided: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("agent error: {0}")]
    Agent(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl ChatError {
    /// Whether this failure means the client connection is gone.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ChatError::Transport(_))
    }
}
