//! WebSocket transport for streaming exchanges.
//!
//! Adapts an axum [`WebSocket`] to the orchestrator's [`Connection`] trait:
//! inbound text frames are decoded as client messages, outbound events are
//! sent as JSON text frames.

use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;

use quarry_chat::{ChatError, ClientMessage, Connection, ProtocolEvent};

use crate::error::{parse_session_id, ApiError};
use crate::state::AppState;

/// A client connected over WebSocket.
pub struct SocketConnection {
    socket: WebSocket,
}

impl SocketConnection {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Connection for SocketConnection {
    async fn receive(&mut self) -> Option<ClientMessage> {
        loop {
            match self.socket.recv().await? {
                Ok(WsMessage::Text(text)) => match serde_json::from_str(text.as_str()) {
                    Ok(message) => return Some(message),
                    Err(e) => {
                        tracing::debug!(error = %e, "Ignoring malformed client frame");
                    }
                },
                Ok(WsMessage::Close(_)) => return None,
                // Ping/pong are answered by the socket itself; binary frames are not part of the protocol.
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "WebSocket receive failed");
                    return None;
                }
            }
        }
    }

    async fn send(&mut self, event: ProtocolEvent) -> Result<(), ChatError> {
        let text = serde_json::to_string(&event)
            .map_err(|e| ChatError::Transport(format!("event encoding failed: {}", e)))?;
        self.socket
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))
    }
}

/// GET /api/sessions/{id}/chat - upgrade to a streaming conversation.
///
/// A well-formed id is accepted even if the session does not exist; each
/// question on such a connection is answered with an error event.
pub async fn chat_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let session_id = parse_session_id(&raw_id)?;

    Ok(ws.on_upgrade(move |socket| async move {
        tracing::info!(session_id = %session_id, "Client connected");
        let mut conn = SocketConnection::new(socket);
        state.orchestrator.stream_ask(&mut conn, session_id).await;
    }))
}
