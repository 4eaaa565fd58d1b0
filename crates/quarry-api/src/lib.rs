//! Quarry API crate - axum HTTP server, route handlers, WebSocket streaming.
//!
//! Exposes session management, request/response exchanges, streaming
//! exchanges over WebSocket, generated artifact downloads, and a health check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
