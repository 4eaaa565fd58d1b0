//! Conversation layer for Quarry.
//!
//! Sits between a tool-using agent and its clients: separates narration from
//! answer text in streamed output, enriches tool results with generated
//! artifacts, keeps per-session transcripts, and drives request/response and
//! streaming exchanges.

pub mod agent;
pub mod artifact;
pub mod classifier;
pub mod error;
pub mod mock;
pub mod orchestrator;
pub mod protocol;
pub mod session;

pub use agent::{Agent, AgentRun, AgentUnit, Message, MessagePart, ToolArgs, ToolArguments, UnitStream};
pub use artifact::{ArtifactEnricher, Enrichment, Visualization};
pub use classifier::{Delimiters, Segment, SegmentKind, StreamClassifier};
pub use error::ChatError;
pub use orchestrator::{Connection, ConversationOrchestrator};
pub use protocol::{ClientMessage, ExchangeResult, ProtocolEvent, ToolCallRecord};
pub use session::{SessionStore, SessionSummary};
