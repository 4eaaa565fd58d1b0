//! Contract with the external analysis agent.
//!
//! The agent owns reasoning and tool selection. This module only fixes the
//! shapes that cross the boundary: the transcript messages it consumes and
//! returns, and the typed units of its live event stream. Adapters for a
//! concrete model backend resolve their native part/event types into these
//! enums once, so the rest of the crate never inspects runtime type tags.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ChatError;

/// JSON object carried as tool-call arguments. Key order is preserved.
pub type ToolArguments = Map<String, Value>;

/// A single conversation message as recorded in a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// Sent to the model: user prompts and tool returns.
    Request { parts: Vec<MessagePart> },
    /// Produced by the model: text and tool calls.
    Response { parts: Vec<MessagePart> },
}

impl Message {
    pub fn parts(&self) -> &[MessagePart] {
        match self {
            Message::Request { parts } | Message::Response { parts } => parts,
        }
    }
}

/// One fragment of a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part", rename_all = "snake_case")]
pub enum MessagePart {
    UserPrompt { content: String },
    Text { content: String },
    ToolCall { tool_name: String, args: ToolArgs },
    ToolReturn { tool_name: String, content: String },
}

/// Tool-call arguments as the model produced them.
///
/// Providers hand back either a decoded object or the raw JSON text the
/// model streamed; both are accepted here and normalized by [`ToolArgs::decode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArgs {
    Object(ToolArguments),
    Encoded(String),
    Absent,
}

impl ToolArgs {
    /// Normalize to a JSON object. Undecodable or non-object encodings
    /// degrade to an empty map.
    pub fn decode(&self) -> ToolArguments {
        match self {
            ToolArgs::Object(map) => map.clone(),
            ToolArgs::Encoded(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    tracing::debug!(kind = json_kind(&other), "Tool arguments are not an object");
                    Map::new()
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Malformed tool arguments");
                    Map::new()
                }
            },
            ToolArgs::Absent => Map::new(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Outcome of a single-shot agent run.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// The complete transcript: prior history followed by this run's messages.
    pub messages: Vec<Message>,
    /// Final textual output, possibly containing narration regions.
    pub output: String,
}

/// One unit of the agent's live event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentUnit {
    /// The agent invoked a tool.
    ToolCall { name: String, args: ToolArgs },
    /// A tool returned text.
    ToolResult { name: String, content: String },
    /// Raw model text. May contain narration delimiters split anywhere.
    TextDelta(String),
    /// Model-native reasoning text, already separated by the provider.
    NarrationDelta(String),
    /// The run finished. Carries the complete transcript, prior history included.
    Completed { messages: Vec<Message> },
}

/// Ordered stream of units from one agent run.
pub type UnitStream = Pin<Box<dyn Stream<Item = Result<AgentUnit, ChatError>> + Send>>;

/// The external analysis agent.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run to completion and return the full transcript plus final output.
    async fn run(&self, question: &str, history: &[Message]) -> Result<AgentRun, ChatError>;

    /// Run while streaming units as they are produced.
    fn run_events(&self, question: &str, history: Vec<Message>) -> UnitStream;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_object_args() {
        let mut map = Map::new();
        map.insert("sql".into(), json!("SELECT 1"));
        let args = ToolArgs::Object(map.clone());
        assert_eq!(args.decode(), map);
    }

    #[test]
    fn test_decode_encoded_args_preserves_order() {
        let args = ToolArgs::Encoded(r#"{"sql": "SELECT 1", "description": "probe"}"#.into());
        let decoded = args.decode();
        let keys: Vec<&str> = decoded.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["sql", "description"]);
    }

    #[test]
    fn test_decode_malformed_args_is_empty() {
        let args = ToolArgs::Encoded(r#"{"sql": "SELECT"#.into());
        assert!(args.decode().is_empty());
    }

    #[test]
    fn test_decode_non_object_args_is_empty() {
        assert!(ToolArgs::Encoded("[1, 2]".into()).decode().is_empty());
        assert!(ToolArgs::Encoded("\"text\"".into()).decode().is_empty());
    }

    #[test]
    fn test_decode_absent_args_is_empty() {
        assert!(ToolArgs::Absent.decode().is_empty());
    }

    #[test]
    fn test_message_parts_accessor() {
        let msg = Message::Response {
            parts: vec![MessagePart::Text {
                content: "hi".into(),
            }],
        };
        assert_eq!(msg.parts().len(), 1);
    }

    #[test]
    fn test_message_serde_shape() {
        let msg = Message::Request {
            parts: vec![MessagePart::UserPrompt {
                content: "How many rows?".into(),
            }],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["kind"], "request");
        assert_eq!(value["parts"][0]["part"], "user_prompt");

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }
}
