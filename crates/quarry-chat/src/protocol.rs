//! Wire types exchanged with clients.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::ToolArguments;
use crate::artifact::{Enrichment, Visualization};
use crate::classifier::{Segment, SegmentKind};

/// Inbound client message on the streaming connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(default)]
    pub question: Option<String>,
}

impl ClientMessage {
    /// The question, if present and not blank.
    pub fn question(&self) -> Option<&str> {
        self.question
            .as_deref()
            .filter(|q| !q.trim().is_empty())
    }
}

/// Outbound event on the streaming connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    #[serde(rename = "thinking")]
    ThinkingDelta { content: String },
    #[serde(rename = "text")]
    AnswerDelta { content: String },
    ToolCall {
        name: String,
        args: ToolArguments,
    },
    ToolResult {
        name: String,
        result: String,
        file_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plotly_json: Option<Visualization>,
    },
    Done,
    Error { content: String },
}

impl ProtocolEvent {
    pub fn tool_result(name: impl Into<String>, enrichment: Enrichment) -> Self {
        ProtocolEvent::ToolResult {
            name: name.into(),
            result: enrichment.content,
            file_url: enrichment.file_url,
            plotly_json: enrichment.visualization,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProtocolEvent::Error {
            content: message.into(),
        }
    }

    /// Wire name of the event type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolEvent::ThinkingDelta { .. } => "thinking",
            ProtocolEvent::AnswerDelta { .. } => "text",
            ProtocolEvent::ToolCall { .. } => "tool_call",
            ProtocolEvent::ToolResult { .. } => "tool_result",
            ProtocolEvent::Done => "done",
            ProtocolEvent::Error { .. } => "error",
        }
    }
}

impl From<Segment> for ProtocolEvent {
    fn from(segment: Segment) -> Self {
        match segment.kind {
            SegmentKind::Narration => ProtocolEvent::ThinkingDelta {
                content: segment.content,
            },
            SegmentKind::Answer => ProtocolEvent::AnswerDelta {
                content: segment.content,
            },
        }
    }
}

/// A tool invocation reported by request/response mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub args: ToolArguments,
}

/// Result of a single request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeResult {
    pub session_id: Uuid,
    pub thinking: Vec<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn test_client_message_question() {
        let msg: ClientMessage = serde_json::from_str(r#"{"question": "How many rows?"}"#).unwrap();
        assert_eq!(msg.question(), Some("How many rows?"));
    }

    #[test]
    fn test_client_message_blank_or_missing_question() {
        let msg: ClientMessage = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(msg.question(), None);
        let msg: ClientMessage = serde_json::from_str(r#"{"question": "  "}"#).unwrap();
        assert_eq!(msg.question(), None);
        let msg: ClientMessage = serde_json::from_str(r#"{"question": null}"#).unwrap();
        assert_eq!(msg.question(), None);
    }

    #[test]
    fn test_thinking_and_text_wire_shape() {
        let ev = ProtocolEvent::ThinkingDelta {
            content: "analysis".into(),
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({"type": "thinking", "content": "analysis"})
        );
        let ev = ProtocolEvent::AnswerDelta {
            content: "Hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({"type": "text", "content": "Hello"})
        );
    }

    #[test]
    fn test_done_and_error_wire_shape() {
        assert_eq!(
            serde_json::to_value(ProtocolEvent::Done).unwrap(),
            json!({"type": "done"})
        );
        assert_eq!(
            serde_json::to_value(ProtocolEvent::error("boom")).unwrap(),
            json!({"type": "error", "content": "boom"})
        );
    }

    #[test]
    fn test_tool_call_wire_shape() {
        let mut args = Map::new();
        args.insert("sql".into(), json!("SELECT 1"));
        let ev = ProtocolEvent::ToolCall {
            name: "query_data".into(),
            args,
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({"type": "tool_call", "name": "query_data", "args": {"sql": "SELECT 1"}})
        );
    }

    #[test]
    fn test_tool_result_without_artifact_has_null_url_and_no_plot() {
        let ev = ProtocolEvent::tool_result(
            "query_data",
            Enrichment {
                content: "ok".into(),
                file_url: None,
                visualization: None,
            },
        );
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(
            value,
            json!({"type": "tool_result", "name": "query_data", "result": "ok", "file_url": null})
        );
        assert!(value.get("plotly_json").is_none());
    }

    #[test]
    fn test_tool_result_with_chart() {
        let ev = ProtocolEvent::tool_result(
            "visualize",
            Enrichment {
                content: "Saved to: output/a.html".into(),
                file_url: Some("/api/files/a.html".into()),
                visualization: Some(Visualization {
                    series: vec![json!({"x": [1]})],
                    layout: Map::new(),
                }),
            },
        );
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["file_url"], "/api/files/a.html");
        assert_eq!(value["plotly_json"], json!({"data": [{"x": [1]}], "layout": {}}));
    }

    #[test]
    fn test_segment_conversion() {
        let ev: ProtocolEvent = Segment {
            kind: SegmentKind::Narration,
            content: "x".into(),
        }
        .into();
        assert_eq!(ev.kind(), "thinking");
        let ev: ProtocolEvent = Segment {
            kind: SegmentKind::Answer,
            content: "y".into(),
        }
        .into();
        assert_eq!(ev.kind(), "text");
    }

    #[test]
    fn test_exchange_result_shape() {
        let result = ExchangeResult {
            session_id: Uuid::nil(),
            thinking: vec!["analysis".into()],
            tool_calls: vec![ToolCallRecord {
                tool_name: "query_data".into(),
                args: Map::new(),
            }],
            answer: "Hello".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["session_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["tool_calls"][0]["tool_name"], "query_data");
        assert_eq!(value["answer"], "Hello");
    }
}
