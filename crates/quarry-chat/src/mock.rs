//! Scripted agent for testing.
//!
//! Replays a fixed sequence of steps through both agent entry points, so the
//! single-shot and streaming paths see the same run and produce the same
//! transcript. Every call is recorded for assertions.

use std::sync::Mutex;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use tokio::time::sleep;

use crate::agent::{Agent, AgentRun, AgentUnit, Message, MessagePart, ToolArgs, UnitStream};
use crate::error::ChatError;

/// One step of a scripted run.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Raw model text, streamed as a text delta.
    Text(String),
    /// Provider-separated reasoning, streamed as a narration delta.
    Narration(String),
    /// A tool invocation.
    ToolCall { name: String, args: ToolArgs },
    /// A tool's returned text.
    ToolResult { name: String, content: String },
    /// Fail the run with an agent error.
    Fail(String),
    /// End the event stream without a completion unit.
    Truncate,
    /// Pause before the next step.
    Delay { ms: u64 },
}

/// A recorded call to the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub question: String,
    pub history_len: usize,
    pub streaming: bool,
}

/// Agent that replays a script.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    steps: Vec<ScriptStep>,
    chunk_delay_ms: Option<u64>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedAgent {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, question: &str, history_len: usize, streaming: bool) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                question: question.to_string(),
                history_len,
                streaming,
            });
        }
    }
}

/// Build the transcript a real agent would return for this script: the prior
/// history, the user prompt, then alternating model responses and tool
/// returns. The output is the text produced after the last tool return.
fn replay(
    steps: &[ScriptStep],
    question: &str,
    history: &[Message],
) -> Result<(Vec<Message>, String), ChatError> {
    let mut messages = history.to_vec();
    messages.push(Message::Request {
        parts: vec![MessagePart::UserPrompt {
            content: question.to_string(),
        }],
    });

    let mut parts: Vec<MessagePart> = Vec::new();
    let mut text = String::new();

    for step in steps {
        match step {
            ScriptStep::Text(delta) => text.push_str(delta),
            ScriptStep::ToolCall { name, args } => {
                if !text.is_empty() {
                    parts.push(MessagePart::Text {
                        content: std::mem::take(&mut text),
                    });
                }
                parts.push(MessagePart::ToolCall {
                    tool_name: name.clone(),
                    args: args.clone(),
                });
            }
            ScriptStep::ToolResult { name, content } => {
                if !text.is_empty() {
                    parts.push(MessagePart::Text {
                        content: std::mem::take(&mut text),
                    });
                }
                messages.push(Message::Response {
                    parts: std::mem::take(&mut parts),
                });
                messages.push(Message::Request {
                    parts: vec![MessagePart::ToolReturn {
                        tool_name: name.clone(),
                        content: content.clone(),
                    }],
                });
            }
            ScriptStep::Fail(message) => return Err(ChatError::Agent(message.clone())),
            ScriptStep::Narration(_) | ScriptStep::Truncate | ScriptStep::Delay { .. } => {}
        }
    }

    let output = text.clone();
    if !text.is_empty() {
        parts.push(MessagePart::Text { content: text });
    }
    messages.push(Message::Response { parts });
    Ok((messages, output))
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn run(&self, question: &str, history: &[Message]) -> Result<AgentRun, ChatError> {
        self.record(question, history.len(), false);
        let (messages, output) = replay(&self.steps, question, history)?;
        Ok(AgentRun { messages, output })
    }

    fn run_events(&self, question: &str, history: Vec<Message>) -> UnitStream {
        self.record(question, history.len(), true);
        let steps = self.steps.clone();
        let chunk_delay_ms = self.chunk_delay_ms;
        let question = question.to_string();

        Box::pin(stream! {
            for step in &steps {
                if let Some(delay_ms) = chunk_delay_ms {
                    sleep(Duration::from_millis(delay_ms)).await;
                }

                match step {
                    ScriptStep::Text(delta) => {
                        yield Ok(AgentUnit::TextDelta(delta.clone()));
                    }
                    ScriptStep::Narration(delta) => {
                        yield Ok(AgentUnit::NarrationDelta(delta.clone()));
                    }
                    ScriptStep::ToolCall { name, args } => {
                        yield Ok(AgentUnit::ToolCall {
                            name: name.clone(),
                            args: args.clone(),
                        });
                    }
                    ScriptStep::ToolResult { name, content } => {
                        yield Ok(AgentUnit::ToolResult {
                            name: name.clone(),
                            content: content.clone(),
                        });
                    }
                    ScriptStep::Fail(message) => {
                        yield Err(ChatError::Agent(message.clone()));
                        return;
                    }
                    ScriptStep::Truncate => return,
                    ScriptStep::Delay { ms } => sleep(Duration::from_millis(*ms)).await,
                }
            }

            match replay(&steps, &question, &history) {
                Ok((messages, _)) => {
                    yield Ok(AgentUnit::Completed { messages });
                }
                Err(e) => {
                    yield Err(e);
                }
            }
        })
    }
}

/// Built-in scripts for common scenarios.
pub mod fixtures {
    use super::*;
    use serde_json::{Map, Value};

    pub fn text(s: &str) -> ScriptStep {
        ScriptStep::Text(s.to_string())
    }

    pub fn tool_call(name: &str, args: Value) -> ScriptStep {
        let args = match args {
            Value::Object(map) => ToolArgs::Object(map),
            Value::Null => ToolArgs::Absent,
            other => ToolArgs::Encoded(other.to_string()),
        };
        ScriptStep::ToolCall {
            name: name.to_string(),
            args,
        }
    }

    pub fn tool_result(name: &str, content: &str) -> ScriptStep {
        ScriptStep::ToolResult {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    /// A narration block followed by a plain answer, as two deltas.
    pub fn narrated_answer(narration: &str, answer: &str) -> ScriptedAgent {
        ScriptedAgent::new(vec![
            text(&format!("<thinking>{}</thinking>", narration)),
            text(answer),
        ])
    }

    /// Query, chart, answer: the canonical analysis run.
    pub fn chart_analysis(chart_file: &str) -> ScriptedAgent {
        let mut query_args = Map::new();
        query_args.insert("sql".into(), Value::from("SELECT region, SUM(total) FROM sales GROUP BY region"));
        query_args.insert("description".into(), Value::from("Totals per region"));

        ScriptedAgent::new(vec![
            text("<thinking>Need totals per region.</thinking>"),
            ScriptStep::ToolCall {
                name: "query_data".into(),
                args: ToolArgs::Object(query_args),
            },
            tool_result("query_data", "Query executed successfully.\nResult: 3 rows x 2 columns"),
            text("<thinking>Plot them as bars.</thinking>"),
            ScriptStep::ToolCall {
                name: "visualize".into(),
                args: ToolArgs::Encoded(r#"{"title": "Sales", "result_type": "figure"}"#.into()),
            },
            tool_result(
                "visualize",
                &format!("Figure created: Sales\nSaved to: output/{}\nTraces: 1", chart_file),
            ),
            text("The north region leads sales."),
        ])
    }
}
