//! Conversation orchestrator: drives question/answer exchanges for a session.
//!
//! Two modes share the same collaborators. [`ConversationOrchestrator::ask`]
//! runs the agent once and returns a condensed [`ExchangeResult`].
//! [`ConversationOrchestrator::stream_ask`] serves a duplex connection,
//! translating each agent unit into protocol events as it arrives.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use uuid::Uuid;

use crate::agent::{Agent, AgentUnit, Message, MessagePart};
use crate::artifact::ArtifactEnricher;
use crate::classifier::{Delimiters, StreamClassifier};
use crate::error::ChatError;
use crate::protocol::{ClientMessage, ExchangeResult, ProtocolEvent, ToolCallRecord};
use crate::session::SessionStore;

/// A duplex client connection carrying JSON messages.
#[async_trait]
pub trait Connection: Send {
    /// Next client message, or `None` once the client has disconnected.
    async fn receive(&mut self) -> Option<ClientMessage>;

    /// Deliver one event. Fails with [`ChatError::Transport`] if the client is gone.
    async fn send(&mut self, event: ProtocolEvent) -> Result<(), ChatError>;
}

/// Central coordinator wiring the agent, session store, classifier, and enricher.
pub struct ConversationOrchestrator {
    agent: Arc<dyn Agent>,
    sessions: Arc<SessionStore>,
    enricher: ArtifactEnricher,
    delimiters: Delimiters,
}

impl ConversationOrchestrator {
    pub fn new(
        agent: Arc<dyn Agent>,
        sessions: Arc<SessionStore>,
        enricher: ArtifactEnricher,
        delimiters: Delimiters,
    ) -> Self {
        Self {
            agent,
            sessions,
            enricher,
            delimiters,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Ask one question and wait for the complete answer.
    pub async fn ask(&self, session_id: Uuid, question: &str) -> Result<ExchangeResult, ChatError> {
        let history = self.sessions.get_history(session_id)?;
        tracing::info!(session_id = %session_id, history = history.len(), "Exchange started");

        let run = self.agent.run(question, &history).await?;

        let new_messages = run.messages.get(history.len()..).unwrap_or(&[]);
        let (mut thinking, tool_calls) = self.collect_trace(new_messages);

        // The final output is normally the last response's text, already traced above.
        let (final_narration, answer) = self.delimiters.split_narration(&run.output);
        if !final_narration.is_empty() && !output_recorded(new_messages, &run.output) {
            thinking.push(final_narration);
        }

        self.sessions.save_history(session_id, run.messages)?;

        Ok(ExchangeResult {
            session_id,
            thinking,
            tool_calls,
            answer,
        })
    }

    /// Serve questions from `conn` until the client disconnects.
    ///
    /// A failure while answering one question is reported to the client as a
    /// single error event and the loop carries on with the next question.
    pub async fn stream_ask<C>(&self, conn: &mut C, session_id: Uuid)
    where
        C: Connection + ?Sized,
    {
        while let Some(message) = conn.receive().await {
            let Some(question) = message.question() else {
                continue;
            };

            match self.stream_exchange(conn, session_id, question).await {
                Ok(()) => {}
                Err(e) if e.is_disconnect() => break,
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "Exchange failed");
                    if conn.send(ProtocolEvent::error(e.to_string())).await.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!(session_id = %session_id, "Client disconnected");
    }

    /// Run one streamed exchange, forwarding events in agent order.
    async fn stream_exchange<C>(
        &self,
        conn: &mut C,
        session_id: Uuid,
        question: &str,
    ) -> Result<(), ChatError>
    where
        C: Connection + ?Sized,
    {
        let history = self.sessions.get_history(session_id)?;
        tracing::info!(session_id = %session_id, history = history.len(), "Streamed exchange started");

        let mut classifier = StreamClassifier::new(self.delimiters.clone());
        let mut units = self.agent.run_events(question, history);

        while let Some(unit) = units.next().await {
            let unit = match unit {
                Ok(unit) => unit,
                Err(e) => {
                    if let Some(segment) = classifier.flush() {
                        conn.send(segment.into()).await?;
                    }
                    return Err(e);
                }
            };

            match unit {
                AgentUnit::ToolCall { name, args } => {
                    tracing::debug!(tool = %name, "Tool call");
                    conn.send(ProtocolEvent::ToolCall {
                        name,
                        args: args.decode(),
                    })
                    .await?;
                }
                AgentUnit::ToolResult { name, content } => {
                    let enrichment = self.enricher.enrich(&name, &content);
                    tracing::debug!(
                        tool = %name,
                        file_url = ?enrichment.file_url,
                        chart = enrichment.visualization.is_some(),
                        "Tool result"
                    );
                    conn.send(ProtocolEvent::tool_result(name, enrichment)).await?;
                }
                AgentUnit::TextDelta(delta) => {
                    for segment in classifier.feed(&delta) {
                        conn.send(segment.into()).await?;
                    }
                }
                AgentUnit::NarrationDelta(delta) => {
                    if !delta.is_empty() {
                        conn.send(ProtocolEvent::ThinkingDelta { content: delta }).await?;
                    }
                }
                AgentUnit::Completed { messages } => {
                    if let Some(segment) = classifier.flush() {
                        conn.send(segment.into()).await?;
                    }
                    self.sessions.save_history(session_id, messages)?;
                    conn.send(ProtocolEvent::Done).await?;
                    tracing::info!(session_id = %session_id, "Streamed exchange completed");
                    return Ok(());
                }
            }
        }

        if let Some(segment) = classifier.flush() {
            conn.send(segment.into()).await?;
        }
        Err(ChatError::Agent(
            "agent stream ended before the run completed".to_string(),
        ))
    }

    /// Narration blocks and tool calls from a run's new messages, in order.
    fn collect_trace(&self, messages: &[Message]) -> (Vec<String>, Vec<ToolCallRecord>) {
        let mut thinking = Vec::new();
        let mut tool_calls = Vec::new();

        for message in messages {
            let Message::Response { parts } = message else {
                continue;
            };
            for part in parts {
                match part {
                    MessagePart::Text { content } if !content.trim().is_empty() => {
                        let (narration, _) = self.delimiters.split_narration(content);
                        if !narration.is_empty() {
                            thinking.push(narration);
                        }
                    }
                    MessagePart::ToolCall { tool_name, args } => {
                        tool_calls.push(ToolCallRecord {
                            tool_name: tool_name.clone(),
                            args: args.decode(),
                        });
                    }
                    _ => {}
                }
            }
        }

        (thinking, tool_calls)
    }
}

/// Whether the last response among `messages` carries `output` as a text part.
fn output_recorded(messages: &[Message], output: &str) -> bool {
    messages
        .iter()
        .rev()
        .find_map(|message| match message {
            Message::Response { parts } => Some(parts),
            Message::Request { .. } => None,
        })
        .is_some_and(|parts| {
            parts
                .iter()
                .any(|part| matches!(part, MessagePart::Text { content } if content == output))
        })
}

// =============================================================================
// Tests
// =============================================================================
