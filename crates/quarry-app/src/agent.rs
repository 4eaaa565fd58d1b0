//! Offline agent used when no model backend is wired in.
//!
//! Answers every question with a short narration block and an echo of the
//! question, streamed word by word, so the full protocol can be exercised
//! end to end without a model.

use async_stream::stream;
use async_trait::async_trait;

use quarry_chat::{Agent, AgentRun, AgentUnit, ChatError, Message, MessagePart, UnitStream};

#[derive(Debug, Default)]
pub struct OfflineAgent;

impl OfflineAgent {
    pub fn new() -> Self {
        Self
    }
}

/// Full transcript and final output for one question.
fn reply(question: &str, history: &[Message]) -> (Vec<Message>, String) {
    let output = format!(
        "<thinking>No analysis backend is configured, so the question is echoed back.</thinking>You asked: {}",
        question.trim()
    );

    let mut messages = history.to_vec();
    messages.push(Message::Request {
        parts: vec![MessagePart::UserPrompt {
            content: question.to_string(),
        }],
    });
    messages.push(Message::Response {
        parts: vec![MessagePart::Text {
            content: output.clone(),
        }],
    });
    (messages, output)
}

#[async_trait]
impl Agent for OfflineAgent {
    async fn run(&self, question: &str, history: &[Message]) -> Result<AgentRun, ChatError> {
        let (messages, output) = reply(question, history);
        Ok(AgentRun { messages, output })
    }

    fn run_events(&self, question: &str, history: Vec<Message>) -> UnitStream {
        let (messages, output) = reply(question, &history);

        Box::pin(stream! {
            for word in output.split_inclusive(' ') {
                yield Ok(AgentUnit::TextDelta(word.to_string()));
            }
            yield Ok(AgentUnit::Completed { messages });
        })
    }
}
