//! The smallest useful custom agent.
//!
//! `EchoAgent` shows the two-stage shape every custom agent follows: `run`
//! yields the agent's own event type, and `transform` maps those events onto
//! the protocol.

use futures::StreamExt;

use super::expand_response;
use crate::agent::{Agent, EventStream, RunStream};
use crate::error::AgentError;
use crate::input::RunAgentInput;

/// Event produced by [`EchoAgent::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoEvent {
    Response(String),
}

/// Replies with the last user message, optionally prefixed.
#[derive(Debug, Clone, Default)]
pub struct EchoAgent {
    prefix: String,
}

impl EchoAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl Agent for EchoAgent {
    type Event = EchoEvent;

    fn description(&self) -> &str {
        "Echoes the last user message"
    }

    fn run(&self, input: RunAgentInput) -> RunStream<EchoEvent> {
        let prefix = self.prefix.clone();
        Box::pin(async_stream::stream! {
            let text = input.last_user_content().unwrap_or_default();
            yield Ok::<EchoEvent, AgentError>(EchoEvent::Response(format!("{}{}", prefix, text)));
        })
    }

    fn transform(&self, input: &RunAgentInput, source: RunStream<EchoEvent>) -> EventStream {
        let responses = source.map(|item| item.map(|EchoEvent::Response(text)| text));
        expand_response(input, Box::pin(responses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::DynAgent;
    use crate::history::HistoryBuilder;
    use crate::input::Message;
    use crate::test_utils::collect_events;

    #[tokio::test]
    async fn test_echoes_last_user_message() {
        let input = RunAgentInput::new("t1", "r1")
            .with_message(Message::user("first"))
            .with_message(Message::assistant("ok"))
            .with_message(Message::user("second"));

        let agent = EchoAgent::new().with_prefix("echo: ");
        let events = collect_events(agent.run_agent(input)).await.unwrap();

        let mut history = HistoryBuilder::new();
        history.apply_all(&events).unwrap();
        assert_eq!(history.messages().len(), 1);
        assert_eq!(history.messages()[0].content(), Some("echo: second"));
    }

    #[tokio::test]
    async fn test_empty_history_produces_empty_message() {
        let events = collect_events(EchoAgent::new().run_agent(RunAgentInput::new("t1", "r1")))
            .await
            .unwrap();

        // no content event for an empty reply
        assert_eq!(events.len(), 4);
        assert!(events.last().unwrap().is_terminal());
    }
}
