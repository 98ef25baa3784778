//! A scripted agent that streams protocol events directly.

use std::time::Duration;

use serde_json::json;

use crate::agent::{passthrough, Agent, EventStream, RunStream};
use crate::error::AgentError;
use crate::events::Event;
use crate::input::{RunAgentInput, Role};

/// Last-message content that triggers the tool-call script.
pub const CHANGE_BACKGROUND: &str = "change_background";

/// Background sent as the `change_background` argument.
pub const BACKGROUND_GRADIENT: &str = "linear-gradient(135deg, #667eea 0%, #764ba2 100%)";

const DEFAULT_DELAY: Duration = Duration::from_millis(300);
const COUNTDOWN_FROM: u32 = 10;

/// Streams one of two scripts depending on the last message.
///
/// If the last message's content is exactly `"change_background"`, the run
/// contains a single `change_background` tool call. Otherwise it contains a
/// paced countdown text message. The pause between countdown steps is a
/// timer owned by the stream, so dropping the stream cancels it.
#[derive(Debug, Clone)]
pub struct ScriptedChatAgent {
    delay: Duration,
}

impl Default for ScriptedChatAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedChatAgent {
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_DELAY,
        }
    }

    /// Set the pause after each countdown step. `Duration::ZERO` disables it.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Agent for ScriptedChatAgent {
    type Event = Event;

    fn description(&self) -> &str {
        "Counts down in a text message, or changes the background on request"
    }

    fn run(&self, input: RunAgentInput) -> RunStream<Event> {
        let delay = self.delay;

        Box::pin(async_stream::stream! {
            yield Ok::<Event, AgentError>(Event::run_started(&input.thread_id, &input.run_id));

            if input.last_message_content() == Some(CHANGE_BACKGROUND) {
                let args = json!({ "background": BACKGROUND_GRADIENT }).to_string();
                yield Ok(Event::tool_call_start(CHANGE_BACKGROUND, CHANGE_BACKGROUND, None));
                yield Ok(Event::tool_call_args(CHANGE_BACKGROUND, args));
                yield Ok(Event::tool_call_end(CHANGE_BACKGROUND));
            } else {
                let message_id = uuid::Uuid::new_v4().to_string();
                yield Ok(Event::text_message_start(&message_id, Role::Assistant));
                yield Ok(Event::text_message_content(&message_id, "Mastra integration in: "));

                for count in (1..=COUNTDOWN_FROM).rev() {
                    yield Ok(Event::text_message_content(&message_id, format!("{}  ", count)));
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }

                yield Ok(Event::text_message_content(&message_id, "✓"));
                yield Ok(Event::text_message_end(&message_id));
            }

            yield Ok(Event::run_finished(&input.thread_id, &input.run_id));
        })
    }

    fn transform(&self, _input: &RunAgentInput, source: RunStream<Event>) -> EventStream {
        passthrough(source)
    }
}
