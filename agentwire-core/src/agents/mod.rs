//! Reference agents.
//!
//! - [`ScriptedChatAgent`] emits protocol events directly.
//! - [`ParrotAgent`] and [`EchoAgent`] emit a private response event and rely
//!   on their transform stage to produce protocol events.
//! - [`DelegatingAgent`] forwards the conversation to an [`AgentBackend`] and
//!   translates its answer.
//!
//! [`AgentBackend`]: crate::backend::AgentBackend

pub mod delegating;
pub mod echo;
pub mod parrot;
pub mod scripted;

pub use delegating::{DelegatingAgent, PartTranslator};
pub use echo::{EchoAgent, EchoEvent};
pub use parrot::{ParrotAgent, ParrotEvent};
pub use scripted::{ScriptedChatAgent, BACKGROUND_GRADIENT, CHANGE_BACKGROUND};

use futures::StreamExt;

use crate::agent::{EventStream, RunStream};
use crate::error::AgentError;
use crate::events::Event;
use crate::input::{RunAgentInput, Role};

/// Expand a stream holding a single text response into a complete run.
///
/// The response becomes one assistant message framed by `RUN_STARTED` and
/// `RUN_FINISHED`. A second response fails the stream with
/// [`AgentError::Transform`].
pub(crate) fn expand_response(input: &RunAgentInput, mut source: RunStream<String>) -> EventStream {
    let thread_id = input.thread_id.clone();
    let run_id = input.run_id.clone();

    Box::pin(async_stream::stream! {
        let mut answered = false;

        while let Some(item) = source.next().await {
            let response = match item {
                Ok(response) => response,
                Err(err) => {
                    yield Err::<Event, AgentError>(err);
                    return;
                }
            };
            if answered {
                yield Err(AgentError::Transform(
                    "agent produced more than one response".to_string(),
                ));
                return;
            }
            answered = true;

            let message_id = uuid::Uuid::new_v4().to_string();
            yield Ok(Event::run_started(&thread_id, &run_id));
            yield Ok(Event::text_message_start(&message_id, Role::Assistant));
            if !response.is_empty() {
                yield Ok(Event::text_message_content(&message_id, response));
            }
            yield Ok(Event::text_message_end(&message_id));
            yield Ok(Event::run_finished(&thread_id, &run_id));
        }
    })
}
