//! HTTP handlers for agent runs.

use agentwire_core::{AgentError, DynAgent, EventEncoder, RunAgentInput, SharedAgent, WireFormat};
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{
        header::{ACCEPT, CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
        HeaderMap, HeaderValue,
    },
    response::Response,
    Json,
};
use futures::StreamExt;
use serde::Serialize;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// One entry of the agent listing.
#[derive(Debug, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
}

/// Response body of the agent listing.
#[derive(Debug, Serialize)]
pub struct AgentList {
    pub agents: Vec<AgentInfo>,
}

/// List registered agents.
pub async fn list_handler(State(state): State<AppState>) -> Json<AgentList> {
    let agents = state
        .registry
        .iter()
        .map(|(name, agent)| AgentInfo {
            name: name.to_string(),
            description: agent.description().to_string(),
        })
        .collect();

    Json(AgentList { agents })
}

/// Run an agent and stream its events.
///
/// The body is a `RunAgentInput`. The wire format follows the `Accept`
/// header. The first event is awaited before the response is sent, so an
/// agent that fails before `RUN_STARTED` gets a JSON error response instead
/// of an empty stream.
pub async fn run_handler(
    State(state): State<AppState>,
    Path(agent_name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let agent = state
        .registry
        .get(&agent_name)
        .ok_or_else(|| ServerError::AgentNotFound(agent_name.clone()))?;

    let input: RunAgentInput = serde_json::from_slice(&body)
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
    input.validate()?;

    let accept = headers.get(ACCEPT).and_then(|value| value.to_str().ok());
    let encoder = EventEncoder::from_accept(accept);

    log::debug!(
        "run {} on agent '{}' ({:?})",
        input.run_id,
        agent_name,
        encoder.format()
    );

    stream_run(agent, input, encoder).await
}

async fn stream_run(
    agent: SharedAgent,
    input: RunAgentInput,
    encoder: EventEncoder,
) -> ServerResult<Response> {
    let run_id = input.run_id.clone();
    let mut events = agent.run_agent(input);

    let first = match events.next().await {
        Some(Ok(event)) => event,
        Some(Err(err)) => return Err(err.into()),
        None => return Err(AgentError::EmptyRun.into()),
    };

    let format = encoder.format();
    let content_type = encoder.content_type();
    let frames = futures::stream::once(async move { Ok(first) })
        .chain(events)
        .map(move |item| match item {
            Ok(event) => encoder
                .encode(&event)
                .map_err(|e| ServerError::Internal(e.to_string())),
            Err(err) => {
                log::warn!("run {} aborted mid-stream: {}", run_id, err);
                Err(ServerError::Agent(err))
            }
        });

    let mut response = Response::new(Body::from_stream(frames));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if format == WireFormat::Sse {
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    }

    Ok(response)
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
