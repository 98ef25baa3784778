//! Demo server exposing the reference agents.
//!
//! Run with:
//! ```sh
//! RUST_LOG=debug cargo run -p agentwire-server --example demo_server
//! ```
//!
//! Stream a run as SSE:
//! ```sh
//! curl -N -X POST http://localhost:3000/api/agents/scripted \
//!   -H "Content-Type: application/json" \
//!   -H "Accept: text/event-stream" \
//!   -d '{"threadId": "t1", "runId": "r1", "messages": [{"id": "m1", "role": "user", "content": "hi"}]}'
//! ```
//!
//! The `agentic_chat` agent forwards to `agenticChatAgent` on a Mastra
//! server at `MASTRA_BASE_URL` (default `http://localhost:4111`).

use std::sync::Arc;

use agentwire_client::MastraBackend;
use agentwire_core::{DelegatingAgent, EchoAgent, ParrotAgent, ScriptedChatAgent};
use agentwire_server::{AgentRouter, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env()?;
    let mastra = MastraBackend::from_env()?;
    log::info!("delegating 'agentic_chat' to {}", mastra.base_url());

    let app = AgentRouter::new()
        .base_path(&config.base_path)
        .agent("scripted", ScriptedChatAgent::new())
        .agent("parrot", ParrotAgent::new())
        .agent("echo", EchoAgent::new())
        .agent(
            "agentic_chat",
            DelegatingAgent::new(Arc::new(mastra), "agenticChatAgent")
                .with_description("Agentic chat agent hosted on Mastra"),
        )
        .with_cors()
        .build()?;

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    log::info!("listening on http://{}{}", config.bind, config.base_path);

    axum::serve(listener, app).await?;

    Ok(())
}
