//! HTTP server for agentwire agents.
//!
//! Serves any number of named agents behind an axum [`Router`](axum::Router).
//! Each run is streamed as Server-Sent Events or newline-delimited JSON,
//! depending on the request's `Accept` header.
//!
//! # Routes
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `{base}/{agent}` | `RunAgentInput` JSON, answered with an event stream |
//! | `GET` | `{base}` | none, answered with the registered agents |
//!
//! Requests that fail before the run starts (unknown agent, malformed or
//! invalid input, agent failing before `RUN_STARTED`) get a JSON error body
//! `{"error": "...", "code": 400}`. Once streaming has begun, failures are
//! reported in-band as `RUN_ERROR`.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentwire_core::ScriptedChatAgent;
//! use agentwire_server::{AgentRouter, ServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let app = AgentRouter::new()
//!     .base_path(&config.base_path)
//!     .agent("scripted", ScriptedChatAgent::new())
//!     .build()?;
//!
//! let listener = tokio::net::TcpListener::bind(config.bind).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub(crate) mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::{BuildError, ServerError, ServerResult};
pub use handler::{AgentInfo, AgentList};
pub use router::{AgentRouter, DEFAULT_BASE_PATH};
