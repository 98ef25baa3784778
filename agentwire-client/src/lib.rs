//! HTTP clients for agentwire.
//!
//! - [`HttpAgent`] runs an agent hosted behind an agentwire HTTP endpoint,
//!   decoding its SSE or NDJSON response back into protocol events.
//! - [`MastraBackend`] is an [`AgentBackend`](agentwire_core::AgentBackend)
//!   for a Mastra server, for use with
//!   [`DelegatingAgent`](agentwire_core::DelegatingAgent).
//!
//! # Delegating to Mastra
//!
//! ```no_run
//! use std::sync::Arc;
//! use agentwire_client::MastraBackend;
//! use agentwire_core::DelegatingAgent;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = MastraBackend::from_env()?;
//! let agent = DelegatingAgent::new(Arc::new(backend), "weatherAgent");
//! # Ok(())
//! # }
//! ```

pub mod data_stream;
pub mod error;
pub mod http_agent;
pub mod mastra;

pub use error::HttpAgentError;
pub use http_agent::{HttpAgent, HttpAgentBuilder, HttpEvent};
pub use mastra::{MastraBackend, MastraBackendBuilder};
