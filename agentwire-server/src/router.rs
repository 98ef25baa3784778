//! Router builder for agentwire HTTP endpoints.

use std::sync::Arc;

use agentwire_core::{Agent, SharedAgent};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::error::BuildError;
use crate::state::{AgentRegistry, AppState};

/// Default prefix for agent routes.
pub const DEFAULT_BASE_PATH: &str = "/api/agents";

/// Builder for the agent endpoints.
///
/// Each registered agent is served at `POST {base_path}/{name}`, and
/// `GET {base_path}` lists them.
///
/// # Example
///
/// ```rust,no_run
/// use agentwire_core::{EchoAgent, ScriptedChatAgent};
/// use agentwire_server::AgentRouter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = AgentRouter::new()
///     .agent("scripted", ScriptedChatAgent::new())
///     .agent("echo", EchoAgent::new())
///     .build()?;
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub struct AgentRouter {
    agents: Vec<(String, SharedAgent)>,
    base_path: String,
    cors: bool,
}

impl AgentRouter {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            cors: false,
        }
    }

    /// Register an agent under `name`.
    pub fn agent<A: Agent + 'static>(self, name: impl Into<String>, agent: A) -> Self {
        self.shared_agent(name, Arc::new(agent))
    }

    /// Register an agent that is also used elsewhere in the application.
    pub fn shared_agent(mut self, name: impl Into<String>, agent: SharedAgent) -> Self {
        self.agents.push((name.into(), agent));
        self
    }

    /// Set the path prefix for agent routes (default: `/api/agents`).
    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Allow cross-origin requests from any origin.
    ///
    /// Browser frontends served from another origin need this.
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Build the router with all registered agents.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NoAgents`] if no agent was registered,
    /// [`BuildError::InvalidAgentName`] for a name that is empty or contains
    /// `/`, and [`BuildError::DuplicateAgent`] if a name is used twice.
    pub fn build(self) -> Result<Router, BuildError> {
        if self.agents.is_empty() {
            return Err(BuildError::NoAgents);
        }

        let mut registry = AgentRegistry::new();
        for (name, agent) in self.agents {
            if name.is_empty() || name.contains('/') {
                return Err(BuildError::InvalidAgentName(name));
            }
            if registry.contains(&name) {
                return Err(BuildError::DuplicateAgent(name));
            }
            registry.insert(name, agent);
        }

        let base = normalize_base_path(&self.base_path);
        let list_path = if base.is_empty() { "/".to_string() } else { base.clone() };
        let run_path = format!("{}/:agent_name", base);

        use crate::handler::{list_handler, run_handler};

        let mut router = Router::new()
            .route(&list_path, get(list_handler))
            .route(&run_path, post(run_handler))
            .with_state(AppState::new(registry));

        if self.cors {
            router = router.layer(CorsLayer::permissive());
        }

        Ok(router)
    }

    /// Build the router and nest it under a prefix path.
    ///
    /// Useful when merging the agent routes into an existing application.
    pub fn build_nested(self, prefix: impl Into<String>) -> Result<Router, BuildError> {
        Ok(Router::new().nest(&prefix.into(), self.build()?))
    }
}

impl Default for AgentRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// `"api/agents/"` becomes `"/api/agents"`; `"/"` becomes `""`.
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
