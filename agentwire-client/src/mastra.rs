//! [`AgentBackend`] for a Mastra server.
//!
//! Runs are sent to `POST {base_url}/api/agents/{agent_id}/stream` and the
//! answer is read as an AI SDK data stream (see [`crate::data_stream`]).

use std::time::Duration;

use agentwire_core::{AgentBackend, BackendError, BackendPart, BackendRequest, BackendStream};
use async_trait::async_trait;
use futures::StreamExt;

use crate::data_stream::DataStreamDecoder;
use crate::error::HttpAgentError;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:4111";

/// Environment variable read by [`MastraBackend::from_env`].
pub const BASE_URL_ENV: &str = "MASTRA_BASE_URL";

/// Client for a Mastra agent server.
#[derive(Clone)]
pub struct MastraBackend {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for MastraBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastraBackend")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl MastraBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, HttpAgentError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a backend from the `MASTRA_BASE_URL` environment variable,
    /// falling back to `http://localhost:4111`.
    pub fn from_env() -> Result<Self, HttpAgentError> {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn builder() -> MastraBackendBuilder {
        MastraBackendBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn stream_url(&self, agent_id: &str) -> String {
        format!("{}/api/agents/{}/stream", self.base_url, agent_id)
    }
}

#[async_trait]
impl AgentBackend for MastraBackend {
    async fn stream(&self, request: BackendRequest) -> Result<BackendStream, BackendError> {
        let url = self.stream_url(&request.agent_id);
        log::debug!("POST {} for run {}", url, request.run_id);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(HttpAgentError::from_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpAgentError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let run_id = request.run_id;
        Ok(Box::pin(async_stream::stream! {
            let mut decoder = DataStreamDecoder::new();
            let mut body = response.bytes_stream();

            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::warn!("backend body for run {} failed: {}", run_id, e);
                        yield Err::<BackendPart, BackendError>(BackendError::Stream(e.to_string()));
                        return;
                    }
                };
                for part in decoder.push(&bytes) {
                    let failed = part.is_err();
                    yield part;
                    if failed {
                        return;
                    }
                }
            }

            if let Some(part) = decoder.finish() {
                yield part;
            }
        }))
    }
}

/// Builder for [`MastraBackend`].
pub struct MastraBackendBuilder {
    base_url: Option<String>,
    connect_timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

impl MastraBackendBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            connect_timeout: None,
            client: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<MastraBackend, HttpAgentError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        reqwest::Url::parse(&base_url).map_err(|e| {
            HttpAgentError::Configuration(format!("Invalid base URL '{}': {}", base_url, e))
        })?;

        let client = match self.client {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                builder.build().map_err(|e| {
                    HttpAgentError::Configuration(format!("Failed to create HTTP client: {}", e))
                })?
            }
        };

        Ok(MastraBackend { client, base_url })
    }
}
