//! An agent whose runs execute on a remote HTTP endpoint.
//!
//! `run` POSTs the [`RunAgentInput`] as JSON and yields the raw response body
//! chunks; `transform` decodes them with the wire decoder matching the
//! response `Content-Type`. Decoded events are checked with a
//! [`SpanVerifier`]; a remote stream that breaks span ordering fails with
//! [`AgentError::Protocol`]. Dropping the run stream drops the in-flight
//! response, which aborts the request.

use std::time::Duration;

use agentwire_core::{
    Agent, AgentError, Event, EventDecoder, EventStream, RunAgentInput, RunStream, SpanVerifier,
    WireFormat, JSON_CONTENT_TYPE, SSE_CONTENT_TYPE,
};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};

use crate::error::HttpAgentError;

/// Raw output of [`HttpAgent::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpEvent {
    /// The endpoint accepted the run; body chunks follow in `format`.
    Connected { format: WireFormat },
    /// A chunk of the response body, split at arbitrary byte offsets.
    Chunk(Vec<u8>),
}

/// A remote agent reached over HTTP.
///
/// ```no_run
/// use agentwire_client::HttpAgent;
/// use agentwire_core::{DynAgent, Message, RunAgentInput};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let agent = HttpAgent::builder("http://localhost:3000/api/agents/scripted")
///     .header("x-tenant", "demo")
///     .build()?;
///
/// let input = RunAgentInput::new("thread-1", "run-1").with_message(Message::user("hi"));
/// let mut events = agent.run_agent(input);
/// while let Some(event) = events.next().await {
///     println!("{:?}", event?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpAgent {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    format: WireFormat,
    description: String,
}

impl std::fmt::Debug for HttpAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAgent")
            .field("url", &self.url)
            .field("format", &self.format)
            .field("headers", &self.headers.len())
            .finish()
    }
}

impl HttpAgent {
    /// Create an agent for `url` with default settings.
    pub fn new(url: impl Into<String>) -> Result<Self, HttpAgentError> {
        Self::builder(url).build()
    }

    pub fn builder(url: impl Into<String>) -> HttpAgentBuilder {
        HttpAgentBuilder::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The wire format requested through `Accept`.
    pub fn format(&self) -> WireFormat {
        self.format
    }
}

/// Format announced by a response `Content-Type`, if recognized.
fn response_format(headers: &HeaderMap) -> Option<WireFormat> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let media_type = content_type.split(';').next()?.trim();
    if media_type.eq_ignore_ascii_case(SSE_CONTENT_TYPE) {
        Some(WireFormat::Sse)
    } else if media_type.eq_ignore_ascii_case(JSON_CONTENT_TYPE)
        || media_type.eq_ignore_ascii_case("application/json")
    {
        Some(WireFormat::Json)
    } else {
        None
    }
}

impl Agent for HttpAgent {
    type Event = HttpEvent;

    fn description(&self) -> &str {
        &self.description
    }

    fn run(&self, input: RunAgentInput) -> RunStream<HttpEvent> {
        let request = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .header(ACCEPT, self.format.content_type())
            .json(&input);
        let fallback = self.format;
        let url = self.url.clone();

        Box::pin(async_stream::stream! {
            log::debug!("POST {} for run {}", url, input.run_id);

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    yield Err::<HttpEvent, AgentError>(AgentError::from(
                        HttpAgentError::from_reqwest_error(e),
                    ));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                yield Err(AgentError::from(HttpAgentError::Status {
                    status: status.as_u16(),
                    body,
                }));
                return;
            }

            let format = response_format(response.headers()).unwrap_or(fallback);
            yield Ok(HttpEvent::Connected { format });

            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        yield Ok(HttpEvent::Chunk(bytes.to_vec()));
                    }
                    Err(e) => {
                        log::warn!("response body for run {} failed: {}", input.run_id, e);
                        yield Err(AgentError::from(HttpAgentError::from_reqwest_error(e)));
                        return;
                    }
                }
            }
        })
    }

    fn transform(&self, input: &RunAgentInput, mut source: RunStream<HttpEvent>) -> EventStream {
        let fallback = self.format;
        let run_id = input.run_id.clone();

        Box::pin(async_stream::stream! {
            let mut decoder: Option<EventDecoder> = None;
            let mut verifier = SpanVerifier::new();

            while let Some(item) = source.next().await {
                match item {
                    Ok(HttpEvent::Connected { format }) => {
                        decoder = Some(EventDecoder::new(format));
                    }
                    Ok(HttpEvent::Chunk(bytes)) => {
                        let decoder = decoder.get_or_insert_with(|| EventDecoder::new(fallback));
                        match decoder.push(&bytes) {
                            Ok(events) => {
                                for event in events {
                                    if let Err(violation) = verifier.observe(&event) {
                                        log::warn!("run {}: remote {}", run_id, violation);
                                        yield Err(AgentError::Protocol(violation));
                                        return;
                                    }
                                    yield Ok::<Event, AgentError>(event);
                                }
                            }
                            Err(e) => {
                                yield Err(AgentError::Decode(e));
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if let Some(mut decoder) = decoder {
                match decoder.finish() {
                    Ok(Some(event)) => {
                        match verifier.observe(&event) {
                            Ok(()) => {
                                yield Ok(event);
                            }
                            Err(violation) => {
                                log::warn!("run {}: remote {}", run_id, violation);
                                yield Err(AgentError::Protocol(violation));
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(AgentError::Decode(e));
                    }
                }
            }
        })
    }
}

/// Builder for [`HttpAgent`].
pub struct HttpAgentBuilder {
    url: String,
    headers: Vec<(String, String)>,
    format: WireFormat,
    connect_timeout: Option<Duration>,
    client: Option<reqwest::Client>,
    description: Option<String>,
}

impl HttpAgentBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            format: WireFormat::Sse,
            connect_timeout: None,
            client: None,
            description: None,
        }
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Request a wire format (default: SSE).
    pub fn format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Limit the time to establish a connection.
    ///
    /// There is no overall request timeout since runs stream for as long as
    /// the agent works. Ignored when a client is supplied.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Share an existing client (and its connection pool).
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> Result<HttpAgent, HttpAgentError> {
        let parsed = reqwest::Url::parse(&self.url)
            .map_err(|e| HttpAgentError::Configuration(format!("Invalid URL '{}': {}", self.url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HttpAgentError::Configuration(format!(
                "Unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name =
                HeaderName::try_from(name.as_str()).map_err(|e| HttpAgentError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| HttpAgentError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

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

        let description = self
            .description
            .unwrap_or_else(|| format!("Remote agent at {}", self.url));

        Ok(HttpAgent {
            client,
            url: self.url,
            headers,
            format: self.format,
            description,
        })
    }
}
