//! Streaming calls to individual agents.

use crate::sse::EventDecoder;
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use mesh_core::{AgentDescriptor, AgentMessage, MeshError, MessageStream, RequestContext};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Path agents serve queries on, relative to their base URL
pub const QUERY_PATH: &str = "/api/v1/query";

/// Performs the network call to one agent
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Stream the agent's answer to `query`.
    ///
    /// The stream never fails: a transport error is delivered as a single
    /// `{"type":"error"}` message, after which the stream ends.
    fn call(&self, agent: &AgentDescriptor, query: &str, ctx: &RequestContext) -> MessageStream;

    /// Check the agent's health endpoint
    async fn health_check(&self, agent: &AgentDescriptor) -> bool;
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    session_id: &'a str,
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// HTTP invoker speaking the agent query protocol.
///
/// No retries are performed; each call is bounded by the configured timeout
/// covering connection, headers and the whole body.
#[derive(Debug, Clone)]
pub struct HttpAgentInvoker {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpAgentInvoker {
    /// Create an invoker with a per-call timeout
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(timeout: Duration) -> Result<Self, MeshError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| MeshError::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, timeout))
    }

    /// Create an invoker over an existing client
    #[must_use]
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Per-call timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transport_error(&self, agent_id: &str, error: &reqwest::Error) -> MeshError {
        if error.is_timeout() {
            MeshError::Timeout {
                agent_id: agent_id.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            MeshError::transport(agent_id, error.to_string(), error.status().map(|s| s.as_u16()))
        }
    }
}

#[async_trait]
impl AgentInvoker for HttpAgentInvoker {
    fn call(&self, agent: &AgentDescriptor, query: &str, ctx: &RequestContext) -> MessageStream {
        let url = join_url(&agent.base_url, QUERY_PATH);
        let agent_id = agent.agent_id.clone();
        let request = self
            .client
            .post(&url)
            .bearer_auth(ctx.bearer_token())
            .timeout(self.timeout)
            .json(&QueryRequest {
                query,
                session_id: &ctx.session_id,
            });
        let invoker = self.clone();

        debug!(agent_id = %agent_id, url = %url, request_id = %ctx.request_id, "Calling agent");

        stream! {
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let error = invoker.transport_error(&agent_id, &e);
                    warn!(agent_id = %agent_id, error = %error, "Agent request failed");
                    yield AgentMessage::error(error.to_string());
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let error = MeshError::transport(
                    agent_id.as_str(),
                    format!("HTTP {status}"),
                    Some(status.as_u16()),
                );
                warn!(agent_id = %agent_id, status = status.as_u16(), "Agent returned error status");
                yield AgentMessage::error(error.to_string());
                return;
            }

            let mut decoder = EventDecoder::new();
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(chunk) => {
                        for message in decoder.push(&chunk) {
                            yield message;
                        }
                        if decoder.is_done() {
                            return;
                        }
                    }
                    Err(e) => {
                        let error = invoker.transport_error(&agent_id, &e);
                        warn!(agent_id = %agent_id, error = %error, "Agent stream interrupted");
                        yield AgentMessage::error(error.to_string());
                        return;
                    }
                }
            }

            if let Some(message) = decoder.finish() {
                yield message;
            }
            debug!(agent_id = %agent_id, "Agent stream complete");
        }
        .boxed()
    }

    async fn health_check(&self, agent: &AgentDescriptor) -> bool {
        let url = join_url(&agent.base_url, &agent.health_endpoint);
        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(agent_id = %agent.agent_id, status = response.status().as_u16(), "Health check failed");
                false
            }
            Err(e) => {
                debug!(agent_id = %agent.agent_id, error = %e, "Health check request failed");
                false
            }
        }
    }
}
