//! Mock agents and inference servers for integration testing
//!
//! Provides wiremock-based servers that speak the agent query protocol
//! (`POST /api/v1/query` answered with a `data:` line stream) and the
//! OpenAI chat-completions API used for LLM routing.

use mesh_core::AgentDescriptor;
use mesh_orchestrator::QUERY_PATH;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Render `events` as an event-stream body terminated by `[DONE]`
pub fn sse_body(events: &[Value]) -> String {
    let mut body: String = events.iter().map(|e| format!("data: {e}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn sse_response(events: &[Value]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(sse_body(events))
}

/// A running mock agent and the descriptor pointing at it
pub struct MockAgent {
    /// Backing server
    pub server: MockServer,
    /// Descriptor whose `base_url` is the server
    pub descriptor: AgentDescriptor,
}

impl MockAgent {
    /// Start a server and build the agent's descriptor from its URL
    pub async fn start(descriptor: impl FnOnce(&str) -> AgentDescriptor) -> Self {
        let server = MockServer::start().await;
        let descriptor = descriptor(&server.uri());
        Self { server, descriptor }
    }

    /// The agent's id
    pub fn id(&self) -> &str {
        &self.descriptor.agent_id
    }

    /// Answer every query with one assistant message
    pub async fn answer(&self, content: &str) {
        self.stream(&[json!({"type": "assistant_message", "content": content})])
            .await;
    }

    /// Answer every query with `events`
    pub async fn stream(&self, events: &[Value]) {
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .respond_with(sse_response(events))
            .mount(&self.server)
            .await;
    }

    /// Answer queries containing `needle` with one assistant message.
    ///
    /// Mounted before a catch-all, this lets a test tell requests apart.
    pub async fn answer_when(&self, needle: &str, content: &str) {
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .and(body_string_contains(needle))
            .respond_with(sse_response(&[
                json!({"type": "assistant_message", "content": content}),
            ]))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Fail every query with `status`
    pub async fn fail(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string("unavailable"))
            .mount(&self.server)
            .await;
    }

    /// Answer every query after `delay`
    pub async fn answer_slowly(&self, content: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .respond_with(
                sse_response(&[json!({"type": "assistant_message", "content": content})])
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer health checks with `status`
    pub async fn health(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(self.descriptor.health_endpoint.as_str()))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of every query received, in arrival order
    pub async fn received_queries(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == QUERY_PATH)
            .filter_map(|r| r.body_json::<Value>().ok())
            .collect()
    }
}

/// Mock OpenAI-compatible chat completions server
pub struct MockInference {
    /// Backing server
    pub server: MockServer,
}

impl MockInference {
    /// Start a server with no mounted responses
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to configure the inference provider with
    pub fn endpoint(&self) -> String {
        format!("{}/v1", self.server.uri())
    }

    /// Reply to every completion request with `content`
    pub async fn reply(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&self.server)
            .await;
    }

    /// Fail every completion request with `status`
    pub async fn fail(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": {"message": "upstream unavailable", "type": "server_error"}
            })))
            .mount(&self.server)
            .await;
    }
}
