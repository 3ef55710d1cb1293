//! Messages streamed back to the caller and per-agent invocation results.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Lazy stream of messages produced by an agent call or a whole request
pub type MessageStream = BoxStream<'static, AgentMessage>;

/// Message type emitted when a step fails
pub const ERROR_TYPE: &str = "error";

/// Message type of an agent's textual answer
pub const ASSISTANT_MESSAGE_TYPE: &str = "assistant_message";

/// Message type of a successful PARALLEL result
pub const AGENT_RESPONSE_TYPE: &str = "agent_response";

/// Message type of a failed PARALLEL result
pub const AGENT_ERROR_TYPE: &str = "agent_error";

/// An opaque message object.
///
/// Agent payloads are forwarded verbatim; the mesh only inspects the `type`
/// field and, for `assistant_message`, the `content` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentMessage(Value);

impl AgentMessage {
    /// Wrap a raw JSON payload
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// `{"type":"error","message":...}`
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self(json!({ "type": ERROR_TYPE, "message": message.into() }))
    }

    /// `{"type":"assistant_message","content":...}`
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self(json!({ "type": ASSISTANT_MESSAGE_TYPE, "content": content.into() }))
    }

    /// The `type` field, if the payload is an object carrying one
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Whether this is an error message
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.message_type() == Some(ERROR_TYPE)
    }

    /// The error text of an error message
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        if self.is_error() {
            self.0.get("message").and_then(Value::as_str)
        } else {
            None
        }
    }

    /// The `content` of an `assistant_message` payload
    #[must_use]
    pub fn assistant_content(&self) -> Option<&str> {
        if self.message_type() == Some(ASSISTANT_MESSAGE_TYPE) {
            self.0.get("content").and_then(Value::as_str)
        } else {
            None
        }
    }

    /// Borrow the raw payload
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Take the raw payload
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for AgentMessage {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// One agent's outcome within PARALLEL execution.
///
/// Exactly one of `response` / `error` is set, matching `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInvocationResult {
    /// Agent that was invoked
    pub agent_id: String,
    /// Whether the invocation succeeded
    pub success: bool,
    /// Response payload on success
    pub response: Option<Value>,
    /// Error text on failure
    pub error: Option<String>,
    /// Wall-clock latency of the invocation
    pub latency_ms: u64,
}

impl AgentInvocationResult {
    /// A successful result
    #[must_use]
    pub fn success(agent_id: impl Into<String>, response: Value, latency_ms: u64) -> Self {
        Self {
            agent_id: agent_id.into(),
            success: true,
            response: Some(response),
            error: None,
            latency_ms,
        }
    }

    /// A failed result
    #[must_use]
    pub fn failure(agent_id: impl Into<String>, error: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            agent_id: agent_id.into(),
            success: false,
            response: None,
            error: Some(error.into()),
            latency_ms,
        }
    }

    /// Render as the message delivered to the caller
    #[must_use]
    pub fn to_message(&self) -> AgentMessage {
        if self.success {
            AgentMessage(json!({
                "type": AGENT_RESPONSE_TYPE,
                "agent_id": self.agent_id,
                "response": self.response,
                "latency_ms": self.latency_ms,
            }))
        } else {
            AgentMessage(json!({
                "type": AGENT_ERROR_TYPE,
                "agent_id": self.agent_id,
                "error": self.error,
                "latency_ms": self.latency_ms,
            }))
        }
    }
}
