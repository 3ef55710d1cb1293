//! Explicit request context threaded through every call.

use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

/// Per-request values forwarded to agents.
///
/// The bearer token is opaque to the mesh: it is never inspected or logged,
/// only forwarded as an `Authorization` header.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request, used in log fields
    pub request_id: String,
    /// Caller's conversation session id
    pub session_id: String,
    token: SecretString,
}

impl RequestContext {
    /// Create a context with a freshly generated request id
    #[must_use]
    pub fn new(session_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            token: SecretString::new(token.into()),
        }
    }

    /// Override the request id (e.g. to propagate an upstream id)
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// The bearer token to forward
    #[must_use]
    pub fn bearer_token(&self) -> &str {
        self.token.expose_secret()
    }
}
