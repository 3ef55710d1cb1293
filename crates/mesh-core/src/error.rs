//! Error types for the agent mesh.
//!
//! Every failure that crosses a crate boundary is expressed as a [`MeshError`].
//! Components decide locally whether a variant is recovered (discovery store
//! failures, decision parse failures) or surfaced as a structured message
//! (agent not found, transport failures).

use thiserror::Error;

/// Result type for mesh operations
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors that can occur inside the mesh core
#[derive(Debug, Error)]
pub enum MeshError {
    /// The embedding collaborator failed or returned an unusable vector
    #[error("Embedding error: {message}")]
    Embedding {
        /// Error message
        message: String,
    },

    /// The inference collaborator failed
    #[error("Inference error: {message}")]
    Inference {
        /// Error message
        message: String,
    },

    /// The directory backing store failed
    #[error("Store error ({backend}): {message}")]
    Store {
        /// Store backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// A referenced agent id is not present in the directory
    #[error("Agent '{agent_id}' not found")]
    AgentNotFound {
        /// The missing agent id
        agent_id: String,
    },

    /// Network failure while calling an agent
    #[error("Transport error calling agent '{agent_id}': {message}")]
    Transport {
        /// Agent being called
        agent_id: String,
        /// Error message
        message: String,
        /// HTTP status code, when a response was received
        status_code: Option<u16>,
    },

    /// An agent call exceeded its per-call timeout
    #[error("Agent '{agent_id}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Agent being called
        agent_id: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// An LLM-produced routing decision could not be parsed or validated
    #[error("Routing decision parse error: {message}")]
    DecisionParse {
        /// Error message
        message: String,
    },

    /// Configuration error; the only class allowed to abort startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MeshError {
    /// Create a new embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a new inference error
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a new agent-not-found error
    pub fn agent_not_found(agent_id: impl Into<String>) -> Self {
        Self::AgentNotFound {
            agent_id: agent_id.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(
        agent_id: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Transport {
            agent_id: agent_id.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Create a new decision parse error
    pub fn decision_parse(message: impl Into<String>) -> Self {
        Self::DecisionParse {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// The mesh itself never retries; this is informational for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status_code, .. } => {
                status_code.map_or(true, |code| code == 429 || code >= 500)
            }
            Self::Timeout { .. } | Self::Store { .. } => true,
            _ => false,
        }
    }

    /// Short machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Embedding { .. } => "embedding_error",
            Self::Inference { .. } => "inference_error",
            Self::Store { .. } => "store_error",
            Self::AgentNotFound { .. } => "agent_not_found",
            Self::Transport { .. } => "transport_error",
            Self::Timeout { .. } => "timeout",
            Self::DecisionParse { .. } => "decision_parse_error",
            Self::Configuration(_) => "configuration_error",
            Self::Serialization(_) => "serialization_error",
        }
    }
}
