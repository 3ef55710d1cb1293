//! Typed configuration sections.

use crate::error::{ConfigError, ConfigResult};
use mesh_core::AgentDescriptor;
use mesh_telemetry::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level mesh configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Directory and discovery settings
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Routing engine settings
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Heartbeat settings
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Embedding provider
    #[serde(default)]
    pub embedding: ProviderConfig,

    /// Inference provider (used only for LLM-assisted routing)
    #[serde(default)]
    pub inference: ProviderConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Agents registered by the hosting process at startup
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
}

impl MeshConfig {
    /// Validate every section.
    ///
    /// # Errors
    /// Returns the first validation failure found
    pub fn validate(&self) -> ConfigResult<()> {
        self.directory.validate()?;
        self.routing.validate()?;
        self.orchestrator.validate()?;
        self.heartbeat.validate(&self.directory)?;
        self.embedding.validate("embedding")?;
        self.inference.validate("inference")?;

        for (index, agent) in self.agents.iter().enumerate() {
            if agent.agent_id.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("agents[{index}].agent_id"),
                    "agent id must not be empty",
                ));
            }
            if agent.base_url.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("agents[{index}].base_url"),
                    "base url must not be empty",
                ));
            }
        }

        Ok(())
    }
}

/// Directory and discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Time-to-live of descriptor and vector records
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub ttl: Duration,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Default number of descriptors returned by discovery
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_ttl() -> Duration {
    Duration::from_secs(90)
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_top_k() -> usize {
    5
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            embedding_dimension: default_embedding_dimension(),
            top_k: default_top_k(),
        }
    }
}

impl DirectoryConfig {
    /// Set the record TTL
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the embedding dimension
    #[must_use]
    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    /// Set the discovery size
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Validate the section
    ///
    /// # Errors
    /// Returns error on a zero TTL, dimension or `top_k`
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ttl.is_zero() {
            return Err(ConfigError::validation("directory.ttl", "must be greater than zero"));
        }
        if self.embedding_dimension == 0 {
            return Err(ConfigError::validation(
                "directory.embedding_dimension",
                "must be greater than zero",
            ));
        }
        if self.top_k == 0 {
            return Err(ConfigError::validation("directory.top_k", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Routing engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Agent used when discovery finds nothing; required
    #[serde(default)]
    pub fallback_agent_id: String,

    /// Ask the inference provider to choose a strategy when several agents match
    #[serde(default)]
    pub llm_routing: bool,

    /// Upper bound on stored reasoning text
    #[serde(default = "default_max_reasoning_chars")]
    pub max_reasoning_chars: usize,
}

fn default_max_reasoning_chars() -> usize {
    2000
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            fallback_agent_id: String::new(),
            llm_routing: false,
            max_reasoning_chars: default_max_reasoning_chars(),
        }
    }
}

impl RoutingConfig {
    /// Create a routing configuration with the given fallback agent
    #[must_use]
    pub fn new(fallback_agent_id: impl Into<String>) -> Self {
        Self {
            fallback_agent_id: fallback_agent_id.into(),
            ..Self::default()
        }
    }

    /// Enable or disable LLM-assisted routing
    #[must_use]
    pub fn with_llm_routing(mut self, enabled: bool) -> Self {
        self.llm_routing = enabled;
        self
    }

    /// Validate the section
    ///
    /// # Errors
    /// Returns error when the fallback agent id is missing
    pub fn validate(&self) -> ConfigResult<()> {
        if self.fallback_agent_id.trim().is_empty() {
            return Err(ConfigError::validation(
                "routing.fallback_agent_id",
                "a fallback agent id is required",
            ));
        }
        if self.max_reasoning_chars == 0 {
            return Err(ConfigError::validation(
                "routing.max_reasoning_chars",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum agents invoked by one PARALLEL decision
    #[serde(default = "default_max_parallel_agents")]
    pub max_parallel_agents: usize,

    /// Per-call timeout for agent invocations
    #[serde(default = "default_agent_timeout", with = "humantime_serde")]
    pub agent_timeout: Duration,

    /// Header line preceding the digest of earlier answers in SEQUENTIAL mode
    #[serde(default = "default_context_header")]
    pub sequential_context_header: String,
}

fn default_max_parallel_agents() -> usize {
    3
}

fn default_agent_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_context_header() -> String {
    "Context from previous agents:".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel_agents: default_max_parallel_agents(),
            agent_timeout: default_agent_timeout(),
            sequential_context_header: default_context_header(),
        }
    }
}

impl OrchestratorConfig {
    /// Set the PARALLEL fan-out limit
    #[must_use]
    pub fn with_max_parallel_agents(mut self, max: usize) -> Self {
        self.max_parallel_agents = max;
        self
    }

    /// Set the per-call agent timeout
    #[must_use]
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    /// Validate the section
    ///
    /// # Errors
    /// Returns error on a zero fan-out limit or timeout
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_parallel_agents == 0 {
            return Err(ConfigError::validation(
                "orchestrator.max_parallel_agents",
                "must be greater than zero",
            ));
        }
        if self.agent_timeout.is_zero() {
            return Err(ConfigError::validation(
                "orchestrator.agent_timeout",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Heartbeat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Delay between heartbeats
    #[serde(default = "default_heartbeat_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(30)
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: default_heartbeat_interval(),
        }
    }
}

impl HeartbeatConfig {
    /// Validate the section against the directory TTL it must keep alive
    ///
    /// # Errors
    /// Returns error when the interval is zero or not shorter than the TTL
    pub fn validate(&self, directory: &DirectoryConfig) -> ConfigResult<()> {
        if self.interval.is_zero() {
            return Err(ConfigError::validation(
                "heartbeat.interval",
                "must be greater than zero",
            ));
        }
        if self.interval >= directory.ttl {
            return Err(ConfigError::validation(
                "heartbeat.interval",
                format!(
                    "must be shorter than directory.ttl ({}s), got {}s",
                    directory.ttl.as_secs(),
                    self.interval.as_secs()
                ),
            ));
        }
        Ok(())
    }
}

/// Which provider implementation to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local, deterministic implementation (hashing embedder, no inference)
    #[default]
    Local,
    /// OpenAI-compatible HTTP API
    OpenAi,
}

/// Embedding / inference provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider implementation
    #[serde(default)]
    pub kind: ProviderKind,

    /// API base URL, e.g. `https://api.openai.com/v1`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model name
    #[serde(default)]
    pub model: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Request timeout
    #[serde(default = "default_provider_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_provider_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Local,
            endpoint: None,
            model: None,
            api_key_env: None,
            timeout: default_provider_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Validate the section
    ///
    /// # Errors
    /// Returns error when an HTTP provider lacks an endpoint or model
    pub fn validate(&self, section: &str) -> ConfigResult<()> {
        if self.kind == ProviderKind::OpenAi {
            if self.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
                return Err(ConfigError::validation(
                    format!("{section}.endpoint"),
                    "required for openai providers",
                ));
            }
            if self.model.as_deref().map_or(true, |m| m.trim().is_empty()) {
                return Err(ConfigError::validation(
                    format!("{section}.model"),
                    "required for openai providers",
                ));
            }
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::validation(
                format!("{section}.timeout"),
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
