//! Agent descriptor: the registered identity and capability record of one agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity and capability record for one agent.
///
/// Descriptors are owned by the directory. Callers always receive copies;
/// `registered_at` and `last_heartbeat` are assigned by the directory and any
/// values supplied by a caller are overwritten on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Globally unique, immutable agent key
    pub agent_id: String,

    /// Human-readable name
    pub name: String,

    /// Free-text description of what the agent does
    #[serde(default)]
    pub description: String,

    /// Agent version string
    #[serde(default)]
    pub version: String,

    /// Owning team
    #[serde(default)]
    pub team: String,

    /// Base URL used to invoke the agent
    pub base_url: String,

    /// Path of the agent's health endpoint, relative to `base_url`
    #[serde(default = "default_health_endpoint")]
    pub health_endpoint: String,

    /// Capabilities advertised by the agent
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Business domains the agent covers
    #[serde(default)]
    pub domains: Vec<String>,

    /// Example queries the agent answers well
    #[serde(default)]
    pub example_queries: Vec<String>,

    /// Whether the agent may be returned by discovery
    #[serde(default = "default_true")]
    pub is_healthy: bool,

    /// Registration time (server-assigned)
    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,

    /// Last heartbeat time (server-assigned, never earlier than `registered_at`)
    #[serde(default = "Utc::now")]
    pub last_heartbeat: DateTime<Utc>,
}

fn default_health_endpoint() -> String {
    "/health".to_string()
}

fn default_true() -> bool {
    true
}

impl AgentDescriptor {
    /// Create a descriptor with the required fields; everything else defaults.
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            description: String::new(),
            version: String::new(),
            team: String::new(),
            base_url: base_url.into(),
            health_endpoint: default_health_endpoint(),
            capabilities: Vec::new(),
            domains: Vec::new(),
            example_queries: Vec::new(),
            is_healthy: true,
            registered_at: now,
            last_heartbeat: now,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the owning team
    #[must_use]
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    /// Set the health endpoint path
    #[must_use]
    pub fn with_health_endpoint(mut self, path: impl Into<String>) -> Self {
        self.health_endpoint = path.into();
        self
    }

    /// Set the capabilities
    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Set the domains
    #[must_use]
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Set the example queries
    #[must_use]
    pub fn with_example_queries<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.example_queries = queries.into_iter().map(Into::into).collect();
        self
    }

    /// Set the health flag
    #[must_use]
    pub fn with_healthy(mut self, is_healthy: bool) -> Self {
        self.is_healthy = is_healthy;
        self
    }

    /// Compare every caller-supplied field, ignoring server-assigned timestamps.
    #[must_use]
    pub fn same_registration(&self, other: &Self) -> bool {
        self.agent_id == other.agent_id
            && self.name == other.name
            && self.description == other.description
            && self.version == other.version
            && self.team == other.team
            && self.base_url == other.base_url
            && self.health_endpoint == other.health_endpoint
            && self.capabilities == other.capabilities
            && self.domains == other.domains
            && self.example_queries == other.example_queries
            && self.is_healthy == other.is_healthy
    }
}
