//! Routing decisions produced by the routing engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Execution strategy for a routed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoutingStrategy {
    /// Invoke exactly one agent (`agents[0]`)
    Single,
    /// Invoke every agent concurrently and collect one result per agent
    Parallel,
    /// Invoke agents in order, carrying earlier answers forward as context
    Sequential,
}

impl RoutingStrategy {
    /// All strategies, in declaration order
    pub const ALL: [Self; 3] = [Self::Single, Self::Parallel, Self::Sequential];

    /// Canonical upper-case name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "SINGLE",
            Self::Parallel => "PARALLEL",
            Self::Sequential => "SEQUENTIAL",
        }
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingStrategy {
    type Err = String;

    /// Case-insensitive parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown routing strategy '{s}'"))
    }
}

/// Output of the routing engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Chosen execution strategy
    pub strategy: RoutingStrategy,

    /// Ordered agent ids.
    ///
    /// For SINGLE only `agents[0]` is authoritative; for SEQUENTIAL this is the
    /// execution order; for PARALLEL the order is advisory.
    pub agents: Vec<String>,

    /// Why this decision was made, including any fallback that occurred
    pub reasoning: String,

    /// Optional agent id -> prerequisite agent ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<HashMap<String, Vec<String>>>,
}

impl RoutingDecision {
    /// A SINGLE decision for one agent
    #[must_use]
    pub fn single(agent_id: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            strategy: RoutingStrategy::Single,
            agents: vec![agent_id.into()],
            reasoning: reasoning.into(),
            dependencies: None,
        }
    }

    /// A decision with an explicit strategy and agent list
    #[must_use]
    pub fn new(
        strategy: RoutingStrategy,
        agents: Vec<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            strategy,
            agents,
            reasoning: reasoning.into(),
            dependencies: None,
        }
    }

    /// The first (for SINGLE: the only authoritative) agent id
    #[must_use]
    pub fn primary_agent(&self) -> Option<&str> {
        self.agents.first().map(String::as_str)
    }
}
