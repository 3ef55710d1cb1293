//! Prometheus metrics for the agent mesh.
//!
//! Metrics are registered on a private [`Registry`] so that several mesh
//! instances (and tests) can coexist in one process.

use crate::logging::TelemetryError;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Outcome label for agent invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Agent answered
    Success,
    /// Agent id was not in the directory
    NotFound,
    /// Transport failure, timeout or agent-reported error
    Failed,
}

impl InvocationOutcome {
    fn as_label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Failed => "failed",
        }
    }
}

/// Mesh metrics
#[derive(Clone)]
pub struct MeshMetrics {
    registry: Registry,
    routing_decisions: IntCounterVec,
    routing_fallbacks: IntCounterVec,
    agent_invocations: IntCounterVec,
    agent_invocation_duration: Histogram,
    parallel_dropped: IntCounter,
    discovery_results: Histogram,
    heartbeat_failures: IntCounter,
}

impl std::fmt::Debug for MeshMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshMetrics").finish_non_exhaustive()
    }
}

impl MeshMetrics {
    /// Create and register all mesh metrics
    ///
    /// # Errors
    /// Returns error if a metric cannot be registered
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let routing_decisions = IntCounterVec::new(
            Opts::new("mesh_routing_decisions_total", "Routing decisions by strategy"),
            &["strategy"],
        )?;
        let routing_fallbacks = IntCounterVec::new(
            Opts::new("mesh_routing_fallbacks_total", "Routing fallbacks by reason"),
            &["reason"],
        )?;
        let agent_invocations = IntCounterVec::new(
            Opts::new("mesh_agent_invocations_total", "Agent invocations by outcome"),
            &["outcome"],
        )?;
        let agent_invocation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "mesh_agent_invocation_duration_seconds",
                "Agent invocation wall-clock duration",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;
        let parallel_dropped = IntCounter::new(
            "mesh_parallel_agents_dropped_total",
            "Agents dropped by PARALLEL truncation",
        )?;
        let discovery_results = Histogram::with_opts(
            HistogramOpts::new("mesh_discovery_results", "Descriptors returned per discovery")
                .buckets(vec![0.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0]),
        )?;
        let heartbeat_failures = IntCounter::new(
            "mesh_heartbeat_failures_total",
            "Failed directory heartbeat writes",
        )?;

        registry.register(Box::new(routing_decisions.clone()))?;
        registry.register(Box::new(routing_fallbacks.clone()))?;
        registry.register(Box::new(agent_invocations.clone()))?;
        registry.register(Box::new(agent_invocation_duration.clone()))?;
        registry.register(Box::new(parallel_dropped.clone()))?;
        registry.register(Box::new(discovery_results.clone()))?;
        registry.register(Box::new(heartbeat_failures.clone()))?;

        Ok(Self {
            registry,
            routing_decisions,
            routing_fallbacks,
            agent_invocations,
            agent_invocation_duration,
            parallel_dropped,
            discovery_results,
            heartbeat_failures,
        })
    }

    /// Record a routing decision
    pub fn record_routing_decision(&self, strategy: &str) {
        self.routing_decisions.with_label_values(&[strategy]).inc();
    }

    /// Record a routing fallback (`no_agents`, `llm_disabled`, `llm_failed`)
    pub fn record_routing_fallback(&self, reason: &str) {
        self.routing_fallbacks.with_label_values(&[reason]).inc();
    }

    /// Record one agent invocation
    pub fn record_invocation(&self, outcome: InvocationOutcome, duration: Duration) {
        self.agent_invocations
            .with_label_values(&[outcome.as_label()])
            .inc();
        self.agent_invocation_duration
            .observe(duration.as_secs_f64());
    }

    /// Record agents dropped by PARALLEL truncation
    pub fn record_parallel_dropped(&self, count: usize) {
        self.parallel_dropped.inc_by(count as u64);
    }

    /// Record the size of a discovery result
    pub fn record_discovery(&self, results: usize) {
        self.discovery_results.observe(results as f64);
    }

    /// Record a failed heartbeat write
    pub fn record_heartbeat_failure(&self) {
        self.heartbeat_failures.inc();
    }

    /// The underlying registry
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
