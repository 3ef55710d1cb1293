//! Routing engine: `(query, ranked descriptors)` -> [`RoutingDecision`].

use crate::parse::{parse_decision, truncate_chars};
use crate::prompt::routing_prompt;
use mesh_config::RoutingConfig;
use mesh_core::{AgentDescriptor, InferenceProvider, MeshError, MeshResult, RoutingDecision};
use mesh_directory::routing_summary;
use mesh_telemetry::MeshMetrics;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Reasoning for the empty-discovery fallback
pub const FALLBACK_REASONING: &str = "no relevant agents found, using fallback";

/// Reasoning for the rule-based choice among several candidates
pub const RULE_BASED_REASONING: &str = "rule-based: top similarity";

/// Chooses an execution strategy and agent list for a query.
///
/// Pure decision logic: it never invokes agents and never fails. Every
/// degraded path is recorded in the decision's reasoning.
#[derive(Clone)]
pub struct RoutingEngine {
    fallback_agent_id: String,
    llm_routing: bool,
    max_reasoning_chars: usize,
    inference: Option<Arc<dyn InferenceProvider>>,
    metrics: Option<Arc<MeshMetrics>>,
}

impl std::fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("fallback_agent_id", &self.fallback_agent_id)
            .field("llm_routing", &self.llm_routing)
            .field("inference", &self.inference.as_ref().map(|p| p.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl RoutingEngine {
    /// Create an engine without an inference provider.
    ///
    /// # Errors
    /// Returns a configuration error when no fallback agent id is configured
    pub fn new(config: &RoutingConfig) -> MeshResult<Self> {
        let fallback_agent_id = config.fallback_agent_id.trim();
        if fallback_agent_id.is_empty() {
            return Err(MeshError::configuration("a fallback agent id is required"));
        }

        Ok(Self {
            fallback_agent_id: fallback_agent_id.to_string(),
            llm_routing: config.llm_routing,
            max_reasoning_chars: config.max_reasoning_chars.max(1),
            inference: None,
            metrics: None,
        })
    }

    /// Attach the inference provider used for LLM-assisted routing
    #[must_use]
    pub fn with_inference(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        self.inference = Some(provider);
        self
    }

    /// Attach metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MeshMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Configured fallback agent
    pub fn fallback_agent_id(&self) -> &str {
        &self.fallback_agent_id
    }

    /// Whether LLM-assisted routing will be attempted for multi-agent matches
    pub fn llm_routing_enabled(&self) -> bool {
        self.llm_routing && self.inference.is_some()
    }

    /// Decide how to answer `query` given `discovered`, ranked best first.
    #[instrument(skip(self, query, discovered), fields(candidates = discovered.len()))]
    pub async fn route(&self, query: &str, discovered: &[AgentDescriptor]) -> RoutingDecision {
        let decision = match discovered {
            [] => {
                self.record_fallback("no_agents");
                RoutingDecision::single(self.fallback_agent_id.clone(), FALLBACK_REASONING)
            }
            [only] => RoutingDecision::single(
                only.agent_id.clone(),
                format!("only matching agent: {} ({})", only.name, only.agent_id),
            ),
            [top, ..] => match &self.inference {
                Some(provider) if self.llm_routing => {
                    self.route_with_llm(provider.as_ref(), query, top, discovered)
                        .await
                }
                _ => {
                    self.record_fallback("llm_disabled");
                    RoutingDecision::single(top.agent_id.clone(), RULE_BASED_REASONING)
                }
            },
        };

        info!(
            strategy = %decision.strategy,
            agents = ?decision.agents,
            reasoning = %decision.reasoning,
            "Routing decision"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_routing_decision(decision.strategy.as_str());
        }
        decision
    }

    async fn route_with_llm(
        &self,
        provider: &dyn InferenceProvider,
        query: &str,
        top: &AgentDescriptor,
        discovered: &[AgentDescriptor],
    ) -> RoutingDecision {
        let turns = routing_prompt(query, &routing_summary(discovered));

        let result = match provider.complete(&turns).await {
            Ok(completion) => {
                debug!(provider = provider.name(), chars = completion.len(), "Routing completion received");
                parse_decision(&completion, discovered, self.max_reasoning_chars)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(decision) => decision,
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "LLM routing failed, using top similarity");
                self.record_fallback("llm_failed");
                let reasoning = format!("{RULE_BASED_REASONING} (LLM routing failed: {e})");
                RoutingDecision::single(
                    top.agent_id.clone(),
                    truncate_chars(&reasoning, self.max_reasoning_chars),
                )
            }
        }
    }

    fn record_fallback(&self, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_routing_fallback(reason);
        }
    }
}
