//! Request orchestration: discover, route, execute.

use crate::invoker::AgentInvoker;
use async_stream::stream;
use futures::future::join_all;
use futures::{FutureExt, StreamExt};
use mesh_config::OrchestratorConfig;
use mesh_core::{
    AgentDescriptor, AgentInvocationResult, AgentMessage, MeshError, MeshResult, MessageStream,
    RequestContext, RoutingDecision, RoutingStrategy,
};
use mesh_directory::Directory;
use mesh_routing::RoutingEngine;
use mesh_telemetry::{InvocationOutcome, MeshMetrics};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Executes routing decisions against the directory.
///
/// Cheap to clone; every stream it returns owns a clone, so streams are
/// `'static` and dropping one cancels all work it started.
#[derive(Clone)]
pub struct Orchestrator {
    directory: Arc<Directory>,
    router: Arc<RoutingEngine>,
    invoker: Arc<dyn AgentInvoker>,
    config: Arc<OrchestratorConfig>,
    top_k: usize,
    metrics: Option<Arc<MeshMetrics>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("top_k", &self.top_k)
            .field("max_parallel_agents", &self.config.max_parallel_agents)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator.
    ///
    /// # Errors
    /// Returns a configuration error on a zero `top_k` or fan-out limit
    pub fn new(
        directory: Arc<Directory>,
        router: Arc<RoutingEngine>,
        invoker: Arc<dyn AgentInvoker>,
        config: OrchestratorConfig,
        top_k: usize,
    ) -> MeshResult<Self> {
        if top_k == 0 {
            return Err(MeshError::configuration("top_k must be greater than zero"));
        }
        if config.max_parallel_agents == 0 {
            return Err(MeshError::configuration(
                "max_parallel_agents must be greater than zero",
            ));
        }

        Ok(Self {
            directory,
            router,
            invoker,
            config: Arc::new(config),
            top_k,
            metrics: None,
        })
    }

    /// Attach metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MeshMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The directory this orchestrator reads from
    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    /// Answer `query`, streaming every message back to the caller.
    ///
    /// The stream always terminates and never fails: discovery failures fall
    /// back to the routing fallback agent, agent failures become messages.
    pub fn handle_request(&self, query: impl Into<String>, ctx: RequestContext) -> MessageStream {
        let this = self.clone();
        let query = query.into();

        stream! {
            info!(request_id = %ctx.request_id, session_id = %ctx.session_id, "Handling request");

            let discovered = match this.directory.discover(&query, this.top_k).await {
                Ok(discovered) => discovered,
                Err(e) => {
                    warn!(request_id = %ctx.request_id, error = %e, "Discovery failed, routing without candidates");
                    Vec::new()
                }
            };

            let decision = this.router.route(&query, &discovered).await;
            let mut messages = this.execute(decision, query, ctx);
            while let Some(message) = messages.next().await {
                yield message;
            }
        }
        .boxed()
    }

    /// Execute an already-made decision
    pub fn execute(
        &self,
        decision: RoutingDecision,
        query: String,
        ctx: RequestContext,
    ) -> MessageStream {
        debug!(strategy = %decision.strategy, agents = ?decision.agents, "Executing decision");
        match decision.strategy {
            RoutingStrategy::Single => self.execute_single(decision.agents, query, ctx),
            RoutingStrategy::Parallel => self.execute_parallel(decision.agents, query, ctx),
            RoutingStrategy::Sequential => self.execute_sequential(decision.agents, query, ctx),
        }
    }

    fn execute_single(&self, agents: Vec<String>, query: String, ctx: RequestContext) -> MessageStream {
        let this = self.clone();

        stream! {
            let agent_id = match agents.into_iter().next() {
                Some(agent_id) => agent_id,
                None => {
                    yield AgentMessage::error("routing decision names no agents");
                    return;
                }
            };

            let agent = match this.resolve(&agent_id).await {
                Ok(agent) => agent,
                Err(message) => {
                    this.record(InvocationOutcome::NotFound, Duration::ZERO);
                    yield AgentMessage::error(message);
                    return;
                }
            };

            let started = Instant::now();
            let mut failed = false;
            let mut messages = this.invoker.call(&agent, &query, &ctx);
            while let Some(message) = messages.next().await {
                failed |= message.is_error();
                yield message;
            }
            this.record_completion(&agent_id, failed, started.elapsed());
        }
        .boxed()
    }

    fn execute_parallel(&self, agents: Vec<String>, query: String, ctx: RequestContext) -> MessageStream {
        let this = self.clone();

        stream! {
            let retained = this.retain_parallel(&agents);
            let mut results = this.invoke_all(&retained, &query, &ctx).await;
            for agent_id in &retained {
                if let Some(result) = results.remove(agent_id) {
                    yield result.to_message();
                }
            }
        }
        .boxed()
    }

    /// Invoke up to `max_parallel_agents` agents concurrently and collect one
    /// result per retained agent, keyed by agent id.
    ///
    /// Duplicate ids are invoked once. A failure of one agent (missing,
    /// transport error, timeout, panic) never affects its siblings.
    pub async fn run_parallel(
        &self,
        agents: &[String],
        query: &str,
        ctx: &RequestContext,
    ) -> HashMap<String, AgentInvocationResult> {
        let retained = self.retain_parallel(agents);
        self.invoke_all(&retained, query, ctx).await
    }

    fn retain_parallel(&self, agents: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut unique: Vec<String> = agents
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let limit = self.config.max_parallel_agents;
        if unique.len() > limit {
            let dropped = unique.split_off(limit);
            warn!(limit, dropped = ?dropped, "PARALLEL decision truncated");
            if let Some(metrics) = &self.metrics {
                metrics.record_parallel_dropped(dropped.len());
            }
        }
        unique
    }

    async fn invoke_all(
        &self,
        agents: &[String],
        query: &str,
        ctx: &RequestContext,
    ) -> HashMap<String, AgentInvocationResult> {
        let invocations = agents.iter().map(|agent_id| async move {
            match AssertUnwindSafe(self.invoke_collect(agent_id, query, ctx))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(agent_id = %agent_id, "Agent invocation panicked");
                    AgentInvocationResult::failure(agent_id.as_str(), "agent invocation panicked", 0)
                }
            }
        });

        join_all(invocations)
            .await
            .into_iter()
            .map(|result| (result.agent_id.clone(), result))
            .collect()
    }

    async fn invoke_collect(
        &self,
        agent_id: &str,
        query: &str,
        ctx: &RequestContext,
    ) -> AgentInvocationResult {
        let started = Instant::now();

        let agent = match self.resolve(agent_id).await {
            Ok(agent) => agent,
            Err(message) => {
                self.record(InvocationOutcome::NotFound, Duration::ZERO);
                return AgentInvocationResult::failure(agent_id, message, 0);
            }
        };

        let messages: Vec<AgentMessage> = self.invoker.call(&agent, query, ctx).collect().await;
        let elapsed = started.elapsed();
        let latency_ms = elapsed.as_millis() as u64;

        let error = messages
            .iter()
            .find_map(AgentMessage::error_message)
            .map(str::to_string);

        self.record_completion(agent_id, error.is_some(), elapsed);
        match error {
            Some(error) => AgentInvocationResult::failure(agent_id, error, latency_ms),
            None => AgentInvocationResult::success(agent_id, collect_response(messages), latency_ms),
        }
    }

    fn execute_sequential(&self, agents: Vec<String>, query: String, ctx: RequestContext) -> MessageStream {
        let this = self.clone();

        stream! {
            let mut answers: Vec<(String, String)> = Vec::new();

            for agent_id in agents {
                let agent = match this.resolve(&agent_id).await {
                    Ok(agent) => agent,
                    Err(message) => {
                        this.record(InvocationOutcome::NotFound, Duration::ZERO);
                        warn!(agent_id = %agent_id, "Skipping missing agent in sequence");
                        yield AgentMessage::error(message);
                        continue;
                    }
                };

                let step_query = with_context(&query, &this.config.sequential_context_header, &answers);
                let started = Instant::now();
                let mut failed = false;
                let mut text = String::new();

                let mut messages = this.invoker.call(&agent, &step_query, &ctx);
                while let Some(message) = messages.next().await {
                    failed |= message.is_error();
                    if let Some(content) = message.assistant_content() {
                        text.push_str(content);
                    }
                    yield message;
                }

                this.record_completion(&agent_id, failed, started.elapsed());
                if !text.is_empty() {
                    answers.push((agent_id, text));
                }
            }
        }
        .boxed()
    }

    /// Look up an agent, rendering absence or a store failure as the error
    /// message delivered to the caller.
    async fn resolve(&self, agent_id: &str) -> Result<AgentDescriptor, String> {
        match self.directory.get(agent_id).await {
            Ok(Some(agent)) => Ok(agent),
            Ok(None) => {
                debug!(agent_id, "Agent not found");
                Err(format!("agent '{agent_id}' not found"))
            }
            Err(e) => {
                warn!(agent_id, error = %e, "Directory lookup failed");
                Err(format!("agent '{agent_id}' lookup failed: {e}"))
            }
        }
    }

    /// Check an agent's health endpoint and record the result in the
    /// directory. Returns `None` if the agent is not registered.
    ///
    /// # Errors
    /// Returns error if the directory read or write fails
    pub async fn refresh_health(&self, agent_id: &str) -> MeshResult<Option<bool>> {
        let Some(agent) = self.directory.get(agent_id).await? else {
            return Ok(None);
        };
        let healthy = self.invoker.health_check(&agent).await;
        if healthy != agent.is_healthy {
            self.directory.set_health(agent_id, healthy).await?;
        }
        Ok(Some(healthy))
    }

    fn record_completion(&self, agent_id: &str, failed: bool, elapsed: Duration) {
        let outcome = if failed {
            InvocationOutcome::Failed
        } else {
            InvocationOutcome::Success
        };
        debug!(agent_id, ?outcome, latency_ms = elapsed.as_millis() as u64, "Agent invocation finished");
        self.record(outcome, elapsed);
    }

    fn record(&self, outcome: InvocationOutcome, elapsed: Duration) {
        if let Some(metrics) = &self.metrics {
            metrics.record_invocation(outcome, elapsed);
        }
    }
}

/// The query sent to a SEQUENTIAL step: the original query followed by the
/// answers collected so far.
pub fn with_context(query: &str, header: &str, answers: &[(String, String)]) -> String {
    if answers.is_empty() {
        return query.to_string();
    }

    let mut augmented = format!("{query}\n\n{header}");
    for (agent_id, text) in answers {
        augmented.push('\n');
        augmented.push_str(agent_id);
        augmented.push_str(": ");
        augmented.push_str(text);
    }
    augmented
}

/// PARALLEL response payload: concatenated assistant text when the agent
/// produced any, otherwise every payload as a JSON array.
fn collect_response(messages: Vec<AgentMessage>) -> Value {
    let text: String = messages
        .iter()
        .filter_map(AgentMessage::assistant_content)
        .collect();

    if text.is_empty() {
        Value::Array(messages.into_iter().map(AgentMessage::into_value).collect())
    } else {
        Value::String(text)
    }
}
