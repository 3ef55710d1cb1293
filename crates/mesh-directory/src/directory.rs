//! The agent directory: registration, liveness and semantic discovery.

use crate::store::{AgentStore, ScoredAgent};
use crate::summary::{embedding_text, routing_summary};
use chrono::Utc;
use mesh_config::DirectoryConfig;
use mesh_core::{AgentDescriptor, EmbeddingProvider, MeshError, MeshResult};
use mesh_telemetry::MeshMetrics;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Vector candidates fetched per requested result, so that unhealthy or
/// half-written entries can be skipped without starving the result.
const CANDIDATE_OVERSAMPLE: usize = 4;

/// Authoritative store of agent descriptors and their embedding vectors.
///
/// The directory is the only component that mutates descriptor or vector
/// records. Every read hands out an owned copy.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn AgentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    ttl: Duration,
    dimension: usize,
    metrics: Option<Arc<MeshMetrics>>,
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("store", &self.store.name())
            .field("embedder", &self.embedder.name())
            .field("ttl", &self.ttl)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl Directory {
    /// Create a directory over `store`, embedding with `embedder`.
    ///
    /// # Errors
    /// Returns a configuration error if the configured dimension is zero or
    /// differs from the embedder's dimension
    pub fn new(
        store: Arc<dyn AgentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &DirectoryConfig,
    ) -> MeshResult<Self> {
        if config.embedding_dimension == 0 {
            return Err(MeshError::configuration(
                "embedding dimension must be greater than zero",
            ));
        }
        if embedder.dimension() != config.embedding_dimension {
            return Err(MeshError::configuration(format!(
                "embedding provider '{}' produces {} dimensions, directory expects {}",
                embedder.name(),
                embedder.dimension(),
                config.embedding_dimension
            )));
        }

        Ok(Self {
            store,
            embedder,
            ttl: config.ttl,
            dimension: config.embedding_dimension,
            metrics: None,
        })
    }

    /// Attach metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MeshMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Record time-to-live
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn embed(&self, text: &str) -> MeshResult<Vec<f32>> {
        let vector = self.embedder.embed(text).await?;
        if vector.len() != self.dimension {
            return Err(MeshError::embedding(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(vector)
    }

    /// Register (or re-register) an agent.
    ///
    /// Timestamps supplied by the caller are replaced with "now". Any prior
    /// registration under the same id is overwritten. Returns the stored copy.
    ///
    /// # Errors
    /// Returns error if embedding or either store write fails
    #[instrument(skip(self, descriptor), fields(agent_id = %descriptor.agent_id))]
    pub async fn register(&self, mut descriptor: AgentDescriptor) -> MeshResult<AgentDescriptor> {
        let now = Utc::now();
        descriptor.registered_at = now;
        descriptor.last_heartbeat = now;

        let vector = self.embed(&embedding_text(&descriptor)).await?;

        // Descriptor first: a vector without a descriptor is skipped by discovery.
        self.store.put_descriptor(&descriptor, self.ttl).await?;
        if let Err(e) = self
            .store
            .put_vector(&descriptor.agent_id, vector, self.ttl)
            .await
        {
            // Half-written registrations are addressable but never discoverable.
            if let Err(cleanup) = self.store.remove(&descriptor.agent_id).await {
                warn!(
                    agent_id = %descriptor.agent_id,
                    error = %cleanup,
                    "Failed to remove descriptor after vector write failure"
                );
            }
            return Err(e);
        }

        info!(
            agent_id = %descriptor.agent_id,
            name = %descriptor.name,
            ttl_secs = self.ttl.as_secs(),
            "Agent registered"
        );
        Ok(descriptor)
    }

    /// Remove an agent. Removing an unknown id is not an error.
    ///
    /// # Errors
    /// Returns error if the store delete fails
    #[instrument(skip(self))]
    pub async fn unregister(&self, agent_id: &str) -> MeshResult<()> {
        self.store.remove(agent_id).await?;
        info!(agent_id, "Agent unregistered");
        Ok(())
    }

    /// Refresh an agent's TTL and stamp its heartbeat.
    ///
    /// Returns `false` if the agent is absent (never registered or already
    /// expired); that race is expected and not an error.
    ///
    /// # Errors
    /// Returns error if the store write fails
    pub async fn heartbeat(&self, agent_id: &str) -> MeshResult<bool> {
        let refreshed = self.store.touch(agent_id, self.ttl, Utc::now()).await?;
        if refreshed {
            debug!(agent_id, "Heartbeat recorded");
        } else {
            debug!(agent_id, "Heartbeat for absent agent ignored");
        }
        Ok(refreshed)
    }

    /// Fetch a copy of a live descriptor
    ///
    /// # Errors
    /// Returns error if the store read fails
    pub async fn get(&self, agent_id: &str) -> MeshResult<Option<AgentDescriptor>> {
        self.store.get_descriptor(agent_id).await
    }

    /// Mark an agent healthy or unhealthy without touching its TTL.
    ///
    /// Returns `false` if the agent is absent.
    ///
    /// # Errors
    /// Returns error if the store write fails
    #[instrument(skip(self))]
    pub async fn set_health(&self, agent_id: &str, is_healthy: bool) -> MeshResult<bool> {
        let updated = self.store.set_health(agent_id, is_healthy).await?;
        if updated {
            info!(agent_id, is_healthy, "Agent health updated");
        }
        Ok(updated)
    }

    /// Find up to `top_k` healthy agents semantically closest to `query`.
    ///
    /// Results are ordered by similarity descending, ties broken by
    /// ascending agent id.
    ///
    /// # Errors
    /// Embedding failures propagate. Store failures are logged and yield an
    /// empty result so the caller can still fall back.
    #[instrument(skip(self, query))]
    pub async fn discover(&self, query: &str, top_k: usize) -> MeshResult<Vec<AgentDescriptor>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embed(query).await?;

        let results = match self.resolve(&vector, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Discovery store failure, treating as no agents found");
                Vec::new()
            }
        };

        debug!(results = results.len(), "Discovery complete");
        if let Some(metrics) = &self.metrics {
            metrics.record_discovery(results.len());
        }
        Ok(results)
    }

    async fn resolve(&self, vector: &[f32], top_k: usize) -> MeshResult<Vec<AgentDescriptor>> {
        let candidates = self
            .store
            .nearest(vector, top_k.saturating_mul(CANDIDATE_OVERSAMPLE))
            .await?;

        let mut results = Vec::with_capacity(top_k);
        for ScoredAgent { agent_id, score } in candidates {
            match self.store.get_descriptor(&agent_id).await? {
                Some(descriptor) if descriptor.is_healthy => {
                    debug!(agent_id = %agent_id, score, "Discovery candidate accepted");
                    results.push(descriptor);
                    if results.len() == top_k {
                        break;
                    }
                }
                Some(_) => debug!(agent_id = %agent_id, "Skipping unhealthy agent"),
                None => debug!(agent_id = %agent_id, "Skipping vector without descriptor"),
            }
        }
        Ok(results)
    }

    /// Every live descriptor, sorted by agent id
    ///
    /// # Errors
    /// Returns error if the store read fails
    pub async fn list_all(&self) -> MeshResult<Vec<AgentDescriptor>> {
        let mut descriptors = self.store.list_descriptors().await?;
        descriptors.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(descriptors)
    }

    /// Routing prompt text for `descriptors`
    #[must_use]
    pub fn routing_summary(&self, descriptors: &[AgentDescriptor]) -> String {
        routing_summary(descriptors)
    }
}
