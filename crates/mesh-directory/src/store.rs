//! Storage backends for agent descriptors and their embedding vectors.
//!
//! A store keeps two independent TTL-bounded records per agent: the JSON
//! descriptor and the embedding vector. Either may expire (or be missing)
//! without the other; the directory treats a vector hit without a
//! descriptor as "not found".

use crate::similarity::cosine_similarity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mesh_core::{AgentDescriptor, MeshResult};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A vector search hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAgent {
    /// Agent id of the stored vector
    pub agent_id: String,
    /// Cosine similarity to the query vector
    pub score: f32,
}

/// Ordering used for all search results: score descending, then agent id
/// ascending so equal scores are deterministic.
pub(crate) fn rank(a: &ScoredAgent, b: &ScoredAgent) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.agent_id.cmp(&b.agent_id))
}

/// Backend for descriptor and vector records
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Upsert a descriptor record with the given TTL
    async fn put_descriptor(&self, descriptor: &AgentDescriptor, ttl: Duration) -> MeshResult<()>;

    /// Upsert a vector record with the given TTL
    async fn put_vector(&self, agent_id: &str, vector: Vec<f32>, ttl: Duration) -> MeshResult<()>;

    /// Fetch a live descriptor
    async fn get_descriptor(&self, agent_id: &str) -> MeshResult<Option<AgentDescriptor>>;

    /// Refresh both records of a live agent and stamp its heartbeat.
    ///
    /// `last_heartbeat` becomes `max(now, registered_at)`. Returns `false`
    /// when no live descriptor exists.
    async fn touch(&self, agent_id: &str, ttl: Duration, now: DateTime<Utc>) -> MeshResult<bool>;

    /// Set the health flag of a live descriptor without touching its TTL.
    /// Returns `false` when no live descriptor exists.
    async fn set_health(&self, agent_id: &str, is_healthy: bool) -> MeshResult<bool>;

    /// Delete both records; absent records are not an error
    async fn remove(&self, agent_id: &str) -> MeshResult<()>;

    /// All live descriptors, in no particular order
    async fn list_descriptors(&self) -> MeshResult<Vec<AgentDescriptor>>;

    /// Up to `limit` live vectors nearest to `query`
    async fn nearest(&self, query: &[f32], limit: usize) -> MeshResult<Vec<ScoredAgent>>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    fn refresh(&mut self, ttl: Duration) {
        self.expires_at = Instant::now() + ttl;
    }
}

/// In-process store.
///
/// Expiry is measured with [`tokio::time::Instant`], so tests running on a
/// paused clock can advance past a TTL deterministically. Expired records
/// are invisible immediately and swept on the next write.
#[derive(Debug, Clone, Default)]
pub struct MemoryAgentStore {
    descriptors: Arc<RwLock<HashMap<String, Expiring<AgentDescriptor>>>>,
    vectors: Arc<RwLock<HashMap<String, Expiring<Vec<f32>>>>>,
}

impl MemoryAgentStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live descriptor records
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.descriptors
            .read()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Whether no live descriptor records exist
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self) {
        let now = Instant::now();
        self.descriptors.write().retain(|_, entry| entry.is_live(now));
        self.vectors.write().retain(|_, entry| entry.is_live(now));
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn put_descriptor(&self, descriptor: &AgentDescriptor, ttl: Duration) -> MeshResult<()> {
        self.sweep();
        self.descriptors.write().insert(
            descriptor.agent_id.clone(),
            Expiring::new(descriptor.clone(), ttl),
        );
        Ok(())
    }

    async fn put_vector(&self, agent_id: &str, vector: Vec<f32>, ttl: Duration) -> MeshResult<()> {
        self.vectors
            .write()
            .insert(agent_id.to_string(), Expiring::new(vector, ttl));
        Ok(())
    }

    async fn get_descriptor(&self, agent_id: &str) -> MeshResult<Option<AgentDescriptor>> {
        let now = Instant::now();
        Ok(self
            .descriptors
            .read()
            .get(agent_id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn touch(&self, agent_id: &str, ttl: Duration, now: DateTime<Utc>) -> MeshResult<bool> {
        let clock = Instant::now();
        {
            let mut descriptors = self.descriptors.write();
            match descriptors.get_mut(agent_id) {
                Some(entry) if entry.is_live(clock) => {
                    entry.value.last_heartbeat = now.max(entry.value.registered_at);
                    entry.refresh(ttl);
                }
                _ => return Ok(false),
            }
        }

        if let Some(entry) = self.vectors.write().get_mut(agent_id) {
            if entry.is_live(clock) {
                entry.refresh(ttl);
            }
        }

        Ok(true)
    }

    async fn set_health(&self, agent_id: &str, is_healthy: bool) -> MeshResult<bool> {
        let now = Instant::now();
        let mut descriptors = self.descriptors.write();
        match descriptors.get_mut(agent_id) {
            Some(entry) if entry.is_live(now) => {
                entry.value.is_healthy = is_healthy;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, agent_id: &str) -> MeshResult<()> {
        self.descriptors.write().remove(agent_id);
        self.vectors.write().remove(agent_id);
        Ok(())
    }

    async fn list_descriptors(&self) -> MeshResult<Vec<AgentDescriptor>> {
        let now = Instant::now();
        Ok(self
            .descriptors
            .read()
            .values()
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
            .collect())
    }

    async fn nearest(&self, query: &[f32], limit: usize) -> MeshResult<Vec<ScoredAgent>> {
        let now = Instant::now();
        let mut scored: Vec<ScoredAgent> = self
            .vectors
            .read()
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(agent_id, entry)| ScoredAgent {
                agent_id: agent_id.clone(),
                score: cosine_similarity(query, &entry.value),
            })
            .collect();

        scored.sort_by(rank);
        scored.truncate(limit);
        Ok(scored)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
