//! Periodic heartbeat task keeping one agent's registration alive.

use crate::directory::Directory;
use async_trait::async_trait;
use mesh_core::MeshResult;
use mesh_telemetry::MeshMetrics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Something that accepts heartbeats
#[async_trait]
pub trait HeartbeatTarget: Send + Sync {
    /// Renew `agent_id`; returns whether the agent was present
    async fn heartbeat(&self, agent_id: &str) -> MeshResult<bool>;
}

#[async_trait]
impl HeartbeatTarget for Directory {
    async fn heartbeat(&self, agent_id: &str) -> MeshResult<bool> {
        Directory::heartbeat(self, agent_id).await
    }
}

/// A named, cancellable periodic heartbeat bound to one agent.
///
/// Failed heartbeats are logged and counted; the loop carries on at the
/// same interval.
pub struct HeartbeatManager {
    agent_id: String,
    interval: Duration,
    target: Arc<dyn HeartbeatTarget>,
    metrics: Option<Arc<MeshMetrics>>,
    running: Arc<AtomicBool>,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for HeartbeatManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatManager")
            .field("agent_id", &self.agent_id)
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl HeartbeatManager {
    /// Create a stopped manager
    pub fn new(
        agent_id: impl Into<String>,
        interval: Duration,
        target: Arc<dyn HeartbeatTarget>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            interval,
            target,
            metrics: None,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: None,
            handle: None,
        }
    }

    /// Attach metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MeshMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Agent this manager heartbeats for
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Whether the loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the loop. The first heartbeat is sent immediately.
    ///
    /// Calling `start` on a running manager does nothing.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        let agent_id = self.agent_id.clone();
        let interval = self.interval;
        let target = Arc::clone(&self.target);
        let metrics = self.metrics.clone();
        let running = Arc::clone(&self.running);

        let handle = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                match target.heartbeat(&agent_id).await {
                    Ok(true) => debug!(agent_id = %agent_id, "Heartbeat sent"),
                    Ok(false) => debug!(agent_id = %agent_id, "Heartbeat target reports agent absent"),
                    Err(e) => {
                        warn!(agent_id = %agent_id, error = %e, "Heartbeat failed");
                        if let Some(metrics) = &metrics {
                            metrics.record_heartbeat_failure();
                        }
                    }
                }

                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    _ = rx.changed() => break,
                }
            }
            debug!(agent_id = %agent_id, "Heartbeat loop exited");
        });

        self.shutdown = Some(tx);
        self.handle = Some(handle);
        info!(agent_id = %self.agent_id, interval_ms = self.interval.as_millis() as u64, "Heartbeat started");
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// No heartbeat is sent after this returns. Stopping a stopped manager
    /// does nothing.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(agent_id = %self.agent_id, error = %e, "Heartbeat task ended abnormally");
            }
            info!(agent_id = %self.agent_id, "Heartbeat stopped");
        }
    }
}

impl Drop for HeartbeatManager {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
