//! # Agent Mesh
//!
//! Runs one query through the agent mesh: discovers relevant agents,
//! routes across them and streams every agent message to stdout as one
//! JSON line.
//!
//! ## Usage
//!
//! ```bash
//! # Rule-based routing with the local hashing embedder
//! agent-mesh --config mesh.yaml "What is the status of PO-1042?"
//!
//! # Forward a session and bearer token to the agents
//! MESH_TOKEN=secret agent-mesh --session s-1 "Ship order 77"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use mesh_config::{load_config, MeshConfig};
use mesh_core::RequestContext;
use mesh_directory::{Directory, HeartbeatManager, HeartbeatTarget, MemoryAgentStore};
use mesh_orchestrator::{HttpAgentInvoker, Orchestrator};
use mesh_providers::{build_embedding_provider, build_inference_provider};
use mesh_routing::RoutingEngine;
use mesh_telemetry::{init_logging, MeshMetrics};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Route a query across the agent mesh
#[derive(Parser, Debug)]
#[command(name = "agent-mesh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(short, long, env = "MESH_CONFIG")]
    config: Option<PathBuf>,

    /// Session id forwarded to agents
    #[arg(short, long, env = "MESH_SESSION_ID")]
    session: Option<String>,

    /// Bearer token forwarded to agents
    #[arg(short, long, env = "MESH_TOKEN", default_value = "", hide_env_values = true)]
    token: String,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,

    /// The user query
    query: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = %e, "agent-mesh failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(&config.logging).context("failed to initialise logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        agents = config.agents.len(),
        "Starting agent mesh"
    );

    let metrics = Arc::new(MeshMetrics::new()?);
    let directory = build_directory(&config, &metrics)?;
    let orchestrator = build_orchestrator(&config, Arc::clone(&directory), &metrics)?;

    let mut heartbeats = Vec::with_capacity(config.agents.len());
    for descriptor in &config.agents {
        let registered = directory
            .register(descriptor.clone())
            .await
            .with_context(|| format!("failed to register agent '{}'", descriptor.agent_id))?;

        let target: Arc<dyn HeartbeatTarget> = directory.clone();
        let mut heartbeat =
            HeartbeatManager::new(registered.agent_id, config.heartbeat.interval, target)
                .with_metrics(Arc::clone(&metrics));
        heartbeat.start();
        heartbeats.push(heartbeat);
    }

    let session = cli
        .session
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let ctx = RequestContext::new(session, cli.token);
    info!(request_id = %ctx.request_id, session_id = %ctx.session_id, "Handling query");

    let outcome = stream_to_stdout(&orchestrator, cli.query, ctx).await;

    for heartbeat in &mut heartbeats {
        heartbeat.stop().await;
    }

    if cli.metrics {
        eprint!("{}", metrics.encode()?);
    }
    outcome
}

fn build_directory(config: &MeshConfig, metrics: &Arc<MeshMetrics>) -> Result<Arc<Directory>> {
    let embedder =
        build_embedding_provider(&config.embedding, config.directory.embedding_dimension)?;
    let directory = Directory::new(
        Arc::new(MemoryAgentStore::new()),
        embedder,
        &config.directory,
    )?
    .with_metrics(Arc::clone(metrics));
    Ok(Arc::new(directory))
}

fn build_orchestrator(
    config: &MeshConfig,
    directory: Arc<Directory>,
    metrics: &Arc<MeshMetrics>,
) -> Result<Orchestrator> {
    let mut router = RoutingEngine::new(&config.routing)?.with_metrics(Arc::clone(metrics));
    if let Some(inference) = build_inference_provider(&config.inference)? {
        router = router.with_inference(inference);
    }

    let invoker = HttpAgentInvoker::new(config.orchestrator.agent_timeout)?;
    let orchestrator = Orchestrator::new(
        directory,
        Arc::new(router),
        Arc::new(invoker),
        config.orchestrator.clone(),
        config.directory.top_k,
    )?
    .with_metrics(Arc::clone(metrics));
    Ok(orchestrator)
}

async fn stream_to_stdout(
    orchestrator: &Orchestrator,
    query: String,
    ctx: RequestContext,
) -> Result<()> {
    let mut messages = orchestrator.handle_request(query, ctx);
    let stdout = std::io::stdout();

    while let Some(message) = messages.next().await {
        let line = serde_json::to_string(message.as_value())?;
        let mut out = stdout.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
    }
    Ok(())
}
