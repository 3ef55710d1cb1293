//! Test fixtures: sample agents, a keyword embedder and a fully wired mesh

use async_trait::async_trait;
use mesh_config::{DirectoryConfig, OrchestratorConfig, RoutingConfig};
use mesh_core::{AgentDescriptor, EmbeddingProvider, InferenceProvider, MeshError, MeshResult};
use mesh_directory::{Directory, MemoryAgentStore};
use mesh_orchestrator::{HttpAgentInvoker, Orchestrator};
use mesh_routing::RoutingEngine;
use mesh_telemetry::MeshMetrics;
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

/// Fallback agent id used by every harness
pub const FALLBACK_AGENT_ID: &str = "general-agent";

/// Topic keywords; each owns one embedding dimension
pub const TOPICS: [&str; 3] = ["purchase", "invoice", "shipping"];

/// Dimension of [`KeywordEmbedder`] vectors: one per topic plus a bias term
pub const KEYWORD_DIMENSION: usize = TOPICS.len() + 1;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once)
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Embeds text by counting topic keywords.
///
/// Every vector carries a small bias so that text without keywords is still
/// non-zero. Text containing "unembeddable" fails.
#[derive(Debug, Clone, Default)]
pub struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> MeshResult<Vec<f32>> {
        let lower = text.to_lowercase();
        if lower.contains("unembeddable") {
            return Err(MeshError::embedding("keyword embedder refused the text"));
        }

        let mut vector: Vec<f32> = TOPICS
            .iter()
            .map(|topic| lower.matches(topic).count() as f32)
            .collect();
        vector.push(0.1);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        KEYWORD_DIMENSION
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Purchasing agent
pub fn purchase_agent(base_url: &str) -> AgentDescriptor {
    AgentDescriptor::new("purchase-agent", "Purchase Agent", base_url)
        .with_description("Creates and tracks purchase orders")
        .with_team("procurement")
        .with_capabilities(["create_purchase_order", "purchase_status"])
        .with_domains(["procurement"])
        .with_example_queries(["What is the status of purchase order 1042?"])
}

/// Accounts-payable agent
pub fn invoice_agent(base_url: &str) -> AgentDescriptor {
    AgentDescriptor::new("invoice-agent", "Invoice Agent", base_url)
        .with_description("Matches and pays supplier invoices")
        .with_team("finance")
        .with_capabilities(["invoice_matching", "invoice_payment"])
        .with_domains(["accounts payable"])
        .with_example_queries(["Has invoice 77 been paid?"])
}

/// Logistics agent
pub fn shipping_agent(base_url: &str) -> AgentDescriptor {
    AgentDescriptor::new("shipping-agent", "Shipping Agent", base_url)
        .with_description("Books shipping and tracks deliveries")
        .with_team("logistics")
        .with_capabilities(["book_shipping", "track_shipping"])
        .with_domains(["logistics"])
}

/// Catch-all agent used as the routing fallback
pub fn general_agent(base_url: &str) -> AgentDescriptor {
    AgentDescriptor::new(FALLBACK_AGENT_ID, "General Agent", base_url)
        .with_description("Answers anything else")
}

/// Knobs for [`Mesh::build`]
#[derive(Clone)]
pub struct MeshOptions {
    /// Directory settings; the embedding dimension is forced to the keyword embedder's
    pub directory: DirectoryConfig,
    /// Orchestrator settings
    pub orchestrator: OrchestratorConfig,
    /// Whether LLM routing is enabled
    pub llm_routing: bool,
    /// Inference provider for LLM routing
    pub inference: Option<Arc<dyn InferenceProvider>>,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig::default(),
            orchestrator: OrchestratorConfig::default().with_agent_timeout(Duration::from_secs(5)),
            llm_routing: false,
            inference: None,
        }
    }
}

/// A fully wired mesh over an in-memory store and real HTTP invoker
pub struct Mesh {
    /// Agent directory
    pub directory: Arc<Directory>,
    /// Routing engine
    pub router: Arc<RoutingEngine>,
    /// Orchestrator
    pub orchestrator: Orchestrator,
    /// Shared metrics
    pub metrics: Arc<MeshMetrics>,
}

impl Mesh {
    /// Build a mesh with default options
    pub fn new() -> Self {
        Self::build(MeshOptions::default())
    }

    /// Build a mesh from `options`
    pub fn build(options: MeshOptions) -> Self {
        init_tracing();
        let metrics = Arc::new(MeshMetrics::new().expect("metrics registry"));

        let directory_config = options.directory.with_embedding_dimension(KEYWORD_DIMENSION);
        let directory = Arc::new(
            Directory::new(
                Arc::new(MemoryAgentStore::new()),
                Arc::new(KeywordEmbedder),
                &directory_config,
            )
            .expect("directory")
            .with_metrics(Arc::clone(&metrics)),
        );

        let routing_config = RoutingConfig::new(FALLBACK_AGENT_ID).with_llm_routing(options.llm_routing);
        let mut router = RoutingEngine::new(&routing_config)
            .expect("routing engine")
            .with_metrics(Arc::clone(&metrics));
        if let Some(inference) = options.inference {
            router = router.with_inference(inference);
        }
        let router = Arc::new(router);

        let invoker = HttpAgentInvoker::new(options.orchestrator.agent_timeout).expect("invoker");
        let orchestrator = Orchestrator::new(
            Arc::clone(&directory),
            Arc::clone(&router),
            Arc::new(invoker),
            options.orchestrator,
            directory_config.top_k,
        )
        .expect("orchestrator")
        .with_metrics(Arc::clone(&metrics));

        Self {
            directory,
            router,
            orchestrator,
            metrics,
        }
    }

    /// Register every descriptor, panicking on failure
    pub async fn register_all(&self, descriptors: impl IntoIterator<Item = AgentDescriptor>) {
        for descriptor in descriptors {
            self.directory
                .register(descriptor)
                .await
                .expect("registration");
        }
    }

    /// Ids of the agents discovered for `query`, best first
    pub async fn discovered_ids(&self, query: &str, top_k: usize) -> Vec<String> {
        self.directory
            .discover(query, top_k)
            .await
            .expect("discovery")
            .into_iter()
            .map(|d| d.agent_id)
            .collect()
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
