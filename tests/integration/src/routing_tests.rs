//! Routing integration tests
//!
//! Decisions made over real discovery results, with and without an
//! OpenAI-compatible inference server behind LLM routing.

use crate::fixtures::*;
use crate::mock_agents::*;
use mesh_core::{InferenceProvider, RoutingStrategy};
use mesh_providers::{OpenAiConfig, OpenAiInferenceProvider};
use mesh_routing::{FALLBACK_REASONING, RULE_BASED_REASONING};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const URL: &str = "http://agents.internal";

async fn llm_mesh(inference: &MockInference) -> Mesh {
    let provider: Arc<dyn InferenceProvider> = Arc::new(
        OpenAiInferenceProvider::new(OpenAiConfig::new(inference.endpoint(), "gpt-4o-mini"))
            .unwrap(),
    );
    let mesh = Mesh::build(MeshOptions {
        llm_routing: true,
        inference: Some(provider),
        ..MeshOptions::default()
    });
    mesh.register_all([purchase_agent(URL), invoice_agent(URL), shipping_agent(URL)])
        .await;
    mesh
}

#[tokio::test]
async fn test_no_agents_routes_to_fallback() {
    let mesh = Mesh::new();
    let discovered = mesh.directory.discover("anything", 5).await.unwrap();

    let decision = mesh.router.route("anything", &discovered).await;

    assert_eq!(decision.strategy, RoutingStrategy::Single);
    assert_eq!(decision.agents, vec![FALLBACK_AGENT_ID]);
    assert_eq!(decision.reasoning, FALLBACK_REASONING);
    assert!(mesh
        .metrics
        .encode()
        .unwrap()
        .contains("mesh_routing_fallbacks_total{reason=\"no_agents\"} 1"));
}

#[tokio::test]
async fn test_single_candidate_is_chosen_directly() {
    let mesh = Mesh::new();
    mesh.register_all([shipping_agent(URL)]).await;
    let discovered = mesh.directory.discover("book shipping", 5).await.unwrap();

    let decision = mesh.router.route("book shipping", &discovered).await;

    assert_eq!(decision.strategy, RoutingStrategy::Single);
    assert_eq!(decision.agents, vec!["shipping-agent"]);
    assert!(decision.reasoning.contains("Shipping Agent"));
    assert!(decision.reasoning.contains("shipping-agent"));
}

#[tokio::test]
async fn test_rule_based_picks_top_similarity() {
    let mesh = Mesh::new();
    mesh.register_all([purchase_agent(URL), invoice_agent(URL), shipping_agent(URL)])
        .await;
    let query = "when will my shipping arrive";
    let discovered = mesh.directory.discover(query, 5).await.unwrap();

    let decision = mesh.router.route(query, &discovered).await;

    assert_eq!(decision.strategy, RoutingStrategy::Single);
    assert_eq!(decision.agents, vec!["shipping-agent"]);
    assert_eq!(decision.reasoning, RULE_BASED_REASONING);
}

#[tokio::test]
async fn test_llm_enabled_without_provider_stays_rule_based() {
    let mesh = Mesh::build(MeshOptions {
        llm_routing: true,
        ..MeshOptions::default()
    });
    mesh.register_all([purchase_agent(URL), invoice_agent(URL)]).await;
    assert!(!mesh.router.llm_routing_enabled());

    let discovered = mesh.directory.discover("purchase", 5).await.unwrap();
    let decision = mesh.router.route("purchase", &discovered).await;
    assert_eq!(decision.agents, vec!["purchase-agent"]);
    assert_eq!(decision.reasoning, RULE_BASED_REASONING);
}

#[tokio::test]
async fn test_llm_parallel_decision() {
    let inference = MockInference::start().await;
    inference
        .reply(
            "Here is my decision:\n```json\n{\"strategy\": \"parallel\", \
             \"agents\": [\"invoice-agent\", \"purchase-agent\"], \
             \"reasoning\": \"both documents are involved\"}\n```",
        )
        .await;
    let mesh = llm_mesh(&inference).await;

    let query = "does invoice 77 match purchase order 1042";
    let discovered = mesh.directory.discover(query, 5).await.unwrap();
    let decision = mesh.router.route(query, &discovered).await;

    assert_eq!(decision.strategy, RoutingStrategy::Parallel);
    assert_eq!(decision.agents, vec!["invoice-agent", "purchase-agent"]);
    assert_eq!(decision.reasoning, "both documents are involved");

    let prompts = inference.server.received_requests().await.unwrap();
    assert_eq!(prompts.len(), 1);
    let body: serde_json::Value = prompts[0].body_json().unwrap();
    let user_turn = body["messages"][1]["content"].as_str().unwrap();
    assert!(user_turn.contains("Agent: Invoice Agent (ID: invoice-agent)"));
    assert!(user_turn.ends_with(query));
}

#[tokio::test]
async fn test_llm_unknown_agent_falls_back_to_top() {
    let inference = MockInference::start().await;
    inference
        .reply(r#"{"strategy": "SINGLE", "agents": ["weather-agent"], "reasoning": "x"}"#)
        .await;
    let mesh = llm_mesh(&inference).await;

    let query = "purchase order 1042";
    let discovered = mesh.directory.discover(query, 5).await.unwrap();
    let decision = mesh.router.route(query, &discovered).await;

    assert_eq!(decision.strategy, RoutingStrategy::Single);
    assert_eq!(decision.agents, vec!["purchase-agent"]);
    assert!(decision.reasoning.starts_with(RULE_BASED_REASONING));
    assert!(decision.reasoning.contains("LLM routing failed"));
}

#[tokio::test]
async fn test_llm_outage_falls_back_to_top() {
    let inference = MockInference::start().await;
    inference.fail(500).await;
    let mesh = llm_mesh(&inference).await;

    let query = "has invoice 77 been paid";
    let discovered = mesh.directory.discover(query, 5).await.unwrap();
    let decision = mesh.router.route(query, &discovered).await;

    assert_eq!(decision.agents, vec!["invoice-agent"]);
    assert!(decision.reasoning.contains("LLM routing failed"));
    assert!(mesh
        .metrics
        .encode()
        .unwrap()
        .contains("mesh_routing_fallbacks_total{reason=\"llm_failed\"} 1"));
}
