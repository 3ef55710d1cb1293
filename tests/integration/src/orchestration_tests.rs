//! Orchestration integration tests
//!
//! Full request flows from query to streamed messages, against mock agents
//! reached over HTTP.

use crate::fixtures::*;
use crate::mock_agents::*;
use futures::StreamExt;
use mesh_core::{
    AgentMessage, InferenceProvider, RequestContext, RoutingDecision, RoutingStrategy,
};
use mesh_providers::{OpenAiConfig, OpenAiInferenceProvider};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn ctx() -> RequestContext {
    RequestContext::new("session-1", "token-1")
}

async fn collect(stream: mesh_core::MessageStream) -> Vec<Value> {
    stream.map(AgentMessage::into_value).collect::<Vec<_>>().await
}

fn ids(agents: &[&MockAgent]) -> Vec<String> {
    agents.iter().map(|a| a.id().to_string()).collect()
}

#[tokio::test]
async fn test_single_agent_request_end_to_end() {
    let purchase = MockAgent::start(purchase_agent).await;
    purchase.answer("PO-1042 is open").await;
    let invoice = MockAgent::start(invoice_agent).await;
    invoice.answer("wrong agent").await;

    let mesh = Mesh::new();
    mesh.register_all([purchase.descriptor.clone(), invoice.descriptor.clone()])
        .await;

    let messages = collect(
        mesh.orchestrator
            .handle_request("status of purchase order 1042", ctx()),
    )
    .await;

    assert_eq!(
        messages,
        vec![json!({"type": "assistant_message", "content": "PO-1042 is open"})]
    );

    let requests = purchase.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].headers.get("authorization").unwrap().to_str().unwrap(),
        "Bearer token-1"
    );
    assert_eq!(
        purchase.received_queries().await,
        vec![json!({"query": "status of purchase order 1042", "session_id": "session-1"})]
    );
    assert!(invoice.received_queries().await.is_empty());
}

#[tokio::test]
async fn test_agent_events_are_forwarded_verbatim() {
    let shipping = MockAgent::start(shipping_agent).await;
    let events = [
        json!({"type": "tool_call", "name": "track", "args": {"id": "S-9"}}),
        json!({"type": "assistant_message", "content": "Out for delivery"}),
        json!({"type": "done", "usage": {"tokens": 12}}),
    ];
    shipping.stream(&events).await;

    let mesh = Mesh::new();
    mesh.register_all([shipping.descriptor.clone()]).await;

    let messages = collect(mesh.orchestrator.handle_request("track shipping S-9", ctx())).await;
    assert_eq!(messages, events.to_vec());
}

#[tokio::test]
async fn test_empty_directory_reports_missing_fallback() {
    let mesh = Mesh::new();

    let messages = collect(mesh.orchestrator.handle_request("hello?", ctx())).await;

    assert_eq!(
        messages,
        vec![json!({"type": "error", "message": "agent 'general-agent' not found"})]
    );
}

#[tokio::test]
async fn test_embedding_failure_routes_to_fallback_agent() {
    let general = MockAgent::start(general_agent).await;
    general.answer("Happy to help").await;
    let purchase = MockAgent::start(purchase_agent).await;
    purchase.answer("wrong agent").await;

    let mesh = Mesh::new();
    mesh.register_all([general.descriptor.clone(), purchase.descriptor.clone()])
        .await;

    let messages = collect(
        mesh.orchestrator
            .handle_request("unembeddable purchase question", ctx()),
    )
    .await;

    assert_eq!(
        messages,
        vec![json!({"type": "assistant_message", "content": "Happy to help"})]
    );
    assert!(purchase.received_queries().await.is_empty());
}

#[tokio::test]
async fn test_failing_single_agent_yields_one_error() {
    let invoice = MockAgent::start(invoice_agent).await;
    invoice.fail(503).await;

    let mesh = Mesh::new();
    mesh.register_all([invoice.descriptor.clone()]).await;

    let messages = collect(mesh.orchestrator.handle_request("invoice 77", ctx())).await;

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["type"], "error");
    assert!(messages[0]["message"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn test_parallel_failures_are_isolated() {
    let purchase = MockAgent::start(purchase_agent).await;
    purchase.answer("PO-1042 is open").await;
    let invoice = MockAgent::start(invoice_agent).await;
    invoice.fail(503).await;
    let shipping = MockAgent::start(shipping_agent).await;
    shipping.answer("Shipped yesterday").await;

    let mesh = Mesh::new();
    mesh.register_all([
        purchase.descriptor.clone(),
        invoice.descriptor.clone(),
        shipping.descriptor.clone(),
    ])
    .await;

    let decision = RoutingDecision::new(
        RoutingStrategy::Parallel,
        ids(&[&purchase, &invoice, &shipping]),
        "fan out",
    );
    let messages = collect(
        mesh.orchestrator
            .execute(decision, "order 1042 overview".to_string(), ctx()),
    )
    .await;

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["type"], "agent_response");
    assert_eq!(messages[0]["agent_id"], "purchase-agent");
    assert_eq!(messages[0]["response"], "PO-1042 is open");
    assert_eq!(messages[1]["type"], "agent_error");
    assert_eq!(messages[1]["agent_id"], "invoice-agent");
    assert!(messages[1]["error"].as_str().unwrap().contains("503"));
    assert_eq!(messages[2]["type"], "agent_response");
    assert_eq!(messages[2]["response"], "Shipped yesterday");
}

#[tokio::test]
async fn test_parallel_timeout_does_not_block_siblings() {
    let purchase = MockAgent::start(purchase_agent).await;
    purchase.answer("fast").await;
    let shipping = MockAgent::start(shipping_agent).await;
    shipping
        .answer_slowly("too late", Duration::from_secs(3))
        .await;

    let mesh = Mesh::build(MeshOptions {
        orchestrator: mesh_config::OrchestratorConfig::default()
            .with_agent_timeout(Duration::from_millis(200)),
        ..MeshOptions::default()
    });
    mesh.register_all([purchase.descriptor.clone(), shipping.descriptor.clone()])
        .await;

    let results = mesh
        .orchestrator
        .run_parallel(&ids(&[&purchase, &shipping]), "status", &ctx())
        .await;

    assert_eq!(results.len(), 2);
    let fast = &results["purchase-agent"];
    assert!(fast.success);
    assert_eq!(fast.response, Some(json!("fast")));

    let slow = &results["shipping-agent"];
    assert!(!slow.success);
    assert!(slow.error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_parallel_truncates_and_reports_missing_agents() {
    let purchase = MockAgent::start(purchase_agent).await;
    purchase.answer("PO").await;
    let shipping = MockAgent::start(shipping_agent).await;
    shipping.answer("ship").await;

    let mesh = Mesh::build(MeshOptions {
        orchestrator: mesh_config::OrchestratorConfig::default().with_max_parallel_agents(2),
        ..MeshOptions::default()
    });
    mesh.register_all([purchase.descriptor.clone(), shipping.descriptor.clone()])
        .await;

    let decision = RoutingDecision::new(
        RoutingStrategy::Parallel,
        vec![
            "ghost-agent".to_string(),
            "purchase-agent".to_string(),
            "ghost-agent".to_string(),
            "shipping-agent".to_string(),
        ],
        "fan out",
    );
    let messages = collect(mesh.orchestrator.execute(decision, "q".to_string(), ctx())).await;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["type"], "agent_error");
    assert_eq!(messages[0]["error"], "agent 'ghost-agent' not found");
    assert_eq!(messages[1]["agent_id"], "purchase-agent");
    assert!(shipping.received_queries().await.is_empty());
    assert!(mesh
        .metrics
        .encode()
        .unwrap()
        .contains("mesh_parallel_agents_dropped_total 1"));
}

#[tokio::test]
async fn test_sequential_carries_context_forward() {
    let purchase = MockAgent::start(purchase_agent).await;
    purchase.answer("PO-1042 is open").await;
    let invoice = MockAgent::start(invoice_agent).await;
    invoice
        .answer_when("PO-1042 is open", "Invoice 77 matches PO-1042")
        .await;
    invoice.answer("no context received").await;

    let mesh = Mesh::new();
    mesh.register_all([purchase.descriptor.clone(), invoice.descriptor.clone()])
        .await;

    let decision = RoutingDecision::new(
        RoutingStrategy::Sequential,
        ids(&[&purchase, &invoice]),
        "purchase first",
    );
    let messages = collect(
        mesh.orchestrator
            .execute(decision, "does invoice 77 match?".to_string(), ctx()),
    )
    .await;

    assert_eq!(
        messages,
        vec![
            json!({"type": "assistant_message", "content": "PO-1042 is open"}),
            json!({"type": "assistant_message", "content": "Invoice 77 matches PO-1042"}),
        ]
    );

    assert_eq!(purchase.received_queries().await[0]["query"], "does invoice 77 match?");
    assert_eq!(
        invoice.received_queries().await[0]["query"],
        "does invoice 77 match?\n\nContext from previous agents:\npurchase-agent: PO-1042 is open"
    );
}

#[tokio::test]
async fn test_sequential_continues_past_missing_and_failing_agents() {
    let purchase = MockAgent::start(purchase_agent).await;
    purchase.answer("PO-1042 is open").await;
    let invoice = MockAgent::start(invoice_agent).await;
    invoice.fail(500).await;
    let shipping = MockAgent::start(shipping_agent).await;
    shipping.answer("Shipped").await;

    let mesh = Mesh::new();
    mesh.register_all([
        purchase.descriptor.clone(),
        invoice.descriptor.clone(),
        shipping.descriptor.clone(),
    ])
    .await;

    let decision = RoutingDecision::new(
        RoutingStrategy::Sequential,
        vec![
            "purchase-agent".to_string(),
            "ghost-agent".to_string(),
            "invoice-agent".to_string(),
            "shipping-agent".to_string(),
        ],
        "chain",
    );
    let messages = collect(mesh.orchestrator.execute(decision, "q".to_string(), ctx())).await;

    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["content"], "PO-1042 is open");
    assert_eq!(messages[1], json!({"type": "error", "message": "agent 'ghost-agent' not found"}));
    assert_eq!(messages[2]["type"], "error");
    assert_eq!(messages[3]["content"], "Shipped");

    // The failed step contributes nothing to the carried context.
    assert_eq!(
        shipping.received_queries().await[0]["query"],
        "q\n\nContext from previous agents:\npurchase-agent: PO-1042 is open"
    );
}

#[tokio::test]
async fn test_llm_routed_parallel_request_end_to_end() {
    let purchase = MockAgent::start(purchase_agent).await;
    purchase.answer("PO-1042: 10 laptops").await;
    let invoice = MockAgent::start(invoice_agent).await;
    invoice.answer("Invoice 77: 10 laptops").await;

    let inference = MockInference::start().await;
    inference
        .reply(
            r#"{"strategy": "PARALLEL", "agents": ["purchase-agent", "invoice-agent"], "reasoning": "compare both"}"#,
        )
        .await;
    let provider: Arc<dyn InferenceProvider> = Arc::new(
        OpenAiInferenceProvider::new(OpenAiConfig::new(inference.endpoint(), "gpt-4o-mini"))
            .unwrap(),
    );

    let mesh = Mesh::build(MeshOptions {
        llm_routing: true,
        inference: Some(provider),
        ..MeshOptions::default()
    });
    mesh.register_all([purchase.descriptor.clone(), invoice.descriptor.clone()])
        .await;

    let messages = collect(
        mesh.orchestrator
            .handle_request("does invoice 77 match purchase order 1042", ctx()),
    )
    .await;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["agent_id"], "purchase-agent");
    assert_eq!(messages[0]["response"], "PO-1042: 10 laptops");
    assert_eq!(messages[1]["agent_id"], "invoice-agent");
    assert_eq!(messages[1]["response"], "Invoice 77: 10 laptops");
    assert!(mesh
        .metrics
        .encode()
        .unwrap()
        .contains("mesh_routing_decisions_total{strategy=\"PARALLEL\"} 1"));
}
