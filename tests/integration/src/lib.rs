//! Integration tests for the agent mesh
//!
//! End-to-end scenarios wiring the real directory, routing engine,
//! orchestrator and HTTP invoker against wiremock-backed agents:
//! - Registration, discovery, health and TTL behaviour
//! - Routing degenerate cases and LLM-assisted routing
//! - SINGLE, PARALLEL and SEQUENTIAL execution
//! - Heartbeat lifecycle

pub mod fixtures;
pub mod mock_agents;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_agents::*;

#[cfg(test)]
mod orchestration_tests;
#[cfg(test)]
mod routing_tests;
