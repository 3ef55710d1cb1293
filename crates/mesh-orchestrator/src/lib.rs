//! # Mesh Orchestrator
//!
//! Executes routing decisions and streams agent output back to the caller.
//!
//! A request flows `discover -> route -> execute`. Execution dispatches on
//! [`mesh_core::RoutingStrategy`]:
//! - SINGLE forwards one agent's stream unchanged
//! - PARALLEL fans out to a bounded set of agents and returns one result
//!   message per agent, isolating failures
//! - SEQUENTIAL runs agents in order, feeding earlier answers forward as
//!   context while streaming every message live
//!
//! Agents are reached through an [`AgentInvoker`]; [`HttpAgentInvoker`]
//! speaks the `POST /api/v1/query` event-stream protocol.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invoker;
pub mod orchestrator;
pub mod sse;

pub use invoker::{AgentInvoker, HttpAgentInvoker, QUERY_PATH};
pub use orchestrator::{with_context, Orchestrator};
pub use sse::EventDecoder;
