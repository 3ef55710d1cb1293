//! # Mesh Core
//!
//! Core types, traits, and error handling for the agent mesh.
//!
//! This crate provides the foundational types used throughout the mesh:
//! - Agent descriptors and their wire shape
//! - Routing decisions and execution strategies
//! - Messages streamed back from agents and per-agent invocation results
//! - Collaborator traits for embedding and inference providers
//! - The explicit request context threaded through every call
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod decision;
pub mod descriptor;
pub mod error;
pub mod message;
pub mod provider;

// Re-export commonly used types
pub use context::RequestContext;
pub use decision::{RoutingDecision, RoutingStrategy};
pub use descriptor::AgentDescriptor;
pub use error::{MeshError, MeshResult};
pub use message::{AgentInvocationResult, AgentMessage, MessageStream};
pub use provider::{ChatRole, ChatTurn, EmbeddingProvider, InferenceProvider};
