//! # Mesh Providers
//!
//! Embedding and inference collaborators for the agent mesh:
//! - OpenAI-compatible HTTP embedding and chat-completion providers
//! - A deterministic hashing embedder for local development and tests
//! - Factories building either from [`mesh_config::ProviderConfig`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod factory;
pub mod hashing;
pub mod openai;

pub use factory::{
    build_embedding_provider, build_embedding_provider_with, build_inference_provider,
    build_inference_provider_with,
};
pub use hashing::HashingEmbeddingProvider;
pub use openai::{OpenAiConfig, OpenAiEmbeddingProvider, OpenAiInferenceProvider};
