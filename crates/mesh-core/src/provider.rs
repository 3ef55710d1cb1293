//! Collaborator traits: embedding and inference providers.
//!
//! Both are external to the mesh. Implementations live in `mesh-providers`
//! or are injected by the hosting process.

use crate::error::MeshResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
}

/// One role/content turn sent to an inference provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Speaker role
    pub role: ChatRole,
    /// Turn text
    pub content: String,
}

impl ChatTurn {
    /// A system turn
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Text -> fixed-dimension vector.
///
/// `dimension()` must be constant for the lifetime of the provider and every
/// vector returned by `embed` must have exactly that length.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> MeshResult<Vec<f32>>;

    /// Vector dimension produced by this provider
    fn dimension(&self) -> usize;

    /// Provider name used in logs
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Role/content turns -> completion text.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Request a completion
    async fn complete(&self, messages: &[ChatTurn]) -> MeshResult<String>;

    /// Provider name used in logs
    fn name(&self) -> &str {
        "inference"
    }
}
