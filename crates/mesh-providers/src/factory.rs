//! Build providers from configuration.

use crate::hashing::HashingEmbeddingProvider;
use crate::openai::{OpenAiConfig, OpenAiEmbeddingProvider, OpenAiInferenceProvider};
use mesh_config::{ProviderConfig, ProviderKind};
use mesh_core::{EmbeddingProvider, InferenceProvider, MeshError, MeshResult};
use std::sync::Arc;
use tracing::info;

fn openai_config<F>(config: &ProviderConfig, section: &str, lookup: F) -> MeshResult<OpenAiConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let endpoint = config
        .endpoint
        .clone()
        .ok_or_else(|| MeshError::configuration(format!("{section}.endpoint is required")))?;
    let model = config
        .model
        .clone()
        .ok_or_else(|| MeshError::configuration(format!("{section}.model is required")))?;

    let mut openai = OpenAiConfig::new(endpoint, model).with_timeout(config.timeout);
    if let Some(var) = &config.api_key_env {
        let key = lookup(var).filter(|k| !k.is_empty()).ok_or_else(|| {
            MeshError::configuration(format!("{section}.api_key_env: environment variable {var} is not set"))
        })?;
        openai = openai.with_api_key(key);
    }
    Ok(openai)
}

/// Build the embedding provider described by `config`.
///
/// # Errors
/// Returns a configuration error for missing endpoint, model or API key
pub fn build_embedding_provider(
    config: &ProviderConfig,
    dimension: usize,
) -> MeshResult<Arc<dyn EmbeddingProvider>> {
    build_embedding_provider_with(config, dimension, |var| std::env::var(var).ok())
}

/// [`build_embedding_provider`] with an explicit environment lookup
///
/// # Errors
/// Returns a configuration error for missing endpoint, model or API key
pub fn build_embedding_provider_with<F>(
    config: &ProviderConfig,
    dimension: usize,
    lookup: F,
) -> MeshResult<Arc<dyn EmbeddingProvider>>
where
    F: Fn(&str) -> Option<String>,
{
    let provider: Arc<dyn EmbeddingProvider> = match config.kind {
        ProviderKind::Local => Arc::new(HashingEmbeddingProvider::new(dimension)?),
        ProviderKind::OpenAi => Arc::new(OpenAiEmbeddingProvider::new(
            openai_config(config, "embedding", lookup)?,
            dimension,
        )?),
    };
    info!(provider = provider.name(), dimension, "Embedding provider ready");
    Ok(provider)
}

/// Build the inference provider described by `config`.
///
/// `local` has no inference implementation and yields `None`, which leaves
/// routing rule-based.
///
/// # Errors
/// Returns a configuration error for missing endpoint, model or API key
pub fn build_inference_provider(
    config: &ProviderConfig,
) -> MeshResult<Option<Arc<dyn InferenceProvider>>> {
    build_inference_provider_with(config, |var| std::env::var(var).ok())
}

/// [`build_inference_provider`] with an explicit environment lookup
///
/// # Errors
/// Returns a configuration error for missing endpoint, model or API key
pub fn build_inference_provider_with<F>(
    config: &ProviderConfig,
    lookup: F,
) -> MeshResult<Option<Arc<dyn InferenceProvider>>>
where
    F: Fn(&str) -> Option<String>,
{
    match config.kind {
        ProviderKind::Local => Ok(None),
        ProviderKind::OpenAi => {
            let provider =
                OpenAiInferenceProvider::new(openai_config(config, "inference", lookup)?)?;
            info!(provider = "openai-chat", "Inference provider ready");
            Ok(Some(Arc::new(provider)))
        }
    }
}
