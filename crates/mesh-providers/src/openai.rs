//! OpenAI-compatible HTTP providers.
//!
//! Both providers speak the public OpenAI REST shapes, so any compatible
//! server (OpenAI, Azure with a compatible gateway, vLLM, Ollama) works:
//! - `POST {endpoint}/embeddings`
//! - `POST {endpoint}/chat/completions` (non-streaming)

use async_trait::async_trait;
use mesh_core::{ChatTurn, EmbeddingProvider, InferenceProvider, MeshError, MeshResult};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Connection settings shared by the OpenAI-compatible providers
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base URL, e.g. `https://api.openai.com/v1`
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Bearer API key; omitted for servers that need none
    pub api_key: Option<SecretString>,
    /// Request timeout
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create a configuration with a 30s timeout and no API key
    #[must_use]
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint.trim_end_matches('/'))
    }

    fn client(&self) -> MeshResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| MeshError::configuration(format!("Failed to create HTTP client: {e}")))
    }
}

/// Send `body` and decode the JSON response, describing any failure as text
async fn post_json<B, R>(
    client: &Client,
    config: &OpenAiConfig,
    path: &str,
    body: &B,
) -> Result<R, String>
where
    B: Serialize + Sync,
    R: serde::de::DeserializeOwned + Send,
{
    let mut request = client.post(config.url(path)).json(body);
    if let Some(key) = &config.api_key {
        request = request.bearer_auth(key.expose_secret());
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            format!("request timed out after {}ms", config.timeout.as_millis())
        } else {
            format!("request failed: {e}")
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("HTTP {}: {}", status.as_u16(), body.trim()));
    }

    response
        .json::<R>()
        .await
        .map_err(|e| format!("invalid response body: {e}"))
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// `POST {endpoint}/embeddings` embedding provider
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    config: OpenAiConfig,
    client: Client,
    dimension: usize,
}

impl OpenAiEmbeddingProvider {
    /// Create a provider returning `dimension`-length vectors
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: OpenAiConfig, dimension: usize) -> MeshResult<Self> {
        let client = config.client()?;
        Ok(Self {
            config,
            client,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> MeshResult<Vec<f32>> {
        debug!(model = %self.config.model, chars = text.len(), "Requesting embedding");

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
            dimensions: self.dimension,
        };
        let response: EmbeddingResponse =
            post_json(&self.client, &self.config, "embeddings", &request)
                .await
                .map_err(|message| {
                    error!(model = %self.config.model, error = %message, "Embedding request failed");
                    MeshError::embedding(message)
                })?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| MeshError::embedding("response contained no embedding"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "openai-embeddings"
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `POST {endpoint}/chat/completions` inference provider
#[derive(Debug, Clone)]
pub struct OpenAiInferenceProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiInferenceProvider {
    /// Create a provider
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: OpenAiConfig) -> MeshResult<Self> {
        let client = config.client()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl InferenceProvider for OpenAiInferenceProvider {
    async fn complete(&self, turns: &[ChatTurn]) -> MeshResult<String> {
        debug!(model = %self.config.model, turns = turns.len(), "Requesting completion");

        let request = ChatRequest {
            model: &self.config.model,
            messages: turns,
            temperature: 0.0,
        };
        let response: ChatResponse =
            post_json(&self.client, &self.config, "chat/completions", &request)
                .await
                .map_err(|message| {
                    error!(model = %self.config.model, error = %message, "Completion request failed");
                    MeshError::inference(message)
                })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| MeshError::inference("response contained no message content"))
    }

    fn name(&self) -> &str {
        "openai-chat"
    }
}
