//! Completion client with per-call timeout and mock fallback.
//!
//! Callers that must always get text back (agents, the rubric judge) use
//! [`CompletionClient::complete`]; a failed or slow provider call is logged and
//! replaced by the [`MockProvider`] response for the same request. No retries
//! are attempted.

use crate::config::{ProviderConfig, ProviderKind};
use crate::mock::MockProvider;
use crate::provider::{ModelError, ModelProvider, ModelResult};
use crate::types::{ChatMessage, ChatRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct CompletionClient {
    provider: Arc<dyn ModelProvider>,
    fallback: MockProvider,
    model: String,
    timeout: Duration,
    max_tokens: Option<u32>,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            fallback: MockProvider::new(),
            model: model.into(),
            timeout: Duration::from_secs(60),
            max_tokens: None,
        }
    }

    /// Offline client backed only by the mock provider.
    pub fn mock() -> Self {
        Self::new(Arc::new(MockProvider::new()), "mock-model")
    }

    /// Build the provider named by `config`.
    ///
    /// An OpenAI-compatible provider without an API key degrades to the mock
    /// provider instead of failing.
    pub fn from_config(config: &ProviderConfig) -> ModelResult<Self> {
        config
            .validate()
            .map_err(|message| ModelError::InvalidConfig { message })?;

        let provider: Arc<dyn ModelProvider> = match config.provider {
            ProviderKind::Mock => Arc::new(MockProvider::new()),
            #[cfg(feature = "ollama")]
            ProviderKind::Ollama => Arc::new(crate::ollama::OllamaProvider::new(config)?),
            #[cfg(not(feature = "ollama"))]
            ProviderKind::Ollama => {
                return Err(ModelError::InvalidConfig {
                    message: "ollama support not compiled in".to_string(),
                })
            }
            ProviderKind::OpenAi => {
                let provider = crate::openai::OpenAiProvider::new(config)?;
                if provider.has_credentials() {
                    Arc::new(provider)
                } else {
                    warn!(
                        model = %config.model,
                        "No API key configured for OpenAI-compatible provider, using mock responses"
                    );
                    Arc::new(MockProvider::new())
                }
            }
        };

        let mut client = Self::new(provider, config.model.clone()).with_timeout(config.timeout());
        client.max_tokens = config.max_tokens;
        Ok(client)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> &dyn ModelProvider {
        self.provider.as_ref()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        seed: Option<u64>,
    ) -> ChatRequest {
        let request = ChatRequest::new(self.model.clone(), messages.to_vec())
            .with_temperature(temperature)
            .with_seed(seed);
        match self.max_tokens {
            Some(max_tokens) => request.with_max_tokens(max_tokens),
            None => request,
        }
    }

    /// One provider call bounded by the configured timeout.
    pub async fn try_complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        seed: Option<u64>,
    ) -> ModelResult<String> {
        let request = self.build_request(messages, temperature, seed);
        debug!(
            provider = self.provider.provider_name(),
            model = %self.model,
            messages = messages.len(),
            "Requesting completion"
        );

        let response = tokio::time::timeout(self.timeout, self.provider.chat(request))
            .await
            .map_err(|_| ModelError::Timeout(self.timeout))??;

        response
            .content()
            .map(str::to_string)
            .ok_or(ModelError::EmptyResponse)
    }

    /// Completion text, falling back to the mock response on any failure.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        seed: Option<u64>,
    ) -> String {
        match self.try_complete(messages, temperature, seed).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    provider = self.provider.provider_name(),
                    error = %e,
                    "Completion failed, substituting mock response"
                );
                self.fallback
                    .respond(&self.build_request(messages, temperature, seed))
            }
        }
    }
}
