use crate::types::{ChatRequest, ChatResponse, ModelInfo};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    Authentication,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider returned no content")]
    EmptyResponse,

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

pub type ModelResult<T> = Result<T, ModelError>;

#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> ModelResult<ChatResponse>;

    async fn list_models(&self) -> ModelResult<Vec<ModelInfo>>;

    async fn health_check(&self) -> ModelResult<()>;

    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, Choice, FinishReason, MessageRole};

    struct EchoProvider;

    #[async_trait]
    impl ModelProvider for EchoProvider {
        async fn chat(&self, request: ChatRequest) -> ModelResult<ChatResponse> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ChatResponse {
                choices: vec![Choice {
                    message: ChatMessage::assistant(last),
                    finish_reason: Some(FinishReason::Stop),
                }],
                usage: None,
            })
        }

        async fn list_models(&self) -> ModelResult<Vec<ModelInfo>> {
            Ok(vec![ModelInfo {
                name: "echo-model".to_string(),
                size: Some(1024),
                modified_at: None,
            }])
        }

        async fn health_check(&self) -> ModelResult<()> {
            Ok(())
        }

        fn provider_name(&self) -> &'static str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_provider_trait_object() {
        let provider: Box<dyn ModelProvider> = Box::new(EchoProvider);

        let request = ChatRequest::new("echo-model", vec![ChatMessage::user("Hello")]);
        let response = provider.chat(request).await.unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.role, MessageRole::Assistant);
        assert_eq!(response.content(), Some("Hello"));

        let models = provider.list_models().await.unwrap();
        assert_eq!(models[0].name, "echo-model");

        provider.health_check().await.unwrap();
        assert_eq!(provider.provider_name(), "echo");
    }

    #[test]
    fn test_error_display() {
        let err = ModelError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Request timed out after 5s");

        let err = ModelError::ModelNotFound {
            model: "gpt-9".to_string(),
        };
        assert_eq!(err.to_string(), "Model not found: gpt-9");
    }
}
