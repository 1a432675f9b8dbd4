use crate::config::{ProviderConfig, DEFAULT_OLLAMA_URL};
use crate::provider::{ModelError, ModelProvider, ModelResult};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, FinishReason, ModelInfo, Usage,
};
use async_trait::async_trait;
use ollama_rs::Ollama;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

#[derive(Serialize)]
struct OllamaApiRequest {
    model: String,
    messages: Vec<OllamaApiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaApiOptions>,
}

#[derive(Serialize)]
struct OllamaApiMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaApiOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaApiResponse {
    message: OllamaApiResponseMessage,
    #[allow(dead_code)]
    done: bool,
    done_reason: Option<String>,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct OllamaApiResponseMessage {
    #[allow(dead_code)]
    role: String,
    content: String,
}

pub struct OllamaProvider {
    client: Ollama,
    http_client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig) -> ModelResult<Self> {
        config
            .validate()
            .map_err(|msg| ModelError::InvalidConfig { message: msg })?;

        let configured = config
            .resolved_base_url()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        let host = configured
            .strip_suffix("/v1")
            .unwrap_or(&configured)
            .trim_end_matches('/')
            .to_string();

        let base_url = format!("{}/", host);

        let client = Ollama::try_new(base_url.as_str()).map_err(|e| ModelError::InvalidConfig {
            message: format!("Invalid Ollama URL {}: {}", base_url, e),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ModelError::Unknown {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            http_client,
            base_url,
        })
    }

    fn convert_message_to_api(msg: &ChatMessage) -> OllamaApiMessage {
        OllamaApiMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }
    }

    fn build_request_body(request: &ChatRequest) -> OllamaApiRequest {
        let messages = request
            .messages
            .iter()
            .map(Self::convert_message_to_api)
            .collect();

        let options = if request.temperature.is_some()
            || request.seed.is_some()
            || request.max_tokens.is_some()
        {
            Some(OllamaApiOptions {
                temperature: request.temperature,
                seed: request.seed,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaApiRequest {
            model: request.model.clone(),
            messages,
            stream: false,
            options,
        }
    }

    fn parse_response(response: OllamaApiResponse) -> ChatResponse {
        let finish_reason = Some(
            response
                .done_reason
                .as_deref()
                .map(FinishReason::from_api)
                .unwrap_or(FinishReason::Stop),
        );

        let choice = Choice {
            message: ChatMessage::assistant(response.message.content),
            finish_reason,
        };

        let prompt_tokens = response.prompt_eval_count.unwrap_or(0);
        let completion_tokens = response.eval_count.unwrap_or(0);

        ChatResponse {
            choices: vec![choice],
            usage: Some(Usage {
                prompt_tokens: prompt_tokens as u32,
                completion_tokens: completion_tokens as u32,
                total_tokens: (prompt_tokens + completion_tokens) as u32,
            }),
        }
    }

    fn handle_ollama_error(err: ollama_rs::error::OllamaError) -> ModelError {
        match err {
            ollama_rs::error::OllamaError::ReqwestError(e) => {
                if e.is_timeout() {
                    ModelError::ServiceUnavailable {
                        message: "Request timeout".to_string(),
                    }
                } else if e.is_connect() {
                    ModelError::ServiceUnavailable {
                        message: "Cannot connect to Ollama service".to_string(),
                    }
                } else {
                    ModelError::Unknown {
                        message: format!("Network error: {}", e),
                    }
                }
            }
            ollama_rs::error::OllamaError::JsonError(e) => ModelError::Serialization(e),
            _ => ModelError::Unknown {
                message: format!("Ollama error: {}", err),
            },
        }
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    async fn chat(&self, request: ChatRequest) -> ModelResult<ChatResponse> {
        debug!("Starting chat request with model: {}", request.model);

        let body = Self::build_request_body(&request);
        let url = format!("{}api/chat", self.base_url);

        let http_response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::ServiceUnavailable {
                        message: "Request timeout".to_string(),
                    }
                } else if e.is_connect() {
                    ModelError::ServiceUnavailable {
                        message: "Cannot connect to Ollama service".to_string(),
                    }
                } else {
                    ModelError::Network(e)
                }
            })?;

        let status = http_response.status();
        if status.as_u16() == 404 {
            return Err(ModelError::ModelNotFound {
                model: request.model.clone(),
            });
        }
        if !status.is_success() {
            let error_text = http_response.text().await.unwrap_or_default();
            return Err(ModelError::Unknown {
                message: format!("Ollama API returned {}: {}", status, error_text),
            });
        }

        let api_response: OllamaApiResponse =
            http_response.json().await.map_err(ModelError::Network)?;

        debug!("Chat request completed");

        Ok(Self::parse_response(api_response))
    }

    async fn list_models(&self) -> ModelResult<Vec<ModelInfo>> {
        debug!("Listing available models");

        let models = self
            .client
            .list_local_models()
            .await
            .map_err(Self::handle_ollama_error)?;

        let model_infos: Vec<ModelInfo> = models
            .into_iter()
            .map(|model| ModelInfo {
                name: model.name,
                size: Some(model.size),
                modified_at: Some(model.modified_at),
            })
            .collect();

        info!("Retrieved {} models", model_infos.len());
        Ok(model_infos)
    }

    async fn health_check(&self) -> ModelResult<()> {
        debug!("Performing health check");

        match self.list_models().await {
            Ok(_) => {
                info!("Health check passed");
                Ok(())
            }
            Err(e) => {
                error!("Health check failed: {}", e);
                Err(e)
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}
