use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Which backend serves completions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deterministic offline responses
    #[default]
    Mock,
    /// Local Ollama server
    Ollama,
    /// Any OpenAI-compatible `/chat/completions` endpoint
    OpenAi,
}

impl ProviderKind {
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Mock => None,
            ProviderKind::Ollama => Some(DEFAULT_OLLAMA_URL),
            ProviderKind::OpenAi => Some(DEFAULT_OPENAI_URL),
        }
    }
}

/// Connection settings for one completion backend.
///
/// Built explicitly and handed to the client that uses it; nothing here is
/// read from process-wide state except the optional `api_key_env` lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Environment variable holding the API key, consulted when `api_key` is unset
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Mock,
            model: "mock-model".to_string(),
            base_url: None,
            api_key: None,
            api_key_env: None,
            timeout_secs: 60,
            max_tokens: None,
        }
    }
}

impl ProviderConfig {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn mock() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Explicit base URL, or the provider's conventional default.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.provider.default_base_url().map(str::to_string))
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// Explicit key first, then the named environment variable. Empty values count as unset.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| {
                self.api_key_env
                    .as_ref()
                    .and_then(|var| std::env::var(var).ok())
            })
            .filter(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }

        if let Some(base_url) = &self.base_url {
            if base_url.is_empty() {
                return Err("Base URL cannot be empty".to_string());
            }

            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Base URL must start with http:// or https://".to_string());
            }
        }

        if let Some(max_tokens) = self.max_tokens {
            if max_tokens == 0 {
                return Err("Max tokens must be greater than 0".to_string());
            }
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProviderConfig::default();
        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.model, "mock-model");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.resolved_base_url(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ProviderConfig::new(ProviderKind::OpenAi, "deepseek-chat")
            .with_base_url("https://api.deepseek.com/v1/")
            .with_api_key("sk-test")
            .with_timeout(Duration::from_secs(90))
            .with_max_tokens(512);

        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(
            config.resolved_base_url().as_deref(),
            Some("https://api.deepseek.com/v1")
        );
        assert_eq!(config.resolved_api_key().as_deref(), Some("sk-test"));
        assert_eq!(config.timeout_secs, 90);
        assert_eq!(config.max_tokens, Some(512));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_base_urls() {
        let ollama = ProviderConfig::new(ProviderKind::Ollama, "llama3.1:8b");
        assert_eq!(
            ollama.resolved_base_url().as_deref(),
            Some(DEFAULT_OLLAMA_URL)
        );

        let openai = ProviderConfig::new(ProviderKind::OpenAi, "gpt-4o");
        assert_eq!(
            openai.resolved_base_url().as_deref(),
            Some(DEFAULT_OPENAI_URL)
        );
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let config = ProviderConfig::new(ProviderKind::OpenAi, "gpt-4o").with_api_key("   ");
        assert_eq!(config.resolved_api_key(), None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ProviderConfig::default();

        config.model = "".to_string();
        assert!(config.validate().is_err());

        config.model = "gpt-4o".to_string();
        config.base_url = Some("".to_string());
        assert!(config.validate().is_err());

        config.base_url = Some("invalid-url".to_string());
        assert!(config.validate().is_err());

        config.base_url = Some("http://localhost:8000/v1".to_string());
        config.max_tokens = Some(0);
        assert!(config.validate().is_err());

        config.max_tokens = None;
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_toml_shape() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"provider": "openai", "model": "gpt-4o-mini"}"#).unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout_secs, 60);
        assert!(config.api_key.is_none());
    }
}
