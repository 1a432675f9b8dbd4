pub mod client;
pub mod config;
pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod types;

pub use client::CompletionClient;
pub use config::{ProviderConfig, ProviderKind};
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use provider::{ModelError, ModelProvider, ModelResult};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, FinishReason, MessageRole, ModelInfo, Usage,
};

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;

pub mod prelude {
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::mock::*;
    pub use crate::openai::*;
    pub use crate::provider::*;
    pub use crate::types::*;

    #[cfg(feature = "ollama")]
    pub use crate::ollama::*;
}
