//! Capability providers: text interpretation and image generation
//!
//! The pipeline talks to traits; concrete providers (OpenAI chat
//! completions, Gemini image generation) live behind them, with
//! deterministic mocks for offline runs and tests.

pub mod gemini;
pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taro_common::config::TomlConfig;
use thiserror::Error;

pub use gemini::GeminiImages;
pub use mock::{MockImages, MockInterpreter};
pub use openai::OpenAiChat;

/// One turn in the interpretation conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Result of an image generation call
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// URL clients fetch the image from
    pub url: String,
    /// Provider's text accompanying the image, if any
    pub description: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Provider response missing expected content: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chat-style text completion over a growing conversation
#[async_trait]
pub trait TextInterpreter: Send + Sync {
    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, ProviderError>;
}

/// Single-shot image generation from a text prompt
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        session_id: &str,
    ) -> Result<GeneratedImage, ProviderError>;
}

/// Configured text provider
pub enum TextProvider {
    OpenAi(OpenAiChat),
    Mock(MockInterpreter),
}

/// Configured image provider
pub enum ImageProvider {
    Gemini(GeminiImages),
    Mock(MockImages),
}

#[async_trait]
impl TextInterpreter for TextProvider {
    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, ProviderError> {
        match self {
            TextProvider::OpenAi(p) => p.complete(conversation).await,
            TextProvider::Mock(p) => p.complete(conversation).await,
        }
    }
}

#[async_trait]
impl ImageGenerator for ImageProvider {
    async fn generate(
        &self,
        prompt: &str,
        session_id: &str,
    ) -> Result<GeneratedImage, ProviderError> {
        match self {
            ImageProvider::Gemini(p) => p.generate(prompt, session_id).await,
            ImageProvider::Mock(p) => p.generate(prompt, session_id).await,
        }
    }
}

/// Build the provider pair from configuration
///
/// Mock providers are selected explicitly, or fall in as the default when
/// the corresponding API key is absent so the service still starts.
pub fn providers_from_config(
    config: &TomlConfig,
) -> (TextProvider, ImageProvider) {
    let text = if config.mock_providers {
        TextProvider::Mock(MockInterpreter::new())
    } else {
        match &config.openai_api_key {
            Some(key) => TextProvider::OpenAi(OpenAiChat::new(
                key.clone(),
                config.text_model.clone(),
            )),
            None => {
                tracing::warn!("No OpenAI API key configured, using mock text provider");
                TextProvider::Mock(MockInterpreter::new())
            }
        }
    };

    let image = if config.mock_providers {
        ImageProvider::Mock(MockImages::new())
    } else {
        match &config.gemini_api_key {
            Some(key) => ImageProvider::Gemini(GeminiImages::new(
                key.clone(),
                config.image_model.clone(),
                config.media_dir.clone().into(),
            )),
            None => {
                tracing::warn!("No Gemini API key configured, using mock image provider");
                ImageProvider::Mock(MockImages::new())
            }
        }
    };

    (text, image)
}
