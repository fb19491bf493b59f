//! Deterministic offline providers
//!
//! Used when no API keys are configured and in tests. Output is a pure
//! function of the input so pipeline behavior is reproducible.

use async_trait::async_trait;

use super::{
    ChatMessage, GeneratedImage, ImageGenerator, ProviderError, Role, TextInterpreter,
};

pub struct MockInterpreter;

impl MockInterpreter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextInterpreter for MockInterpreter {
    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, ProviderError> {
        let has_system = conversation.iter().any(|m| m.role == Role::System);
        let user_turns = conversation.iter().filter(|m| m.role == Role::User).count();

        // The summary request arrives as a standalone single-turn
        // conversation; card requests ride the growing one.
        if !has_system {
            return Ok(
                "The cards together tell a story of change met with hope: what has \
                 passed prepared you, what is present tests you, and what comes next \
                 rewards your patience with growth and good fortune."
                    .to_string(),
            );
        }

        let body = match user_turns {
            1 => {
                "In your past, this card speaks of foundations laid through honest \
                 effort. What felt like struggle was preparation, and its lessons \
                 still hold."
            }
            2 => {
                "In the present, this card shows a crossroads. Energy gathers around \
                 you now, and a deliberate choice will carry more weight than usual."
            }
            _ => {
                "For your future, this card promises an opening. Stay receptive and \
                 the opportunity ahead will arrive with success and abundance."
            }
        };

        Ok(body.to_string())
    }
}

pub struct MockImages;

impl MockImages {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockImages {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerator for MockImages {
    async fn generate(
        &self,
        _prompt: &str,
        session_id: &str,
    ) -> Result<GeneratedImage, ProviderError> {
        Ok(GeneratedImage {
            url: format!("https://images.example.com/taro/{}.png", session_id),
            description: Some("A serene illustration of the drawn spread".to_string()),
        })
    }
}
