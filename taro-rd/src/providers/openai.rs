//! OpenAI chat completions client

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{ChatMessage, ProviderError, TextInterpreter};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl OpenAiChat {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    async fn request_once(
        &self,
        conversation: &[ChatMessage],
    ) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": conversation,
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        if let Some(usage) = &parsed.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion usage"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ProviderError::Parse("empty completion".to_string()))
    }
}

#[async_trait]
impl TextInterpreter for OpenAiChat {
    /// Complete the conversation, retrying transient failures
    ///
    /// Up to three attempts with doubling backoff. A 4xx other than 429
    /// is not retried, since the request itself is at fault.
    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, ProviderError> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.request_once(conversation).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    let retryable = match &err {
                        ProviderError::Api { status, .. } => {
                            *status == 429 || *status >= 500
                        }
                        ProviderError::Http(_) => true,
                        _ => false,
                    };
                    if !retryable || attempt == MAX_ATTEMPTS {
                        return Err(err);
                    }
                    warn!(attempt, error = %err, "Chat completion failed, retrying");
                    last_err = Some(err);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }

        // Loop always returns before falling through; keep the compiler honest.
        Err(last_err
            .unwrap_or_else(|| ProviderError::Parse("no attempts made".to_string())))
    }
}
