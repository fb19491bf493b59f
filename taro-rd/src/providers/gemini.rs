//! Gemini image generation client
//!
//! The generateContent endpoint returns multimodal parts; the image
//! arrives inline as base64, which we decode to disk and serve back
//! under `/images/{session_id}.png`.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{GeneratedImage, ImageGenerator, ProviderError};

pub struct GeminiImages {
    client: reqwest::Client,
    api_key: String,
    model: String,
    media_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl GeminiImages {
    pub fn new(api_key: String, model: String, media_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            media_dir,
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiImages {
    async fn generate(
        &self,
        prompt: &str,
        session_id: &str,
    ) -> Result<GeneratedImage, ProviderError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"]
            }
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let parts = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts)
            .ok_or_else(|| ProviderError::Parse("no candidates".to_string()))?;

        let mut description = None;
        let mut image_bytes = None;
        for part in parts {
            if let Some(text) = part.text {
                description = Some(text);
            }
            if let Some(inline) = part.inline_data {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|e| ProviderError::Parse(format!("base64 decode: {}", e)))?;
                image_bytes = Some(bytes);
            }
        }

        let bytes = image_bytes
            .ok_or_else(|| ProviderError::Parse("response carried no image part".to_string()))?;

        tokio::fs::create_dir_all(&self.media_dir).await?;
        let file_path = self.media_dir.join(format!("{}.png", session_id));
        tokio::fs::write(&file_path, &bytes).await?;
        debug!(path = %file_path.display(), bytes = bytes.len(), "Result image written");
        info!(session_id, "Image generated");

        Ok(GeneratedImage {
            url: format!("/images/{}.png", session_id),
            description,
        })
    }
}
