//! Configuration loading for taro services
//!
//! TOML file with environment-variable overrides (ENV wins over TOML).
//! Provider API keys are deploy-time secrets, so the override order keeps
//! containerized deployments from having to ship a key inside the file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Service configuration, deserialized from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// OpenAI API key for the text interpreter
    pub openai_api_key: Option<String>,
    /// Gemini API key for the image generator
    pub gemini_api_key: Option<String>,
    /// Use deterministic mock providers instead of network-backed ones
    pub mock_providers: bool,
    /// Chat completion model name
    pub text_model: String,
    /// Image generation model name
    pub image_model: String,
    /// Directory result images are written into
    pub media_dir: String,
    /// sqlite database path
    pub database_path: String,
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

/// Worker pool and capability-call tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pipelines running without queueing
    pub core_workers: usize,
    /// Burst ceiling once the backlog is full
    pub max_workers: usize,
    /// Bounded backlog; beyond this, work runs on the caller's own path
    pub queue_capacity: usize,
    /// Per capability call (text or image) timeout
    pub call_timeout_secs: u64,
    /// Drain window for in-flight pipelines at shutdown
    pub shutdown_grace_secs: u64,
}

/// Subscription registry tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Per-subscriber event buffer
    pub channel_capacity: usize,
    /// Subscriber idle timeout; the stream closes after this much silence
    pub idle_timeout_secs: u64,
    /// SSE heartbeat comment interval
    pub heartbeat_secs: u64,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            mock_providers: false,
            text_model: "gpt-4o-mini".to_string(),
            image_model: "gemini-2.0-flash-exp".to_string(),
            media_dir: "media/images".to_string(),
            database_path: "taro.db".to_string(),
            server: ServerConfig::default(),
            pipeline: PipelineConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5733".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            core_workers: 2,
            max_workers: 5,
            queue_capacity: 100,
            call_timeout_secs: 30,
            shutdown_grace_secs: 20,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            idle_timeout_secs: 30 * 60,
            heartbeat_secs: 15,
        }
    }
}

/// Load configuration from `path`, then apply ENV overrides
///
/// A missing file is not an error; defaults are used so the service can
/// start with mock providers out of the box.
pub fn load_config(path: &Path) -> Result<TomlConfig> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let parsed: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        info!("Configuration loaded from {}", path.display());
        parsed
    } else {
        warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        TomlConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut TomlConfig) {
    if let Ok(key) = std::env::var("TARO_OPENAI_API_KEY") {
        if is_valid_key(&key) {
            if config.openai_api_key.is_some() {
                warn!("OpenAI API key set in both TOML and environment, using environment");
            }
            config.openai_api_key = Some(key);
        }
    }
    if let Ok(key) = std::env::var("TARO_GEMINI_API_KEY") {
        if is_valid_key(&key) {
            if config.gemini_api_key.is_some() {
                warn!("Gemini API key set in both TOML and environment, using environment");
            }
            config.gemini_api_key = Some(key);
        }
    }
    if let Ok(flag) = std::env::var("TARO_MOCK_PROVIDERS") {
        config.mock_providers = matches!(flag.as_str(), "1" | "true" | "yes");
    }
    if let Ok(path) = std::env::var("TARO_DATABASE_PATH") {
        if !path.trim().is_empty() {
            config.database_path = path;
        }
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_mock_friendly() {
        let config = TomlConfig::default();
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.pipeline.core_workers, 2);
        assert_eq!(config.pipeline.max_workers, 5);
        assert_eq!(config.pipeline.queue_capacity, 100);
        assert_eq!(config.events.idle_timeout_secs, 1800);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: TomlConfig = toml::from_str(
            r#"
            mock_providers = true

            [pipeline]
            core_workers = 1
            "#,
        )
        .unwrap();
        assert!(parsed.mock_providers);
        assert_eq!(parsed.pipeline.core_workers, 1);
        assert_eq!(parsed.pipeline.max_workers, 5);
        assert_eq!(parsed.server.bind_address, "127.0.0.1:5733");
    }

    #[test]
    fn key_validation_rejects_whitespace() {
        assert!(is_valid_key("sk-abc"));
        assert!(!is_valid_key("   "));
        assert!(!is_valid_key(""));
    }
}
