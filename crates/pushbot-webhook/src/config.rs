//! Webhook bot configuration.
//!
//! Settings live in `~/.config/pushbot/webhook.toml` by default; CLI flags
//! and environment variables override file values.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the webhook bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Bot id used for the bot-post endpoint.
    pub bot_id: String,

    /// Substring that activates the bot.
    pub trigger: String,

    /// Text posted when the trigger matches.
    pub reply: String,

    /// REST API base for replies.
    pub api_base: String,

    /// Address the HTTP server binds to.
    pub bind_addr: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bot_id: String::new(),
            trigger: "!test".to_string(),
            reply: "Test Successful!".to_string(),
            api_base: pushbot_api::DEFAULT_API_BASE.to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl WebhookConfig {
    /// Loads configuration from the default path, falling back to defaults
    /// when no file exists.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pushbot")
            .join("webhook.toml")
    }

    /// Checks that the settings a reply needs are present.
    pub fn validate(&self) -> Result<(), String> {
        if self.bot_id.is_empty() {
            return Err("bot_id is required".to_string());
        }
        if self.trigger.is_empty() {
            return Err("trigger must not be empty".to_string());
        }
        Ok(())
    }
}
