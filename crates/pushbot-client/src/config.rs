//! Push bot configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/pushbot/config.toml` by default; CLI flags and environment
//! variables override file values.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Production push bus endpoint.
pub const DEFAULT_PUSH_URL: &str = "wss://push.groupme.com/faye";

/// Configuration for the push bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// User whose message stream is subscribed (`/user/{id}`).
    pub user_id: String,

    /// API access token; authenticates both the subscription and replies.
    pub access_token: String,

    /// Command that activates the bot.
    pub trigger: String,

    /// Text posted when the trigger matches.
    pub reply: String,

    /// Push bus websocket endpoint.
    pub push_url: String,

    /// REST API base for replies.
    pub api_base: String,

    /// First reconnect delay, in seconds.
    pub initial_backoff_secs: u64,

    /// Reconnect delay cap, in seconds.
    pub max_backoff_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            access_token: String::new(),
            trigger: "!ping".to_string(),
            reply: "Pong!".to_string(),
            push_url: DEFAULT_PUSH_URL.to_string(),
            api_base: pushbot_api::DEFAULT_API_BASE.to_string(),
            initial_backoff_secs: 1,
            max_backoff_secs: 30,
        }
    }
}

impl BotConfig {
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
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pushbot")
    }

    /// Checks that the settings a connection needs are present.
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.is_empty() {
            return Err("user_id is required".to_string());
        }
        if self.access_token.is_empty() {
            return Err("access_token is required".to_string());
        }
        if self.trigger.is_empty() {
            return Err("trigger must not be empty".to_string());
        }
        Ok(())
    }

    /// First reconnect delay.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_secs)
    }

    /// Reconnect delay cap.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_target_production() {
        let config = BotConfig::default();
        assert_eq!(config.push_url, DEFAULT_PUSH_URL);
        assert_eq!(config.trigger, "!ping");
        assert_eq!(config.reply, "Pong!");
        assert_eq!(config.initial_backoff(), Duration::from_secs(1));
        assert_eq!(config.max_backoff(), Duration::from_secs(30));
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "user_id = \"185\"").unwrap();
        writeln!(file, "access_token = \"tok\"").unwrap();
        writeln!(file, "trigger = \"!marco\"").unwrap();

        let config = BotConfig::load_from(&path).unwrap();
        assert_eq!(config.user_id, "185");
        assert_eq!(config.trigger, "!marco");
        assert_eq!(config.reply, "Pong!");
        assert_eq!(config.push_url, DEFAULT_PUSH_URL);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        assert!(BotConfig::load_from(&path).is_err());
    }

    #[test]
    fn validate_requires_identity_and_token() {
        let mut config = BotConfig::default();
        assert!(config.validate().is_err());

        config.user_id = "185".to_string();
        assert!(config.validate().is_err());

        config.access_token = "tok".to_string();
        assert!(config.validate().is_ok());
    }
}
