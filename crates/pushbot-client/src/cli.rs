//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

use crate::config::BotConfig;

/// pushbot - live subscription bot for GroupMe
#[derive(Debug, Parser)]
#[command(name = "pushbot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "PUSHBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// User id whose message stream to subscribe to
    #[arg(long, env = "GROUPME_USER_ID")]
    pub user_id: Option<String>,

    /// API access token
    #[arg(long, env = "GROUPME_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Command that activates the bot
    #[arg(long)]
    pub trigger: Option<String>,

    /// Text posted when the trigger matches
    #[arg(long)]
    pub reply: Option<String>,

    /// Push bus websocket endpoint
    #[arg(long)]
    pub push_url: Option<String>,

    /// REST API base URL
    #[arg(long)]
    pub api_base: Option<String>,
}

impl Cli {
    /// Overlays CLI values onto the loaded configuration.
    pub fn apply(&self, mut config: BotConfig) -> BotConfig {
        if let Some(ref user_id) = self.user_id {
            config.user_id = user_id.clone();
        }
        if let Some(ref access_token) = self.access_token {
            config.access_token = access_token.clone();
        }
        if let Some(ref trigger) = self.trigger {
            config.trigger = trigger.clone();
        }
        if let Some(ref reply) = self.reply {
            config.reply = reply.clone();
        }
        if let Some(ref push_url) = self.push_url {
            config.push_url = push_url.clone();
        }
        if let Some(ref api_base) = self.api_base {
            config.api_base = api_base.clone();
        }
        config
    }
}
