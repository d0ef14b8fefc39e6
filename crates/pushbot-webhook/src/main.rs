//! pushbot-webhook entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use pushbot_api::GroupMeClient;
use pushbot_core::{TracingConfig, init_tracing};
use pushbot_webhook::config::WebhookConfig;
use pushbot_webhook::{AppState, router};

/// pushbot-webhook - callback bot for GroupMe
#[derive(Debug, Parser)]
#[command(name = "pushbot-webhook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "PUSHBOT_WEBHOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    debug: bool,

    /// Bot id used for replies
    #[arg(long, env = "GROUPME_BOT_ID")]
    bot_id: Option<String>,

    /// Substring that activates the bot
    #[arg(long)]
    trigger: Option<String>,

    /// Text posted when the trigger matches
    #[arg(long)]
    reply: Option<String>,

    /// REST API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long)]
    bind_addr: Option<String>,
}

impl Cli {
    fn apply(&self, mut config: WebhookConfig) -> WebhookConfig {
        if let Some(ref bot_id) = self.bot_id {
            config.bot_id = bot_id.clone();
        }
        if let Some(ref trigger) = self.trigger {
            config.trigger = trigger.clone();
        }
        if let Some(ref reply) = self.reply {
            config.reply = reply.clone();
        }
        if let Some(ref api_base) = self.api_base {
            config.api_base = api_base.clone();
        }
        if let Some(ref bind_addr) = self.bind_addr {
            config.bind_addr = bind_addr.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::daemon()
    };
    if let Err(err) = init_tracing(tracing_config) {
        eprintln!("error: {}", err);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = if let Some(ref path) = cli.config {
        WebhookConfig::load_from(path)?
    } else {
        WebhookConfig::load()?
    };
    let config = cli.apply(config);
    config.validate()?;

    let api = GroupMeClient::new(config.api_base.as_str())?;
    let state = AppState::new(Arc::new(api), &config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "webhook bot listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        info!("ctrl-c handler unavailable; running until killed");
        std::future::pending::<()>().await;
    }
}
