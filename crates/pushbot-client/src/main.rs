//! pushbot entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use pushbot_api::GroupMeClient;
use pushbot_client::cli::Cli;
use pushbot_client::client::PushClient;
use pushbot_client::config::BotConfig;
use pushbot_client::error::{ClientError, ClientResult};
use pushbot_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
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

async fn run(cli: Cli) -> ClientResult<()> {
    let config = if let Some(ref path) = cli.config {
        BotConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        BotConfig::load().map_err(ClientError::Config)?
    };
    let config = cli.apply(config);
    config.validate().map_err(ClientError::Config)?;

    let api = GroupMeClient::new(config.api_base.as_str())?
        .with_access_token(config.access_token.as_str());
    let client = PushClient::new(config, Arc::new(api));
    client.run().await
}
