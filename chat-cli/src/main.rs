//! chat CLI: create conversations, send direct/group messages, page history, mark as seen.
//! Config from env (and `.env`); output is JSON on stdout.

use std::process::ExitCode;

use anyhow::{Context, Result};
use chat_cli::{build_service, execute, ChatConfig, Cli};
use chat_core::ChatError;
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = ChatConfig::load()?;
    config.validate()?;

    chat_core::init_tracing(&config.log_file)
        .with_context(|| format!("Initialize logging to {}", config.log_file))?;

    let app = build_service(&config).await?;

    match execute(&app, cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        // Caller mistakes get their own exit code so scripts can tell them from outages.
        Err(err) if err.downcast_ref::<ChatError>().is_some_and(ChatError::is_client_error) => {
            error!(error = %err, "Request rejected");
            eprintln!("error: {}", err);
            Ok(ExitCode::from(2))
        }
        Err(err) => Err(err),
    }
}
