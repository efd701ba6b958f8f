use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tira_context::{ContextConfig, ContextError, ContextManager};
use tira_runtime::OpenAIProvider;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "tira",
    version,
    about = "Tira chat client",
    long_about = "Chat with an OpenAI-compatible model while Tira keeps a rolling summary of the conversation"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "OPENAI_API_KEY",
        hide_env_values = true,
        help = "API key for the completion endpoint"
    )]
    pub api_key: Option<String>,
    #[arg(
        long,
        global = true,
        env = "OPENAI_API_BASE",
        default_value = "https://api.openai.com/v1",
        help = "Completion endpoint base URL"
    )]
    pub base_url: String,
    #[arg(long, global = true, env = "TIRA_MODEL", help = "Model identifier")]
    pub model: Option<String>,
    #[arg(
        long,
        global = true,
        default_value = "local",
        help = "Conversation identifier to keep history under"
    )]
    pub conversation: String,
    #[arg(long, global = true, help = "Per-request timeout in seconds")]
    pub timeout_secs: Option<u64>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Ask a single question and print the answer")]
    Ask {
        #[arg(help = "Question text")]
        question: String,
    },
    #[command(about = "Start an interactive chat (default)")]
    Chat,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Resolve persona settings from the environment, then apply flag overrides.
pub fn context_config(cli: &Cli) -> Result<ContextConfig, CliError> {
    let mut config = ContextConfig::from_env()?;
    if let Some(model) = &cli.model {
        config = config.with_model(model.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

pub fn build_manager(cli: &Cli) -> Result<ContextManager, CliError> {
    let api_key = cli.api_key.clone().ok_or_else(|| {
        CliError::InvalidArgument("--api-key or OPENAI_API_KEY is required".to_string())
    })?;
    let config = context_config(cli)?;
    let default_model = config.model.clone().unwrap_or_default();
    let provider = Arc::new(OpenAIProvider::new(api_key, cli.base_url.clone(), default_model));

    tracing::debug!(base_url = %cli.base_url, model = ?config.model, "context manager ready");
    Ok(ContextManager::new(provider, config))
}

/// Run a one-shot command. Returns `None` when the interactive chat was asked for.
pub async fn run(cli: &Cli, manager: &ContextManager) -> Result<Option<String>, CliError> {
    match &cli.command {
        Some(Commands::Ask { question }) => {
            let answer = manager.ask(&cli.conversation, question).await?;
            Ok(Some(answer))
        }
        Some(Commands::Chat) | None => Ok(None),
    }
}
