//! Azrag Web Server
//!
//! Serves `POST /chat` backed by Azure OpenAI and Azure AI Search.

use anyhow::Context;
use azrag_core::{init_logging, AppConfig, LogFormat, LoggingConfig};
use azrag_web::{AppState, AzragServer, WebConfig};
use clap::Parser;
use tracing::info;

/// Azrag Web Server - retrieval-augmented chat endpoint
#[derive(Parser)]
#[command(name = "azrag-web")]
#[command(about = "HTTP chat endpoint over an Azure AI Search index")]
#[command(version)]
struct Args {
    /// Server host to bind to (default: AZRAG_HOST or 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on (default: AZRAG_PORT or 5000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (compact, pretty, json)
    #[arg(long, default_value = "compact")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logging = LoggingConfig::with_level(&args.log_level);
    logging.format = args.log_format;
    logging
        .filter_directives
        .push(format!("tower_http={}", args.log_level));
    init_logging(&logging).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // Loads .env before reading anything else
    let app_config = AppConfig::from_env().context("Failed to load configuration")?;

    let mut config = WebConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    info!(
        openai = %app_config.openai.endpoint,
        deployment = %app_config.openai.chat_deployment,
        search = %app_config.search.endpoint,
        index = %app_config.search.index,
        "Starting azrag web server"
    );

    let state = AppState::from_app_config(config.clone(), &app_config)?;
    AzragServer::new(config, state).start().await?;

    Ok(())
}
