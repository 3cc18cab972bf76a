//! shuttle-bridge CLI binary entry point.

use std::sync::Arc;

use clap::Parser;
use shuttle_bridge::cli::{AuthCommands, CallArgs, Cli, Commands};
use shuttle_bridge::config::BridgeConfig;
use shuttle_bridge::dispatch::{CallDispatcher, HealthStatus};
use shuttle_bridge::mcp::{McpServer, ToolDefinition};
use shuttle_bridge::tools::{ToolCatalog, ToolInvocation};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // stdout carries MCP frames; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Tools = cli.command {
        return handle_tools();
    }
    let config = cli.config()?;
    match cli.command {
        Commands::Serve => handle_serve(&config).await,
        Commands::Tools => handle_tools(),
        Commands::Call(args) => handle_call(&config, args).await,
        Commands::Health => handle_health(&config).await,
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login => shuttle_bridge::cli::auth::handle_login(&config).await,
            AuthCommands::Status => shuttle_bridge::cli::auth::handle_status(&config).await,
            AuthCommands::Logout => shuttle_bridge::cli::auth::handle_logout(&config).await,
        },
    }
}

async fn handle_serve(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(api_base = %config.api_base, "starting bridge");
    let dispatcher = Arc::new(CallDispatcher::from_config(config)?);
    Arc::new(McpServer::new(dispatcher)).run_stdio().await?;
    Ok(())
}

fn handle_tools() -> Result<(), Box<dyn std::error::Error>> {
    let tools: Vec<ToolDefinition> = ToolCatalog::standard()
        .iter()
        .map(ToolDefinition::from)
        .collect();
    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}

async fn handle_call(config: &BridgeConfig, args: CallArgs) -> Result<(), Box<dyn std::error::Error>> {
    let arguments: serde_json::Value = serde_json::from_str(&args.args)
        .map_err(|e| format!("--args must be a JSON object: {e}"))?;
    let dispatcher = CallDispatcher::from_config(config)?;
    let result = dispatcher
        .dispatch(&ToolInvocation::new(args.tool, arguments))
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.is_success() {
        std::process::exit(2);
    }
    Ok(())
}

async fn handle_health(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = CallDispatcher::from_config(config)?;
    let report = dispatcher.health().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.status != HealthStatus::Healthy {
        std::process::exit(1);
    }
    Ok(())
}
