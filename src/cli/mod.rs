//! CLI entry point for shuttle-bridge.

pub mod auth;

use clap::{Parser, Subcommand};

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Cybershuttle catalog bridge
#[derive(Parser, Debug)]
#[command(
    name = "shuttle-bridge",
    version,
    about = "MCP tool bridge for the Cybershuttle research catalog"
)]
pub struct Cli {
    /// Override the catalog API base URL
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve MCP over stdin/stdout
    Serve,
    /// Print the tool definitions as JSON
    Tools,
    /// Invoke a single tool and print the result
    Call(CallArgs),
    /// Check credential and catalog connectivity
    Health,
    /// Authentication management
    Auth(AuthArgs),
}

/// Arguments for `shuttle-bridge call`.
#[derive(Parser, Debug)]
pub struct CallArgs {
    /// Tool name, e.g. list_resources
    pub tool: String,

    /// Tool arguments as a JSON object
    #[arg(short, long, default_value = "{}")]
    pub args: String,
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Run the device authorization flow and store the credential
    Login,
    /// Show the stored credential state
    Status,
    /// Remove the stored credential
    Logout,
}

impl Cli {
    /// Load configuration from the environment and apply CLI overrides.
    pub fn config(&self) -> Result<BridgeConfig, BridgeError> {
        let mut config = BridgeConfig::from_env()?;
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.clone();
            config.validate()?;
        }
        Ok(config)
    }
}
