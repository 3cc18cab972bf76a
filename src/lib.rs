//! shuttle-bridge: MCP tool bridge for the Cybershuttle research catalog.
//!
//! Exposes the catalog (resources, projects, sessions) as MCP tools and
//! executes each call with a valid bearer credential obtained through the
//! OAuth2 device-authorization grant, a refresh token, or a static token.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use shuttle_bridge::config::BridgeConfig;
//! use shuttle_bridge::dispatch::CallDispatcher;
//! use shuttle_bridge::mcp::McpServer;
//!
//! # async fn example() -> shuttle_bridge::error::Result<()> {
//! let config = BridgeConfig::from_env()?;
//! let dispatcher = Arc::new(CallDispatcher::from_config(&config)?);
//! Arc::new(McpServer::new(dispatcher)).run_stdio().await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mcp;
pub mod prelude;
pub mod tools;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
