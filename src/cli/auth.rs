//! CLI auth command handlers for login, status, and logout.

use std::sync::Arc;

use crate::auth::{AuthService, AuthStatus, DeviceAuthClient, DeviceFlowAuthenticator};
use crate::config::BridgeConfig;

fn service(config: &BridgeConfig) -> Result<AuthService, Box<dyn std::error::Error>> {
    // Credentials from `auth login` are only useful if they outlive the process.
    let mut config = config.clone();
    config.persist_tokens = true;
    let store = config.credential_store();
    let client = Arc::new(DeviceAuthClient::from_config(&config, config.http_client()?));
    let authenticator = Arc::new(DeviceFlowAuthenticator::new(client, store.clone()));
    Ok(AuthService::new(store, authenticator))
}

/// Handle `shuttle-bridge auth login`.
pub async fn handle_login(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let credential = service(config)?.login().await?;
    println!("Login successful.");
    println!("   Expires: {}", credential.expires_at.to_rfc3339());
    if credential.can_refresh() {
        println!("   Refresh token stored; the bridge will renew access automatically.");
    }
    Ok(())
}

/// Handle `shuttle-bridge auth status`.
pub async fn handle_status(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    match service(config)?.status() {
        AuthStatus::LoggedIn {
            expires_at,
            source,
            refreshable,
        } => {
            println!("Logged in ({source:?})");
            println!("   Expires: {}", expires_at.to_rfc3339());
            println!("   Refreshable: {refreshable}");
        }
        AuthStatus::Expired {
            expired_at,
            refreshable,
        } => {
            println!("Credential expired at {}", expired_at.to_rfc3339());
            if refreshable {
                println!("   It will be refreshed on the next tool call.");
            } else {
                println!("   Run `shuttle-bridge auth login` to sign in again.");
            }
        }
        AuthStatus::LoggedOut => {
            println!("Not logged in");
        }
    }
    if config.static_token.as_deref().is_some_and(|t| !t.is_empty()) {
        println!("   CS_ACCESS_TOKEN is set and will be used when no stored credential is valid.");
    }
    Ok(())
}

/// Handle `shuttle-bridge auth logout`.
pub async fn handle_logout(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    service(config)?.logout()?;
    println!("Logged out");
    Ok(())
}
