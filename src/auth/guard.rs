use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::client::DeviceAuthClient;
use crate::auth::credential::Credential;
use crate::auth::device_flow::DeviceFlowAuthenticator;
use crate::auth::error::AuthError;
use crate::auth::store::CredentialStore;
use crate::config::BridgeConfig;

/// Credentials expiring within this many seconds are treated as stale.
pub const SAFETY_MARGIN_SECS: i64 = 30;

#[derive(Clone)]
struct StaticToken {
    token: String,
    ttl: Duration,
}

/// Single gate that hands out bearer credentials for outbound calls.
///
/// Order of preference: a fresh stored credential, a refresh-token grant, the
/// configured static development token, and finally the device flow. A
/// credential returned from here never expires within the safety margin.
pub struct TokenGuard {
    store: Arc<CredentialStore>,
    client: Arc<DeviceAuthClient>,
    authenticator: Arc<DeviceFlowAuthenticator>,
    static_token: Option<StaticToken>,
    safety_margin: Duration,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl TokenGuard {
    pub fn new(
        store: Arc<CredentialStore>,
        client: Arc<DeviceAuthClient>,
        authenticator: Arc<DeviceFlowAuthenticator>,
    ) -> Self {
        Self {
            store,
            client,
            authenticator,
            static_token: None,
            safety_margin: Duration::seconds(SAFETY_MARGIN_SECS),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_config(
        config: &BridgeConfig,
        http: reqwest::Client,
        store: Arc<CredentialStore>,
    ) -> Self {
        let client = Arc::new(DeviceAuthClient::from_config(config, http));
        let authenticator = Arc::new(DeviceFlowAuthenticator::new(
            client.clone(),
            store.clone(),
        ));
        let guard = Self::new(store, client, authenticator);
        match &config.static_token {
            Some(token) if !token.trim().is_empty() => guard.with_static_token(
                token.trim(),
                Duration::seconds(config.static_token_ttl_secs as i64),
            ),
            _ => guard,
        }
    }

    pub fn with_static_token(mut self, token: impl Into<String>, ttl: Duration) -> Self {
        self.static_token = Some(StaticToken {
            token: token.into(),
            ttl,
        });
        self
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    pub fn authenticator(&self) -> &Arc<DeviceFlowAuthenticator> {
        &self.authenticator
    }

    /// Return a valid credential, refreshing or re-authenticating as needed.
    pub async fn acquire(&self) -> Result<Credential, AuthError> {
        if let Some(credential) = self.acquire_cached().await? {
            return Ok(credential);
        }
        tracing::info!("no usable credential; starting device authorization");
        self.authenticator
            .authenticate()
            .await
            .map_err(AuthError::required)
    }

    /// Like [`acquire`](Self::acquire) but never starts a device flow.
    pub async fn acquire_cached(&self) -> Result<Option<Credential>, AuthError> {
        if let Some(credential) = self.fresh_from_store() {
            return Ok(Some(credential));
        }
        if let Some(credential) = self.try_refresh().await? {
            return Ok(Some(credential));
        }
        if let Some(static_token) = &self.static_token {
            let credential =
                Credential::from_static(static_token.token.clone(), static_token.ttl, Utc::now());
            // Static tokens come from the environment on every start; never persist them.
            self.store.set_in_memory(credential.clone());
            tracing::debug!(expires_at = %credential.expires_at, "using static access token");
            return Ok(Some(credential));
        }
        Ok(None)
    }

    /// Drop the current credential after the catalog rejected it.
    pub fn invalidate(&self) -> Result<(), AuthError> {
        tracing::debug!("invalidating stored credential");
        self.store.clear()
    }

    fn fresh_from_store(&self) -> Option<Credential> {
        self.store
            .get()
            .filter(|credential| credential.is_fresh_at(Utc::now(), self.safety_margin))
    }

    async fn try_refresh(&self) -> Result<Option<Credential>, AuthError> {
        if !self.store.get().is_some_and(|c| c.can_refresh()) {
            return Ok(None);
        }
        let _serialized = self.refresh_lock.lock().await;

        // Another caller may have refreshed while this one waited.
        let current = match self.store.get() {
            Some(credential) if credential.is_fresh_at(Utc::now(), self.safety_margin) => {
                return Ok(Some(credential));
            }
            Some(credential) if credential.can_refresh() => credential,
            _ => return Ok(None),
        };

        match self.client.refresh(&current).await {
            Ok(refreshed) => {
                self.store.set(refreshed.clone())?;
                tracing::info!(expires_at = %refreshed.expires_at, "access token refreshed");
                Ok(Some(refreshed))
            }
            Err(AuthError::RefreshRejected(reason)) => {
                tracing::warn!(reason = %reason, "refresh token rejected; discarding credential");
                self.store.clear()?;
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                Ok(None)
            }
        }
    }
}
