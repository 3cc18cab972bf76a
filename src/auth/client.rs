use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::auth::credential::{Credential, CredentialSource};
use crate::auth::device_code::{DevicePoll, DeviceAuthorizationSession};
use crate::auth::error::AuthError;
use crate::config::BridgeConfig;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_DEVICE_EXPIRES_IN_SECS: i64 = 1800;
const DEFAULT_TOKEN_EXPIRES_IN_SECS: i64 = 3600;

/// HTTP client for the two grants the bridge needs: device code and refresh token.
///
/// # Example
/// ```no_run
/// use shuttle_bridge::auth::DeviceAuthClient;
/// use shuttle_bridge::config::BridgeConfig;
///
/// let config = BridgeConfig::default();
/// let client = DeviceAuthClient::from_config(&config, reqwest::Client::new());
/// # let _ = client;
/// ```
#[derive(Debug, Clone)]
pub struct DeviceAuthClient {
    http: reqwest::Client,
    client_id: String,
    scope: String,
    device_authorization_url: String,
    token_url: String,
}

impl DeviceAuthClient {
    pub fn new(
        http: reqwest::Client,
        client_id: impl Into<String>,
        device_authorization_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            scope: "openid".to_string(),
            device_authorization_url: device_authorization_url.into(),
            token_url: token_url.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig, http: reqwest::Client) -> Self {
        Self::new(
            http,
            config.client_id.clone(),
            config.device_authorization_url(),
            config.token_url(),
        )
        .with_scope(config.scope.clone())
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_device_authorization_url(mut self, url: impl Into<String>) -> Self {
        self.device_authorization_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub async fn start_device_authorization(
        &self,
    ) -> Result<DeviceAuthorizationSession, AuthError> {
        let resp = self
            .http
            .post(&self.device_authorization_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Protocol(format!(
                "device authorization request failed with status {status}: {body}"
            )));
        }
        let payload: DeviceAuthorizationResponse = resp.json().await?;
        let expires_in = payload.expires_in.unwrap_or(DEFAULT_DEVICE_EXPIRES_IN_SECS);
        if expires_in <= 0 {
            return Err(AuthError::Protocol(format!(
                "device authorization expires_in must be positive, got {expires_in}"
            )));
        }
        Ok(DeviceAuthorizationSession {
            device_code: payload.device_code,
            user_code: payload.user_code,
            verification_uri: payload.verification_uri,
            verification_uri_complete: payload.verification_uri_complete,
            // A zero interval would poll without pause until the deadline.
            interval: std::time::Duration::from_secs(
                payload
                    .interval
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }

    /// Poll the token endpoint once.
    ///
    /// Keycloak reports pending/denied/expired as HTTP 400 with an `error`
    /// code; some servers use 200. Both are accepted.
    pub async fn poll_token(
        &self,
        session: &DeviceAuthorizationSession,
    ) -> Result<DevicePoll, AuthError> {
        let resp = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.client_id.as_str()),
                ("device_code", session.device_code.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if status.is_server_error() {
            return Err(AuthError::Network(format!(
                "token endpoint returned {status}"
            )));
        }
        let payload: TokenEndpointResponse = serde_json::from_str(&text).map_err(|_| {
            AuthError::Protocol(format!("token endpoint returned {status}: {text}"))
        })?;

        if status.is_success() {
            if let Some(access_token) = payload.access_token.clone() {
                let credential = Credential::issued(
                    access_token,
                    payload.expires_in()?,
                    payload.refresh_token.clone(),
                    payload.scope.as_deref(),
                    CredentialSource::DeviceFlow,
                    Utc::now(),
                );
                return Ok(DevicePoll::Authorized(credential));
            }
        }

        match payload.error.as_deref() {
            Some("authorization_pending") => Ok(DevicePoll::Pending),
            Some("slow_down") => Ok(DevicePoll::SlowDown),
            Some("access_denied") => Ok(DevicePoll::Denied),
            Some("expired_token") => Ok(DevicePoll::Expired),
            Some(other) => Err(AuthError::Protocol(format!(
                "token endpoint error {other}: {}",
                payload.error_description.as_deref().unwrap_or("no description")
            ))),
            None => Err(AuthError::Protocol(format!(
                "token endpoint returned {status} without token or error"
            ))),
        }
    }

    /// Exchange the refresh token of `current` for a new access token.
    pub async fn refresh(&self, current: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::RefreshRejected("no refresh token".to_string()))?;
        let resp = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        let payload: TokenEndpointResponse = serde_json::from_str(&text).unwrap_or_default();

        if !status.is_success() {
            let reason = payload
                .error
                .unwrap_or_else(|| format!("status {status}"));
            if status.is_server_error() {
                return Err(AuthError::Network(format!("refresh failed: {reason}")));
            }
            return Err(AuthError::RefreshRejected(reason));
        }
        let access_token = payload.access_token.clone().ok_or_else(|| {
            AuthError::Protocol("refresh response missing access_token".to_string())
        })?;
        Ok(current.refreshed(
            access_token,
            payload.expires_in()?,
            payload.refresh_token.clone(),
            payload.scope.as_deref(),
            Utc::now(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct DeviceAuthorizationResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    verification_uri_complete: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenEndpointResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenEndpointResponse {
    fn expires_in(&self) -> Result<Duration, AuthError> {
        match self.expires_in {
            None => Ok(Duration::seconds(DEFAULT_TOKEN_EXPIRES_IN_SECS)),
            Some(secs) if secs > 0 => Ok(Duration::seconds(secs)),
            Some(secs) => Err(AuthError::Protocol(format!(
                "token expires_in must be positive, got {secs}"
            ))),
        }
    }
}
