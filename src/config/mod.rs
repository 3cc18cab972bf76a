//! Bridge configuration (code > env > defaults), read once at startup.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bon::Builder;

use crate::auth::store::{default_token_dir, CredentialStore, FileTokenStore};
use crate::error::BridgeError;
use crate::util::RetryPolicy;

pub const DEFAULT_API_BASE: &str = "https://api.dev.cybershuttle.org:18899";
pub const DEFAULT_AUTH_URL: &str = "https://auth.cybershuttle.org";
pub const DEFAULT_REALM: &str = "default";
pub const DEFAULT_CLIENT_ID: &str = "cybershuttle-agent";

/// Immutable configuration for the bridge.
///
/// # Example
/// ```
/// use shuttle_bridge::config::BridgeConfig;
///
/// let config = BridgeConfig::builder()
///     .api_base("http://localhost:8080")
///     .static_token("dev-token")
///     .build();
/// assert_eq!(config.token_url(), "https://auth.cybershuttle.org/realms/default/protocol/openid-connect/token");
/// ```
#[derive(Clone, Builder)]
pub struct BridgeConfig {
    /// Catalog API origin; tool paths are appended under `/api/v1/rf`.
    #[builder(into, default = DEFAULT_API_BASE.to_string())]
    pub api_base: String,
    /// Keycloak origin.
    #[builder(into, default = DEFAULT_AUTH_URL.to_string())]
    pub auth_url: String,
    #[builder(into, default = DEFAULT_REALM.to_string())]
    pub realm: String,
    #[builder(into, default = DEFAULT_CLIENT_ID.to_string())]
    pub client_id: String,
    #[builder(into, default = "openid".to_string())]
    pub scope: String,
    /// Development bearer token used in place of the device flow.
    #[builder(into)]
    pub static_token: Option<String>,
    #[builder(default = 3600)]
    pub static_token_ttl_secs: u64,
    #[builder(default = 30)]
    pub request_timeout_secs: u64,
    /// Mirror credentials to `token_dir` so restarts skip the device flow.
    #[builder(default)]
    pub persist_tokens: bool,
    #[builder(into)]
    pub token_dir: Option<PathBuf>,
    #[builder(default)]
    pub retry: RetryPolicy,
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("api_base", &self.api_base)
            .field("auth_url", &self.auth_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("static_token", &self.static_token.as_ref().map(|_| "<redacted>"))
            .field("static_token_ttl_secs", &self.static_token_ttl_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("persist_tokens", &self.persist_tokens)
            .field("token_dir", &self.token_dir)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BridgeConfig {
    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self, BridgeError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let persist_tokens = match get("CYBERSHUTTLE_PERSIST_TOKENS") {
            Some(raw) => parse_bool("CYBERSHUTTLE_PERSIST_TOKENS", &raw)?,
            None => true,
        };
        let request_timeout_secs = get("CYBERSHUTTLE_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_secs("CYBERSHUTTLE_REQUEST_TIMEOUT_SECS", &raw))
            .transpose()?;
        let static_token_ttl_secs = get("CYBERSHUTTLE_STATIC_TOKEN_TTL_SECS")
            .map(|raw| parse_secs("CYBERSHUTTLE_STATIC_TOKEN_TTL_SECS", &raw))
            .transpose()?;

        let config = Self::builder()
            .maybe_api_base(get("CYBERSHUTTLE_API_BASE"))
            .maybe_auth_url(get("CYBERSHUTTLE_AUTH_URL"))
            .maybe_realm(get("CYBERSHUTTLE_REALM"))
            .maybe_client_id(get("CYBERSHUTTLE_CLIENT_ID"))
            .maybe_static_token(get("CS_ACCESS_TOKEN"))
            .maybe_static_token_ttl_secs(static_token_ttl_secs)
            .maybe_request_timeout_secs(request_timeout_secs)
            .persist_tokens(persist_tokens)
            .maybe_token_dir(get("CYBERSHUTTLE_TOKEN_DIR").map(PathBuf::from))
            .build();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        self.api_base_url()?;
        reqwest::Url::parse(self.auth_url.trim_end_matches('/')).map_err(|err| {
            BridgeError::Configuration(format!("invalid auth url {}: {err}", self.auth_url))
        })?;
        if self.realm.trim().is_empty() || self.client_id.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "realm and client id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn realm_endpoint(&self, suffix: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{suffix}",
            self.auth_url.trim_end_matches('/'),
            self.realm
        )
    }

    pub fn device_authorization_url(&self) -> String {
        self.realm_endpoint("auth/device")
    }

    pub fn token_url(&self) -> String {
        self.realm_endpoint("token")
    }

    pub fn api_base_url(&self) -> Result<reqwest::Url, BridgeError> {
        reqwest::Url::parse(self.api_base.trim_end_matches('/')).map_err(|err| {
            BridgeError::Configuration(format!("invalid api base {}: {err}", self.api_base))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_dir(&self) -> PathBuf {
        self.token_dir.clone().unwrap_or_else(default_token_dir)
    }

    /// HTTP client shared by the auth client and the dispatcher.
    pub fn http_client(&self) -> Result<reqwest::Client, BridgeError> {
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .build()
            .map_err(|err| BridgeError::Configuration(format!("http client: {err}")))
    }

    /// Credential store for this configuration, restored from disk when persistence is on.
    pub fn credential_store(&self) -> Arc<CredentialStore> {
        if !self.persist_tokens {
            return Arc::new(CredentialStore::in_memory());
        }
        let store = CredentialStore::with_backend(Arc::new(FileTokenStore::new(self.token_dir())));
        if let Err(err) = store.restore() {
            tracing::warn!(error = %err, "ignoring unreadable persisted credential");
        }
        Arc::new(store)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, BridgeError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BridgeError::Configuration(format!(
            "{key} must be a boolean, got {raw:?}"
        ))),
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, BridgeError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(BridgeError::Configuration(format!(
            "{key} must be a positive number of seconds, got {raw:?}"
        ))),
    }
}
