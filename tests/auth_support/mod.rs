#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use shuttle_bridge::auth::{
    AuthError, Credential, CredentialSource, CredentialStore, DeviceAuthClient,
    DeviceAuthorizationSession, DeviceFlowAuthenticator, PollSleeper, TokenGuard, TokenStore,
    VerificationPrompt,
};
use shuttle_bridge::dispatch::CallDispatcher;
use shuttle_bridge::util::RetryPolicy;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DEVICE_PATH: &str = "/realms/default/protocol/openid-connect/auth/device";
pub const TOKEN_PATH: &str = "/realms/default/protocol/openid-connect/token";

#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<String, Credential>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, profile: &str) -> Option<Credential> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .get(profile)
            .cloned()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self, profile: &str) -> Result<Option<Credential>, AuthError> {
        Ok(self.get(profile))
    }

    fn save(&self, profile: &str, credential: &Credential) -> Result<(), AuthError> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert(profile.to_string(), credential.clone());
        Ok(())
    }

    fn clear(&self, profile: &str) -> Result<(), AuthError> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .remove(profile);
        Ok(())
    }
}

/// Backend whose every read and write fails.
pub struct FailingTokenStore;

impl TokenStore for FailingTokenStore {
    fn load(&self, _profile: &str) -> Result<Option<Credential>, AuthError> {
        Err(AuthError::Storage("token file unreadable".into()))
    }

    fn save(&self, _profile: &str, _credential: &Credential) -> Result<(), AuthError> {
        Err(AuthError::Storage("token dir is read-only".into()))
    }

    fn clear(&self, _profile: &str) -> Result<(), AuthError> {
        Err(AuthError::Storage("token dir is read-only".into()))
    }
}

/// Records requested poll intervals; optionally sleeps for real for `actual`.
#[derive(Default)]
pub struct RecordingSleeper {
    requested: Mutex<Vec<Duration>>,
    actual: Option<Duration>,
}

impl RecordingSleeper {
    pub fn instant() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeping(actual: Duration) -> Arc<Self> {
        Arc::new(Self {
            requested: Mutex::new(Vec::new()),
            actual: Some(actual),
        })
    }

    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().expect("sleeper lock poisoned").clone()
    }
}

#[async_trait]
impl PollSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.requested
            .lock()
            .expect("sleeper lock poisoned")
            .push(duration);
        if let Some(actual) = self.actual {
            tokio::time::sleep(actual).await;
        }
    }
}

#[derive(Default)]
pub struct RecordingPrompt {
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingPrompt {
    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().expect("prompt lock poisoned").clone()
    }
}

impl VerificationPrompt for RecordingPrompt {
    fn present(&self, session: &DeviceAuthorizationSession) {
        self.shown
            .lock()
            .expect("prompt lock poisoned")
            .push((session.verification_uri.clone(), session.user_code.clone()));
    }
}

pub fn device_client(server: &MockServer) -> Arc<DeviceAuthClient> {
    Arc::new(DeviceAuthClient::new(
        reqwest::Client::new(),
        "cybershuttle-agent",
        format!("{}{DEVICE_PATH}", server.uri()),
        format!("{}{TOKEN_PATH}", server.uri()),
    ))
}

pub struct Harness {
    pub store: Arc<CredentialStore>,
    pub client: Arc<DeviceAuthClient>,
    pub sleeper: Arc<RecordingSleeper>,
    pub prompt: Arc<RecordingPrompt>,
    pub authenticator: Arc<DeviceFlowAuthenticator>,
}

impl Harness {
    pub fn new(server: &MockServer) -> Self {
        Self::with_sleeper(server, RecordingSleeper::instant())
    }

    pub fn with_sleeper(server: &MockServer, sleeper: Arc<RecordingSleeper>) -> Self {
        Self::build(server, Arc::new(CredentialStore::in_memory()), sleeper)
    }

    pub fn with_store(server: &MockServer, store: Arc<CredentialStore>) -> Self {
        Self::build(server, store, RecordingSleeper::instant())
    }

    fn build(
        server: &MockServer,
        store: Arc<CredentialStore>,
        sleeper: Arc<RecordingSleeper>,
    ) -> Self {
        let client = device_client(server);
        let prompt = Arc::new(RecordingPrompt::default());
        let authenticator = Arc::new(
            DeviceFlowAuthenticator::new(client.clone(), store.clone())
                .with_sleeper(sleeper.clone())
                .with_prompt(prompt.clone()),
        );
        Self {
            store,
            client,
            sleeper,
            prompt,
            authenticator,
        }
    }

    pub fn guard(&self) -> TokenGuard {
        TokenGuard::new(
            self.store.clone(),
            self.client.clone(),
            self.authenticator.clone(),
        )
    }

    pub fn dispatcher(&self, server: &MockServer, guard: TokenGuard) -> CallDispatcher {
        CallDispatcher::new(
            reqwest::Client::new(),
            reqwest::Url::parse(&server.uri()).expect("mock server uri"),
            Arc::new(guard),
        )
        .with_retry(fast_retry())
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

pub fn credential(token: &str, expires_in: chrono::Duration, refresh: Option<&str>) -> Credential {
    Credential::issued(
        token,
        expires_in,
        refresh.map(str::to_string),
        Some("openid"),
        CredentialSource::DeviceFlow,
        Utc::now(),
    )
}

pub async fn mount_device_authorization(server: &MockServer, interval: u64, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path(DEVICE_PATH))
        .and(body_string_contains("client_id=cybershuttle-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "D1",
            "user_code": "U1",
            "verification_uri": "https://auth.example.org/device",
            "interval": interval,
            "expires_in": expires_in,
        })))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_token_grant(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("device_code=D1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "expires_in": 3600,
            "refresh_token": "R1",
            "token_type": "Bearer",
        })))
        .mount(server)
        .await;
}

pub fn oauth_error(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({ "error": code }))
}
