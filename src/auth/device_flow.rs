//! Device-authorization runs, joined across concurrent callers.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::auth::client::DeviceAuthClient;
use crate::auth::credential::Credential;
use crate::auth::device_code::{DeviceAuthorizationSession, FlowState};
use crate::auth::error::AuthError;
use crate::auth::store::CredentialStore;

/// Shows the verification URI and user code to the operator.
pub trait VerificationPrompt: Send + Sync {
    fn present(&self, session: &DeviceAuthorizationSession);
}

/// Writes the prompt to stderr; stdout is reserved for protocol frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrPrompt;

impl VerificationPrompt for StderrPrompt {
    fn present(&self, session: &DeviceAuthorizationSession) {
        eprintln!();
        eprintln!("To authorize this bridge, open:");
        eprintln!("  {}", session.verification_uri);
        eprintln!("and enter the code: {}", session.user_code);
        if let Some(complete) = &session.verification_uri_complete {
            eprintln!("(or open {complete} directly)");
        }
        eprintln!();
    }
}

/// Suspends the poll loop between token-endpoint requests.
#[async_trait]
pub trait PollSleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl PollSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

type SharedRun = Shared<BoxFuture<'static, Result<Credential, AuthError>>>;

#[derive(Clone)]
struct FlowRunner {
    client: Arc<DeviceAuthClient>,
    store: Arc<CredentialStore>,
    prompt: Arc<dyn VerificationPrompt>,
    sleeper: Arc<dyn PollSleeper>,
}

impl FlowRunner {
    async fn run(self) -> Result<Credential, AuthError> {
        let session = self.client.start_device_authorization().await?;
        tracing::info!(
            user_code = %session.user_code,
            verification_uri = %session.verification_uri,
            expires_at = %session.expires_at,
            "device authorization started"
        );
        self.prompt.present(&session);

        let mut state = FlowState::start(&session);
        let outcome = loop {
            let interval = match state {
                FlowState::Waiting { interval } => interval,
                terminal => break terminal,
            };
            if session.is_expired_at(Utc::now()) {
                break FlowState::Expired;
            }
            self.sleeper.sleep(interval).await;
            if session.is_expired_at(Utc::now()) {
                break FlowState::Expired;
            }
            match self.client.poll_token(&session).await {
                Ok(poll) => state = state.on_poll(poll),
                Err(AuthError::Network(message)) => {
                    tracing::warn!(error = %message, "device token poll failed; polling again");
                }
                Err(err) => return Err(err),
            }
        };

        match outcome {
            FlowState::Succeeded(credential) => {
                if let Err(err) = self.store.set(credential.clone()) {
                    tracing::error!(error = %err, "approved credential could not be saved");
                    return Err(err);
                }
                tracing::info!(expires_at = %credential.expires_at, "device authorization complete");
                Ok(credential)
            }
            FlowState::Denied => {
                tracing::warn!("device authorization denied");
                Err(AuthError::AuthorizationDenied)
            }
            FlowState::Expired | FlowState::Waiting { .. } => {
                tracing::warn!("device authorization expired");
                Err(AuthError::AuthorizationExpired)
            }
        }
    }
}

/// Drives the device-authorization grant.
///
/// At most one run is in flight; callers arriving while it runs join it and
/// receive the same outcome. The credential is published to the store only
/// on success.
pub struct DeviceFlowAuthenticator {
    runner: FlowRunner,
    in_flight: Mutex<Option<SharedRun>>,
    safety_margin: chrono::Duration,
}

impl DeviceFlowAuthenticator {
    pub fn new(client: Arc<DeviceAuthClient>, store: Arc<CredentialStore>) -> Self {
        Self {
            runner: FlowRunner {
                client,
                store,
                prompt: Arc::new(StderrPrompt),
                sleeper: Arc::new(TokioSleeper),
            },
            in_flight: Mutex::new(None),
            safety_margin: chrono::Duration::seconds(crate::auth::guard::SAFETY_MARGIN_SECS),
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn VerificationPrompt>) -> Self {
        self.runner.prompt = prompt;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn PollSleeper>) -> Self {
        self.runner.sleeper = sleeper;
        self
    }

    pub fn with_safety_margin(mut self, margin: chrono::Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Run the device flow, or join the run already in progress.
    pub async fn authenticate(&self) -> Result<Credential, AuthError> {
        self.join_or_start(true).await
    }

    /// Start a new run even when the store holds a fresh credential.
    pub async fn force_authenticate(&self) -> Result<Credential, AuthError> {
        self.join_or_start(false).await
    }

    async fn join_or_start(&self, reuse_fresh: bool) -> Result<Credential, AuthError> {
        let run = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(run) if run.peek().is_none() => {
                    tracing::debug!("joining in-flight device authorization");
                    run.clone()
                }
                _ => {
                    // A run may have finished between the caller's store check and here.
                    if reuse_fresh {
                        if let Some(credential) = self
                            .runner
                            .store
                            .get()
                            .filter(|c| c.is_fresh_at(Utc::now(), self.safety_margin))
                        {
                            return Ok(credential);
                        }
                    }
                    let runner = self.runner.clone();
                    let run = async move { runner.run().await }.boxed().shared();
                    *slot = Some(run.clone());
                    run
                }
            }
        };
        run.await
    }
}
