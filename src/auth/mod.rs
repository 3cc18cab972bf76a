//! Credential lifecycle: device-flow login, token storage, refresh and the guard.

pub mod client;
pub mod credential;
pub mod device_code;
pub mod device_flow;
pub mod error;
pub mod guard;
pub mod service;
pub mod store;

pub use client::DeviceAuthClient;
pub use credential::{Credential, CredentialSource};
pub use device_code::{DeviceAuthorizationSession, DevicePoll, FlowState, SLOW_DOWN_STEP};
pub use device_flow::{
    DeviceFlowAuthenticator, PollSleeper, StderrPrompt, TokioSleeper, VerificationPrompt,
};
pub use error::AuthError;
pub use guard::{TokenGuard, SAFETY_MARGIN_SECS};
pub use service::{AuthService, AuthStatus};
pub use store::{default_token_dir, CredentialStore, FileTokenStore, TokenStore};
