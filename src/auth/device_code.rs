use std::time::Duration;

use chrono::{DateTime, Utc};

use super::credential::Credential;

/// Added to the poll interval each time the server answers `slow_down`.
pub const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Device-authorization grant issued by the auth server.
///
/// Lives only for the duration of one device-flow run and is never persisted.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use chrono::Utc;
/// use shuttle_bridge::auth::DeviceAuthorizationSession;
///
/// let session = DeviceAuthorizationSession {
///     device_code: "D1".to_string(),
///     user_code: "U1".to_string(),
///     verification_uri: "https://auth.example.org/device".to_string(),
///     verification_uri_complete: None,
///     interval: Duration::from_secs(5),
///     expires_at: Utc::now() + chrono::Duration::minutes(30),
/// };
/// assert!(!session.is_expired_at(Utc::now()));
/// ```
#[derive(Debug, Clone)]
pub struct DeviceAuthorizationSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub interval: Duration,
    pub expires_at: DateTime<Utc>,
}

impl DeviceAuthorizationSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of a single token-endpoint poll.
#[derive(Debug, Clone)]
pub enum DevicePoll {
    Pending,
    SlowDown,
    Authorized(Credential),
    Denied,
    Expired,
}

/// Poll-loop state. Only `Waiting` is non-terminal.
#[derive(Debug, Clone)]
pub enum FlowState {
    Waiting { interval: Duration },
    Succeeded(Credential),
    Denied,
    Expired,
}

impl FlowState {
    pub fn start(session: &DeviceAuthorizationSession) -> Self {
        Self::Waiting {
            interval: session.interval,
        }
    }

    /// Advance the state machine with one poll outcome.
    ///
    /// Terminal states absorb further input.
    pub fn on_poll(self, poll: DevicePoll) -> Self {
        let Self::Waiting { interval } = self else {
            return self;
        };
        match poll {
            DevicePoll::Pending => Self::Waiting { interval },
            DevicePoll::SlowDown => Self::Waiting {
                interval: interval + SLOW_DOWN_STEP,
            },
            DevicePoll::Authorized(credential) => Self::Succeeded(credential),
            DevicePoll::Denied => Self::Denied,
            DevicePoll::Expired => Self::Expired,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Waiting { .. })
    }
}
