use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::credential::{Credential, CredentialSource};
use super::device_flow::DeviceFlowAuthenticator;
use super::error::AuthError;
use super::store::CredentialStore;

/// Snapshot of the stored credential, as reported by `auth status`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    LoggedIn {
        expires_at: DateTime<Utc>,
        source: CredentialSource,
        refreshable: bool,
    },
    Expired {
        expired_at: DateTime<Utc>,
        refreshable: bool,
    },
    LoggedOut,
}

/// Operator-facing login/status/logout facade.
///
/// Returns typed results only; printing belongs to the caller.
pub struct AuthService {
    store: Arc<CredentialStore>,
    authenticator: Arc<DeviceFlowAuthenticator>,
}

impl AuthService {
    pub fn new(store: Arc<CredentialStore>, authenticator: Arc<DeviceFlowAuthenticator>) -> Self {
        Self {
            store,
            authenticator,
        }
    }

    /// Run a fresh device flow regardless of what is stored.
    pub async fn login(&self) -> Result<Credential, AuthError> {
        self.authenticator.force_authenticate().await
    }

    pub fn status(&self) -> AuthStatus {
        status_of(self.store.get(), Utc::now())
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()
    }
}

fn status_of(credential: Option<Credential>, now: DateTime<Utc>) -> AuthStatus {
    match credential {
        None => AuthStatus::LoggedOut,
        Some(credential) if credential.is_expired_at(now) => AuthStatus::Expired {
            expired_at: credential.expires_at,
            refreshable: credential.can_refresh(),
        },
        Some(credential) => AuthStatus::LoggedIn {
            expires_at: credential.expires_at,
            source: credential.source,
            refreshable: credential.can_refresh(),
        },
    }
}
