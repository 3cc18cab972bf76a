use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How a credential came to exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    #[default]
    DeviceFlow,
    Refresh,
    StaticToken,
}

/// Bearer credential for the catalog API.
///
/// `expires_at` is always set. A credential whose `expires_at` has passed is
/// invalid and must never be attached to an outbound call.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use shuttle_bridge::auth::Credential;
///
/// let now = Utc::now();
/// let credential = Credential::from_static("dev-token", Duration::hours(1), now);
/// assert!(credential.is_fresh_at(now, Duration::seconds(30)));
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<BTreeSet<String>>,
    pub obtained_at: DateTime<Utc>,
    #[serde(default)]
    pub source: CredentialSource,
}

impl Credential {
    /// Build a credential from a token-endpoint grant issued at `now`.
    pub fn issued(
        access_token: impl Into<String>,
        expires_in: Duration,
        refresh_token: Option<String>,
        scope: Option<&str>,
        source: CredentialSource,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: now + expires_in,
            refresh_token,
            scope: scope.map(parse_scope).filter(|set| !set.is_empty()),
            obtained_at: now,
            source,
        }
    }

    /// Synthesize a credential from an externally supplied development token.
    pub fn from_static(token: impl Into<String>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self::issued(token, ttl, None, None, CredentialSource::StaticToken, now)
    }

    /// Partial replace after a refresh-token grant.
    ///
    /// Keeps the previous refresh token and scope unless the server rotated them.
    pub fn refreshed(
        &self,
        access_token: impl Into<String>,
        expires_in: Duration,
        refresh_token: Option<String>,
        scope: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: now + expires_in,
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            scope: scope
                .map(parse_scope)
                .filter(|set| !set.is_empty())
                .or_else(|| self.scope.clone()),
            obtained_at: now,
            source: CredentialSource::Refresh,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True when the credential outlives `margin` from `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - now > margin
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("scope", &self.scope)
            .field("obtained_at", &self.obtained_at)
            .field("source", &self.source)
            .finish()
    }
}

fn parse_scope(raw: &str) -> BTreeSet<String> {
    raw.split([' ', ','])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
