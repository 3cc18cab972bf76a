use thiserror::Error;

/// Authentication errors raised by the credential lifecycle.
///
/// `Clone` so that a single device-flow outcome can be handed to every caller
/// that joined the run.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Authorization denied by the operator")]
    AuthorizationDenied,
    #[error("Device authorization expired before it was approved")]
    AuthorizationExpired,
    #[error("No valid credential obtainable: {0}")]
    AuthenticationRequired(#[source] Box<AuthError>),
    #[error("Refresh token rejected: {0}")]
    RefreshRejected(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Wrap a terminal failure as "no credential obtainable".
    ///
    /// Local storage and configuration failures pass through unchanged.
    pub fn required(cause: AuthError) -> Self {
        match cause {
            already @ AuthError::AuthenticationRequired(_) => already,
            local @ (AuthError::Storage(_) | AuthError::Configuration(_)) => local,
            other => AuthError::AuthenticationRequired(Box::new(other)),
        }
    }
}


impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
