use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::credential::Credential;
use super::error::AuthError;

const TOKEN_FILE_VERSION: u32 = 1;

/// Persistence backend mirrored by the [`CredentialStore`].
pub trait TokenStore: Send + Sync {
    fn load(&self, profile: &str) -> Result<Option<Credential>, AuthError>;
    fn save(&self, profile: &str, credential: &Credential) -> Result<(), AuthError>;
    fn clear(&self, profile: &str) -> Result<(), AuthError>;
}

/// Process-wide holder of the one live credential.
///
/// Reads and writes go through a single lock, so a reader never sees an access
/// token paired with the expiry of a previous credential. When a backend is
/// attached, `set` and `clear` are mirrored to it under the same lock and
/// backend failures are returned as [`AuthError::Storage`]; a credential that
/// could not be saved is never published.
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
    backend: Option<Arc<dyn TokenStore>>,
    profile: String,
}

impl CredentialStore {
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(None),
            backend: None,
            profile: "default".to_string(),
        }
    }

    pub fn with_backend(backend: Arc<dyn TokenStore>) -> Self {
        Self {
            backend: Some(backend),
            ..Self::in_memory()
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    /// Load a previously persisted credential into memory.
    ///
    /// Expired credentials are still restored: a refresh token may outlive them.
    pub fn restore(&self) -> Result<Option<Credential>, AuthError> {
        let Some(backend) = &self.backend else {
            return Ok(None);
        };
        let loaded = backend.load(&self.profile)?;
        if let Some(credential) = &loaded {
            tracing::debug!(
                expires_at = %credential.expires_at,
                "restored persisted credential"
            );
            *self.current.write().unwrap_or_else(PoisonError::into_inner) =
                Some(credential.clone());
        }
        Ok(loaded)
    }

    pub fn get(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish `credential`. When the backend write fails nothing is published.
    pub fn set(&self, credential: Credential) -> Result<(), AuthError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(backend) = &self.backend {
            backend.save(&self.profile, &credential)?;
        }
        *current = Some(credential);
        Ok(())
    }

    /// Publish `credential` for this process only, leaving the backend untouched.
    pub fn set_in_memory(&self, credential: Credential) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    /// Drop the live credential. Memory is cleared even if the backend fails.
    pub fn clear(&self) -> Result<(), AuthError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = None;
        match &self.backend {
            Some(backend) => backend.clear(&self.profile),
            None => Ok(()),
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// File-backed token store using TOML files, one per profile.
///
/// # Example
/// ```no_run
/// use chrono::{Duration, Utc};
/// use shuttle_bridge::auth::{Credential, FileTokenStore, TokenStore};
///
/// let store = FileTokenStore::new_default();
/// let credential = Credential::from_static("token", Duration::hours(1), Utc::now());
/// store.save("default", &credential)?;
/// # Ok::<(), shuttle_bridge::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_token_dir(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn token_path(&self, profile: &str) -> PathBuf {
        let profile = normalize_label(profile);
        let name = if profile == "default" {
            "token.toml".to_string()
        } else {
            format!("token.{profile}.toml")
        };
        self.base_dir.join(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, profile: &str) -> Result<Option<Credential>, AuthError> {
        let path = self.token_path(profile);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Storage(format!("{}: {err}", path.display()))),
        };
        let file: TokenFile = toml::from_str(&raw)?;
        if file.version != TOKEN_FILE_VERSION {
            return Err(AuthError::Storage(format!(
                "unsupported token file version {} at {}",
                file.version,
                path.display()
            )));
        }
        Ok(Some(file.credential))
    }

    fn save(&self, profile: &str, credential: &Credential) -> Result<(), AuthError> {
        let path = self.token_path(profile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = TokenFile {
            version: TOKEN_FILE_VERSION,
            profile: profile.to_string(),
            saved_at: Utc::now(),
            credential: credential.clone(),
        };
        fs::write(&path, toml::to_string(&file)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self, profile: &str) -> Result<(), AuthError> {
        let path = self.token_path(profile);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Storage(format!("{}: {err}", path.display()))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    profile: String,
    saved_at: DateTime<Utc>,
    credential: Credential,
}

/// `~/.cybershuttle`, falling back to a relative directory without a home.
pub fn default_token_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".cybershuttle"))
        .unwrap_or_else(|| PathBuf::from(".cybershuttle"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
