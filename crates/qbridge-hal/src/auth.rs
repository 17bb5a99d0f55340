//! Credential sources: token providers and the on-disk account store.
//!
//! # Example
//!
//! ```ignore
//! use qbridge_hal::auth::{AccountStore, SavedAccount};
//!
//! let store = AccountStore::default_location()?;
//! store.save(&SavedAccount::new("my-token", "https://auth.quantum-computing.ibm.com/api"), false)?;
//!
//! let account = store.load()?.expect("just saved");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::Instance;
use crate::error::{HalError, HalResult};

/// File name of the saved account inside the config directory.
const ACCOUNT_FILE: &str = "account.json";

/// Token provider trait for dependency injection.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get the API token.
    async fn get_token(&self) -> HalResult<String>;

    /// Check if a token is available without fetching it.
    fn has_valid_token(&self) -> bool;
}

/// Environment variable token provider.
///
/// Reads the token from the first variable in the list that is set and
/// non-empty.
pub struct EnvTokenProvider {
    env_vars: Vec<String>,
}

impl EnvTokenProvider {
    /// Create a provider reading a single variable.
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_vars: vec![env_var.into()],
        }
    }

    /// Create a provider trying several variables in order.
    pub fn any_of<I, S>(env_vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            env_vars: env_vars.into_iter().map(Into::into).collect(),
        }
    }

    /// Provider for `QBRIDGE_IBM_TOKEN`, falling back to `IBM_QUANTUM_TOKEN`.
    pub fn ibm() -> Self {
        Self::any_of(["QBRIDGE_IBM_TOKEN", "IBM_QUANTUM_TOKEN"])
    }

    /// The token, if any of the variables is set.
    pub fn token(&self) -> Option<String> {
        self.env_vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
    }
}

#[async_trait::async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn get_token(&self) -> HalResult<String> {
        self.token().ok_or_else(|| {
            HalError::CredentialsNotFound(format!(
                "environment variable {} not set",
                self.env_vars.join(" / ")
            ))
        })
    }

    fn has_valid_token(&self) -> bool {
        self.token().is_some()
    }
}

/// An account persisted on disk.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAccount {
    /// API token.
    pub token: String,
    /// Authentication URL.
    pub url: String,
    /// Default instance, if one was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<Instance>,
}

impl SavedAccount {
    /// Create an account without a default instance.
    pub fn new(token: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: url.into(),
            instance: None,
        }
    }

    /// Store a default instance with the account.
    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instance = Some(instance);
        self
    }
}

impl fmt::Debug for SavedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavedAccount")
            .field("token", &"[REDACTED]")
            .field("url", &self.url)
            .field("instance", &self.instance)
            .finish()
    }
}

#[async_trait::async_trait]
impl TokenProvider for SavedAccount {
    async fn get_token(&self) -> HalResult<String> {
        Ok(self.token.clone())
    }

    fn has_valid_token(&self) -> bool {
        !self.token.is_empty()
    }
}

/// JSON file holding at most one saved account.
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    /// Store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/qbridge/account.json`.
    pub fn default_location() -> HalResult<Self> {
        let dir = dirs::config_dir().ok_or_else(|| {
            HalError::Configuration("could not determine the user config directory".into())
        })?;
        Ok(Self::new(dir.join("qbridge").join(ACCOUNT_FILE)))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved account, if there is one.
    pub fn load(&self) -> HalResult<Option<SavedAccount>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let account = serde_json::from_str(&content).map_err(|e| {
            HalError::Auth(format!(
                "invalid account file {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(Some(account))
    }

    /// Save an account. Fails if one exists and `overwrite` is false.
    pub fn save(&self, account: &SavedAccount, overwrite: bool) -> HalResult<()> {
        if self.path.exists() && !overwrite {
            return Err(HalError::Auth(format!(
                "an account is already saved at {}; pass overwrite to replace it",
                self.path.display()
            )));
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(account)?;
        std::fs::write(&self.path, json)?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        tracing::debug!("saved account to {}", self.path.display());
        Ok(())
    }

    /// Delete the saved account.
    pub fn delete(&self) -> HalResult<()> {
        if !self.path.exists() {
            return Err(HalError::CredentialsNotFound(format!(
                "no account saved at {}",
                self.path.display()
            )));
        }
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}
