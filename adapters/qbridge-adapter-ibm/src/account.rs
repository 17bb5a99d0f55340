//! Saved accounts and credential resolution.
//!
//! Credentials are looked up in this order: a token passed by the caller,
//! the `QBRIDGE_IBM_TOKEN` / `IBM_QUANTUM_TOKEN` environment variables, then
//! the account saved on disk.

use qbridge_hal::{AccountStore, ConnectionConfig, EnvTokenProvider, Instance, SavedAccount};
use tracing::debug;

use crate::api::DEFAULT_AUTH_URL;
use crate::error::{IbmError, IbmResult};

/// Environment variable overriding the authentication URL.
pub const URL_ENV_VAR: &str = "QBRIDGE_IBM_URL";

/// Validate and store an account.
///
/// Only the default authentication URL can be saved. The instance is
/// optional, but if any of `hub`, `group` or `project` is given all three
/// must be.
pub fn save_account(
    store: &AccountStore,
    token: &str,
    url: Option<&str>,
    hub: Option<&str>,
    group: Option<&str>,
    project: Option<&str>,
    overwrite: bool,
) -> IbmResult<SavedAccount> {
    let url = url.unwrap_or(DEFAULT_AUTH_URL);
    if url.trim_end_matches('/') != DEFAULT_AUTH_URL {
        return Err(IbmError::InvalidUrl(format!(
            "\"{url}\" is not a valid IBM Quantum authentication URL. Valid URL: {DEFAULT_AUTH_URL}"
        )));
    }
    if token.trim().is_empty() {
        return Err(IbmError::InvalidToken(
            "the token must be a non-empty string".into(),
        ));
    }

    let mut account = SavedAccount::new(token.trim(), DEFAULT_AUTH_URL);
    if let Some(instance) = Instance::from_parts(hub, group, project)? {
        account = account.with_instance(instance);
    }
    store.save(&account, overwrite)?;
    Ok(account)
}

/// The saved account, if there is one.
pub fn saved_account(store: &AccountStore) -> IbmResult<Option<SavedAccount>> {
    Ok(store.load()?)
}

/// Delete the saved account. Fails with
/// [`IbmError::CredentialsNotFound`] when nothing is saved.
pub fn delete_account(store: &AccountStore) -> IbmResult<()> {
    Ok(store.delete()?)
}

/// Turns the available credential sources into a [`ConnectionConfig`].
pub struct CredentialResolver {
    env: EnvTokenProvider,
    url_var: String,
    store: AccountStore,
}

impl CredentialResolver {
    /// Resolver reading the standard environment variables and `store`.
    pub fn new(store: AccountStore) -> Self {
        Self {
            env: EnvTokenProvider::ibm(),
            url_var: URL_ENV_VAR.to_string(),
            store,
        }
    }

    /// Read the token and URL from other environment variables.
    pub fn with_env(mut self, env: EnvTokenProvider, url_var: impl Into<String>) -> Self {
        self.env = env;
        self.url_var = url_var.into();
        self
    }

    /// Connection settings from the first source that has a token.
    ///
    /// An explicit `instance` replaces the saved default instance.
    pub fn resolve(
        &self,
        token: Option<&str>,
        instance: Option<Instance>,
    ) -> IbmResult<ConnectionConfig> {
        let env_url = || {
            std::env::var(&self.url_var)
                .ok()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string())
        };

        let mut config = if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            debug!("using the token passed on the command line");
            ConnectionConfig::new(env_url()).with_token(token)
        } else if let Some(token) = self.env.token() {
            debug!("using the token from the environment");
            ConnectionConfig::new(env_url()).with_token(token)
        } else if let Some(account) = self.store.load()? {
            debug!("using the account saved at {}", self.store.path().display());
            let mut config = ConnectionConfig::new(account.url).with_token(account.token);
            config.instance = account.instance;
            config
        } else {
            return Err(IbmError::MissingToken);
        };

        if let Some(instance) = instance {
            config.instance = Some(instance);
        }
        Ok(config)
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("url_var", &self.url_var)
            .field("store", &self.store.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, AccountStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path().join("account.json"));
        (dir, store)
    }

    fn resolver(store: AccountStore, token_var: &str) -> CredentialResolver {
        CredentialResolver::new(store).with_env(
            EnvTokenProvider::new(token_var),
            "QBRIDGE_TEST_ACCOUNT_URL_UNSET",
        )
    }

    #[test]
    fn test_save_account_validation() {
        let (_dir, store) = temp_store();

        let err = save_account(
            &store,
            "tok",
            Some("https://example.com/api"),
            None,
            None,
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, IbmError::InvalidUrl(_)));

        let err = save_account(&store, "  ", None, None, None, None, false).unwrap_err();
        assert!(matches!(err, IbmError::InvalidToken(_)));

        let err =
            save_account(&store, "tok", None, Some("hub"), None, None, false).unwrap_err();
        assert!(matches!(err, IbmError::InvalidArgument(_)));

        assert!(saved_account(&store).unwrap().is_none());
    }

    #[test]
    fn test_save_show_delete() {
        let (_dir, store) = temp_store();
        let saved = save_account(
            &store,
            "tok",
            None,
            Some("ibm-q"),
            Some("open"),
            Some("main"),
            false,
        )
        .unwrap();
        assert_eq!(saved_account(&store).unwrap(), Some(saved));

        assert!(save_account(&store, "tok2", None, None, None, None, false).is_err());
        save_account(&store, "tok2", None, None, None, None, true).unwrap();
        assert_eq!(saved_account(&store).unwrap().unwrap().token, "tok2");

        delete_account(&store).unwrap();
        assert!(matches!(
            delete_account(&store),
            Err(IbmError::CredentialsNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_explicit_token() {
        let (_dir, store) = temp_store();
        save_account(&store, "saved", None, None, None, None, false).unwrap();
        let config = resolver(store, "QBRIDGE_TEST_ACCOUNT_TOKEN_UNSET")
            .resolve(Some("explicit"), None)
            .unwrap();
        assert_eq!(config.token.as_deref(), Some("explicit"));
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
    }

    #[test]
    fn test_resolve_env_before_saved_account() {
        // SAFETY: This test only touches a test-specific variable
        unsafe {
            std::env::set_var("QBRIDGE_TEST_ACCOUNT_TOKEN_SET", "from-env");
        }
        let (_dir, store) = temp_store();
        save_account(&store, "saved", None, None, None, None, false).unwrap();
        let config = resolver(store, "QBRIDGE_TEST_ACCOUNT_TOKEN_SET")
            .resolve(None, None)
            .unwrap();
        assert_eq!(config.token.as_deref(), Some("from-env"));

        // SAFETY: Cleaning up the test variable
        unsafe {
            std::env::remove_var("QBRIDGE_TEST_ACCOUNT_TOKEN_SET");
        }
    }

    #[test]
    fn test_resolve_saved_account_with_instance_override() {
        let (_dir, store) = temp_store();
        save_account(
            &store,
            "saved",
            None,
            Some("ibm-q"),
            Some("open"),
            Some("main"),
            false,
        )
        .unwrap();
        let resolver = resolver(store, "QBRIDGE_TEST_ACCOUNT_TOKEN_UNSET");

        let config = resolver.resolve(None, None).unwrap();
        assert_eq!(config.token.as_deref(), Some("saved"));
        assert_eq!(config.instance, Some(Instance::new("ibm-q", "open", "main")));

        let other = Instance::new("ibm-q-lab", "research", "qec");
        let config = resolver.resolve(None, Some(other.clone())).unwrap();
        assert_eq!(config.instance, Some(other));
    }

    #[test]
    fn test_resolve_without_credentials() {
        let (_dir, store) = temp_store();
        let err = resolver(store, "QBRIDGE_TEST_ACCOUNT_TOKEN_UNSET")
            .resolve(None, None)
            .unwrap_err();
        assert!(matches!(err, IbmError::MissingToken));
    }
}
