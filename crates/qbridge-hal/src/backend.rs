//! Backend trait and connection configuration.
//!
//! A [`Backend`] is the client-side handle of one remote device or
//! simulator. Handles are cheap to clone behind an `Arc` and are shared by
//! every job that ran on the device:
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `num_qubits()` | sync | yes | `u32` |
//! | `is_simulator()` | sync | yes | `bool` |
//! | `is_retired()` | sync | provided | `bool` |
//! | `availability()` | async | yes | `HalResult<BackendAvailability>` |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A hub/group/project triple selecting one provider instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance {
    /// Hub name.
    pub hub: String,
    /// Group name.
    pub group: String,
    /// Project name.
    pub project: String,
}

impl Instance {
    /// Create an instance from its three parts.
    pub fn new(
        hub: impl Into<String>,
        group: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            hub: hub.into(),
            group: group.into(),
            project: project.into(),
        }
    }

    /// Build an instance from optional parts.
    ///
    /// Returns `Ok(None)` when no part is given and an error when only some
    /// of them are.
    pub fn from_parts(
        hub: Option<&str>,
        group: Option<&str>,
        project: Option<&str>,
    ) -> HalResult<Option<Self>> {
        match (hub, group, project) {
            (None, None, None) => Ok(None),
            (Some(h), Some(g), Some(p)) if !h.is_empty() && !g.is_empty() && !p.is_empty() => {
                Ok(Some(Self::new(h, g, p)))
            }
            _ => Err(HalError::InvalidArgument(format!(
                "The hub, group, and project parameters must all be specified: \
                 hub = \"{}\", group = \"{}\", project = \"{}\"",
                hub.unwrap_or_default(),
                group.unwrap_or_default(),
                project.unwrap_or_default()
            ))),
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.hub, self.group, self.project)
    }
}

impl FromStr for Instance {
    type Err = HalError;

    /// Parse `hub/group/project`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [hub, group, project] if parts.iter().all(|p| !p.is_empty()) => {
                Ok(Self::new(*hub, *group, *project))
            }
            _ => Err(HalError::InvalidArgument(format!(
                "\"{s}\" is not a valid instance; expected hub/group/project"
            ))),
        }
    }
}

/// Connection settings for a provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Authentication URL.
    pub auth_url: String,
    /// API token.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Instance to use; the first accessible one when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<Instance>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Additional provider-specific settings.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ConnectionConfig {
    /// Create a configuration for the given authentication URL.
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            token: None,
            instance: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the API token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Select an instance.
    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Add extra configuration.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("auth_url", &self.auth_url)
            .field("token", &"[REDACTED]")
            .field("instance", &self.instance)
            .field("timeout_secs", &self.timeout_secs)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Client-side handle of a remote backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Number of qubits the backend offers.
    fn num_qubits(&self) -> u32;

    /// Whether this backend is a simulator.
    fn is_simulator(&self) -> bool;

    /// Whether this handle stands in for a backend that no longer exists.
    fn is_retired(&self) -> bool {
        false
    }

    /// Check backend availability.
    async fn availability(&self) -> HalResult<BackendAvailability>;
}

impl fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name())
            .field("retired", &self.is_retired())
            .finish()
    }
}

/// Backend availability information.
#[derive(Debug, Clone)]
pub struct BackendAvailability {
    /// Whether the backend is currently accepting jobs.
    pub is_available: bool,
    /// Number of jobs currently in queue (if known).
    pub queue_depth: Option<u32>,
    /// Human-readable status message.
    pub status_message: Option<String>,
}

impl BackendAvailability {
    /// Availability of an operational backend.
    pub fn available(queue_depth: Option<u32>) -> Self {
        Self {
            is_available: true,
            queue_depth,
            status_message: None,
        }
    }

    /// Create availability for an offline backend.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_available: false,
            queue_depth: None,
            status_message: Some(reason.into()),
        }
    }
}
