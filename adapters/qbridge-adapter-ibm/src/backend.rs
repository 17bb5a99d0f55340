//! IBM Quantum backend handles.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use qbridge_hal::{Backend, BackendAvailability, BackendRegistry, HalResult};
use tokio::sync::RwLock;

use crate::api::{BackendInfo, BackendStatus, IbmClient};

/// How long to cache backend status before refreshing from the API.
const BACKEND_STATUS_TTL: Duration = Duration::from_secs(60);

/// Names that old releases used for backends that still exist.
pub const DEPRECATED_BACKEND_NAMES: [(&str, &str); 3] = [
    ("ibmqx_qasm_simulator", "ibmq_qasm_simulator"),
    ("ibmqx_hpc_qasm_simulator", "ibmq_qasm_simulator"),
    ("real", "ibmqx1"),
];

/// Display names of backends that are listed under another name.
pub const ALIASED_BACKEND_NAMES: [(&str, &str); 4] = [
    ("ibmq_5_yorktown", "ibmqx2"),
    ("ibmq_5_tenerife", "ibmqx4"),
    ("ibmq_16_rueschlikon", "ibmqx5"),
    ("ibmq_20_austin", "QS1_1"),
];

/// Register the aliased and deprecated backend names.
pub fn register_backend_aliases(registry: &mut BackendRegistry) {
    for (alias, canonical) in ALIASED_BACKEND_NAMES
        .iter()
        .chain(DEPRECATED_BACKEND_NAMES.iter())
    {
        registry.add_alias(*alias, *canonical);
    }
}

/// A backend the account can currently use.
pub struct IbmBackend {
    /// API client.
    client: Arc<IbmClient>,
    /// Configuration from the backend listing.
    info: BackendInfo,
    /// Cached status with fetch timestamp for TTL-based refresh.
    status: RwLock<Option<(BackendStatus, Instant)>>,
}

impl IbmBackend {
    /// Create a handle from a listed configuration.
    pub fn new(client: Arc<IbmClient>, info: BackendInfo) -> Self {
        Self {
            client,
            info,
            status: RwLock::new(None),
        }
    }

    /// Backend configuration.
    pub fn info(&self) -> &BackendInfo {
        &self.info
    }

    /// Get backend status, fetching from the API if not cached or stale.
    async fn get_status(&self) -> HalResult<BackendStatus> {
        {
            let cached = self.status.read().await;
            if let Some((ref status, fetched_at)) = *cached {
                if fetched_at.elapsed() < BACKEND_STATUS_TTL {
                    return Ok(status.clone());
                }
            }
        }

        let status = self.client.backend_status(&self.info.backend_name).await?;

        {
            let mut cached = self.status.write().await;
            *cached = Some((status.clone(), Instant::now()));
        }

        Ok(status)
    }
}

impl std::fmt::Debug for IbmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IbmBackend")
            .field("name", &self.info.backend_name)
            .field("num_qubits", &self.info.n_qubits)
            .field("simulator", &self.info.simulator)
            .finish()
    }
}

#[async_trait]
impl Backend for IbmBackend {
    fn name(&self) -> &str {
        &self.info.backend_name
    }

    fn num_qubits(&self) -> u32 {
        self.info.n_qubits
    }

    fn is_simulator(&self) -> bool {
        self.info.simulator
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        match self.get_status().await {
            Ok(status) if status.state => Ok(BackendAvailability::available(Some(
                u32::try_from(status.length_queue).unwrap_or(u32::MAX),
            ))),
            Ok(status) => Ok(BackendAvailability::unavailable(if status.status.is_empty() {
                "backend offline".to_string()
            } else {
                status.status
            })),
            Err(e) => {
                tracing::warn!(
                    "availability check for {} failed: {e}",
                    self.info.backend_name
                );
                Ok(BackendAvailability::unavailable("failed to query backend"))
            }
        }
    }
}

/// Stand-in for a backend that a job ran on but that is no longer listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetiredBackend {
    name: String,
}

impl RetiredBackend {
    /// Stand-in with the given name.
    pub fn from_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Backend for RetiredBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_qubits(&self) -> u32 {
        0
    }

    fn is_simulator(&self) -> bool {
        false
    }

    fn is_retired(&self) -> bool {
        true
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::unavailable("backend is retired"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retired_backend() {
        let backend = RetiredBackend::from_name("ibmqx1");
        assert_eq!(backend.name(), "ibmqx1");
        assert!(backend.is_retired());
        let availability = backend.availability().await.unwrap();
        assert!(!availability.is_available);
    }

    #[test]
    fn test_aliases_resolve() {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(RetiredBackend::from_name("ibmq_qasm_simulator")));
        register_backend_aliases(&mut registry);

        assert_eq!(registry.resolve_name("ibmq_5_yorktown"), "ibmqx2");
        assert_eq!(
            registry.get("ibmqx_hpc_qasm_simulator").unwrap().name(),
            "ibmq_qasm_simulator"
        );
    }
}
