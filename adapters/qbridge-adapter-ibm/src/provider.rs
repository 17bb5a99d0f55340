//! Entry point: log in, pick an instance, discover backends.

use std::sync::Arc;

use qbridge_hal::{AccountStore, BackendRegistry, ConnectionConfig, Instance};
use tracing::{debug, info};

use crate::account::CredentialResolver;
use crate::api::{IbmClient, JobApi};
use crate::backend::{IbmBackend, register_backend_aliases};
use crate::error::{IbmError, IbmResult};
use crate::service::BackendService;

/// A logged-in account bound to one hub/group/project.
///
/// # Example
///
/// ```ignore
/// use qbridge_adapter_ibm::{IbmProvider, JobQuery};
///
/// let provider = IbmProvider::from_saved_or_env(None, None).await?;
/// let jobs = provider.service().jobs(&JobQuery::new().with_status("RUNNING")).await?;
/// ```
pub struct IbmProvider {
    client: Arc<IbmClient>,
    instances: Vec<Instance>,
    service: BackendService,
}

impl IbmProvider {
    /// Log in with `config` and load the backends of the selected instance.
    pub async fn connect(config: ConnectionConfig) -> IbmResult<Self> {
        let client = IbmClient::login(&config).await?;
        let instances = client.user_hubs().await?;
        let instance = select_instance(&instances, config.instance.as_ref())?;
        info!("using instance {instance}");

        let client = Arc::new(client.with_instance(instance));
        let backends = client.list_backends().await?;
        debug!(count = backends.len(), "discovered backends");

        let mut registry = BackendRegistry::new();
        for backend in backends {
            registry.register(Arc::new(IbmBackend::new(Arc::clone(&client), backend)));
        }
        register_backend_aliases(&mut registry);

        let api: Arc<dyn JobApi> = Arc::clone(&client) as Arc<dyn JobApi>;
        Ok(Self {
            service: BackendService::new(Arc::new(registry), api),
            client,
            instances,
        })
    }

    /// Connect with credentials from `token`, the environment, or the
    /// account saved in the default location.
    pub async fn from_saved_or_env(
        token: Option<&str>,
        instance: Option<Instance>,
    ) -> IbmResult<Self> {
        let store = AccountStore::default_location()?;
        let config = CredentialResolver::new(store).resolve(token, instance)?;
        Self::connect(config).await
    }

    /// Backend and job operations.
    pub fn service(&self) -> &BackendService {
        &self.service
    }

    /// The selected instance.
    pub fn instance(&self) -> Option<&Instance> {
        self.client.instance()
    }

    /// Every instance the account can access.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// The underlying REST client.
    pub fn client(&self) -> &Arc<IbmClient> {
        &self.client
    }
}

impl std::fmt::Debug for IbmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IbmProvider")
            .field("instance", &self.instance())
            .field("service", &self.service)
            .finish()
    }
}

/// The requested instance if the account has it, otherwise the first one.
pub fn select_instance(
    available: &[Instance],
    requested: Option<&Instance>,
) -> IbmResult<Instance> {
    match requested {
        Some(wanted) if available.contains(wanted) => Ok(wanted.clone()),
        Some(wanted) => Err(IbmError::InvalidArgument(format!(
            "the hub/group/project \"{wanted}\" could not be found for this account"
        ))),
        None => available.first().cloned().ok_or_else(|| {
            IbmError::NoInstance("the account has no hub/group/project".into())
        }),
    }
}
