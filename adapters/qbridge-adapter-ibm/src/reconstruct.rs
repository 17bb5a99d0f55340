//! Turning job records into typed jobs.

use std::sync::Arc;

use qbridge_hal::{Backend, BackendRegistry};
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::api::JobApi;
use crate::backend::RetiredBackend;
use crate::error::{IbmError, IbmResult};
use crate::job::CircuitJob;
use crate::record::RawJobRecord;

/// Builds [`CircuitJob`]s for one listing call.
///
/// Backends that are not in the registry get one shared [`RetiredBackend`]
/// stand-in per name.
pub struct JobReconstructor<'a> {
    registry: &'a BackendRegistry,
    api: Arc<dyn JobApi>,
    retired: FxHashMap<String, Arc<dyn Backend>>,
}

impl<'a> JobReconstructor<'a> {
    /// Reconstructor resolving backends through `registry`.
    pub fn new(registry: &'a BackendRegistry, api: Arc<dyn JobApi>) -> Self {
        Self {
            registry,
            api,
            retired: FxHashMap::default(),
        }
    }

    /// Backend handle for a name, or a retired stand-in.
    pub fn resolve_backend(&mut self, name: &str) -> Arc<dyn Backend> {
        if let Ok(backend) = self.registry.get(name) {
            return backend;
        }
        Arc::clone(self.retired.entry(name.to_string()).or_insert_with(|| {
            Arc::new(RetiredBackend::from_name(name)) as Arc<dyn Backend>
        }))
    }

    /// Build a job from a record.
    ///
    /// A record that cannot become a job fails with
    /// [`IbmError::ApiProtocol`] when `raise_error` is set, and is logged and
    /// skipped (`Ok(None)`) otherwise.
    pub fn restore(
        &mut self,
        record: &RawJobRecord,
        raise_error: bool,
    ) -> IbmResult<Option<CircuitJob>> {
        let backend = match record.backend_name() {
            Some(name) => self.resolve_backend(name),
            None => return self.reject(record, "missing field backend".into(), raise_error),
        };

        match CircuitJob::from_record(record, backend, Arc::clone(&self.api)) {
            Ok(job) => Ok(Some(job)),
            Err(cause) => self.reject(record, cause, raise_error),
        }
    }

    fn reject(
        &self,
        record: &RawJobRecord,
        cause: String,
        raise_error: bool,
    ) -> IbmResult<Option<CircuitJob>> {
        let job_id = record.id().unwrap_or_default().to_string();
        if raise_error {
            return Err(IbmError::ApiProtocol {
                job_id,
                message: cause,
            });
        }
        warn!(
            "Discarding job {job_id} because of invalid data received from the server: {cause}"
        );
        Ok(None)
    }
}
