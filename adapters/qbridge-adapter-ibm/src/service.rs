//! Backend service: backend lookup and job retrieval for one instance.

use std::sync::Arc;

use qbridge_hal::{Backend, BackendFilter, BackendRegistry};
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::debug;

use crate::api::JobApi;
use crate::error::{IbmError, IbmResult};
use crate::filter::{EXPERIMENT_TAG_FIELD, LogicalFilter, Predicate};
use crate::job::{CompositeJob, IbmJob, composite_job_id, is_composite_job_id};
use crate::paginate::{PageRequest, fetch_records};
use crate::query::JobQuery;
use crate::reconstruct::JobReconstructor;

/// Backends and jobs of one instance.
pub struct BackendService {
    registry: Arc<BackendRegistry>,
    api: Arc<dyn JobApi>,
}

impl BackendService {
    /// Service over a populated registry and a listing endpoint.
    pub fn new(registry: Arc<BackendRegistry>, api: Arc<dyn JobApi>) -> Self {
        Self { registry, api }
    }

    /// The backend registry.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Backends matching the filter, in discovery order.
    pub async fn backends(&self, filter: &BackendFilter) -> Vec<Arc<dyn Backend>> {
        self.registry.select(filter).await
    }

    /// The single backend with this name (aliases resolved).
    pub async fn get_backend(&self, name: &str) -> IbmResult<Arc<dyn Backend>> {
        Ok(self.registry.select_one(&BackendFilter::named(name)).await?)
    }

    /// List jobs matching the query.
    ///
    /// Sub-jobs of a composite job are collapsed into one [`IbmJob::Composite`]
    /// per composite id unless the query ignores composite jobs. Records that
    /// cannot be turned into jobs are logged and skipped.
    pub async fn jobs(&self, query: &JobQuery) -> IbmResult<Vec<IbmJob>> {
        let filter = query.to_filter()?;
        let request = PageRequest {
            limit: query.limit,
            skip: query.skip,
            descending: query.descending,
        };
        let records = fetch_records(self.api.as_ref(), &filter, request).await?;
        debug!(records = records.len(), "reconstructing jobs");

        let mut reconstructor = JobReconstructor::new(&self.registry, Arc::clone(&self.api));
        let mut composite_ids: FxHashSet<String> = FxHashSet::default();
        let mut jobs = Vec::with_capacity(records.len());

        for record in &records {
            let composite_id = if query.ignore_composite_jobs {
                None
            } else {
                composite_job_id(record.tags())
            };

            let Some(composite_id) = composite_id else {
                if let Some(job) = reconstructor.restore(record, false)? {
                    jobs.push(IbmJob::Circuit(job));
                }
                continue;
            };

            if !composite_ids.insert(composite_id.to_string()) {
                continue;
            }
            debug!("adding composite job {composite_id}");
            let job = self.composite_job(&mut reconstructor, composite_id).await?;
            jobs.push(IbmJob::Composite(job));
        }

        Ok(jobs)
    }

    /// A single job by id.
    ///
    /// Composite ids return every sub-job grouped as one job. Fails with
    /// [`IbmError::JobNotFound`] when no such job exists and with
    /// [`IbmError::ApiProtocol`] when the server returns an invalid job.
    pub async fn job(&self, job_id: &str) -> IbmResult<IbmJob> {
        let mut reconstructor = JobReconstructor::new(&self.registry, Arc::clone(&self.api));

        if is_composite_job_id(job_id) {
            let job = self.composite_job(&mut reconstructor, job_id).await?;
            return Ok(IbmJob::Composite(job));
        }

        let record = self.api.get_job(job_id).await?;
        match reconstructor.restore(&record, true)? {
            Some(job) => Ok(IbmJob::Circuit(job)),
            None => Err(IbmError::JobNotFound(job_id.to_string())),
        }
    }

    /// Fetch and assemble every sub-job of a composite job.
    async fn composite_job(
        &self,
        reconstructor: &mut JobReconstructor<'_>,
        composite_id: &str,
    ) -> IbmResult<CompositeJob> {
        let filter = LogicalFilter::leaf(
            EXPERIMENT_TAG_FIELD,
            Predicate::Eq(Value::String(composite_id.to_string())),
        );
        let request = PageRequest {
            limit: None,
            ..PageRequest::default()
        };
        let records = fetch_records(self.api.as_ref(), &filter, request).await?;

        let mut sub_jobs = Vec::with_capacity(records.len());
        for record in &records {
            if let Some(job) = reconstructor.restore(record, true)? {
                sub_jobs.push(job);
            }
        }
        CompositeJob::new(composite_id, sub_jobs)
    }
}

impl std::fmt::Debug for BackendService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendService")
            .field("backends", &self.registry.names())
            .finish()
    }
}
