//! Typed jobs reconstructed from job records.
//!
//! A [`CircuitJob`] is one remote job. A [`CompositeJob`] groups the sub-jobs
//! that share a composite id tag and is presented to callers as one job.
//! Both keep a handle to the backend they ran on and to the API, so their
//! status can be refreshed later.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use qbridge_hal::{Backend, JobId, JobStatus};
use serde::Serialize;

use crate::api::JobApi;
use crate::error::{IbmError, IbmResult};
use crate::record::RawJobRecord;
use crate::status::job_status_from_api;

/// Tag prefix marking membership of a composite job.
pub const COMPOSITE_JOB_ID_PREFIX: &str = "ibmq_composite_job_id_";

/// Tag prefix giving the position of a sub-job inside its composite job.
pub const COMPOSITE_JOB_INDEX_PREFIX: &str = "ibmq_composite_job_indx_";

/// Composite id carried by the tags, if any. The tag itself is the id.
pub fn composite_job_id(tags: &[String]) -> Option<&str> {
    tags.iter()
        .map(String::as_str)
        .find(|tag| is_composite_job_id(tag))
}

/// Sub-job position carried by the tags, if any.
pub fn composite_job_index(tags: &[String]) -> Option<usize> {
    tags.iter()
        .find_map(|tag| tag.strip_prefix(COMPOSITE_JOB_INDEX_PREFIX))
        .and_then(|index| index.parse().ok())
}

/// Whether a job id names a composite job.
pub fn is_composite_job_id(job_id: &str) -> bool {
    job_id.starts_with(COMPOSITE_JOB_ID_PREFIX)
}

/// A single remote job.
#[derive(Clone)]
pub struct CircuitJob {
    job_id: JobId,
    name: Option<String>,
    api_status: String,
    status: JobStatus,
    creation_date: DateTime<Utc>,
    tags: Vec<String>,
    backend: Arc<dyn Backend>,
    api: Arc<dyn JobApi>,
}

impl CircuitJob {
    /// Build a job from a record.
    ///
    /// Fails with a description of the problem if a required field is
    /// missing or malformed, or the status code is unknown.
    pub(crate) fn from_record(
        record: &RawJobRecord,
        backend: Arc<dyn Backend>,
        api: Arc<dyn JobApi>,
    ) -> Result<Self, String> {
        let missing = record.missing_required();
        if !missing.is_empty() {
            return Err(format!(
                "missing or malformed fields: {}",
                missing.join(", ")
            ));
        }
        let malformed = record.malformed_fields();
        if !malformed.is_empty() {
            return Err(format!("malformed fields: {}", malformed.join(", ")));
        }
        let (Some(id), Some(api_status), Some(creation_date)) =
            (record.id(), record.status(), record.creation_date())
        else {
            return Err("missing or malformed fields".into());
        };
        let status = job_status_from_api(api_status)
            .ok_or_else(|| format!("unknown status code \"{api_status}\""))?;

        Ok(Self {
            job_id: JobId::new(id),
            name: record.name().map(str::to_string),
            api_status: api_status.to_string(),
            status,
            creation_date,
            tags: record.tags().to_vec(),
            backend,
            api,
        })
    }

    /// Job id.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Job name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Status as last seen.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Status code as reported by the server.
    pub fn api_status(&self) -> &str {
        &self.api_status
    }

    /// Creation date.
    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    /// Tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Backend the job ran on.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Whether the job ran on a backend that is no longer available.
    pub fn is_on_retired_backend(&self) -> bool {
        self.backend.is_retired()
    }

    /// Position inside the composite job, if this is a sub-job.
    pub fn composite_index(&self) -> Option<usize> {
        composite_job_index(&self.tags)
    }

    /// Composite id, if this is a sub-job.
    pub fn composite_job_id(&self) -> Option<&str> {
        composite_job_id(&self.tags)
    }

    /// Fetch the current status from the server.
    pub async fn refresh(&mut self) -> IbmResult<JobStatus> {
        let record = self.api.get_job(self.job_id.as_str()).await?;
        let api_status = record.status().ok_or_else(|| IbmError::ApiProtocol {
            job_id: self.job_id.to_string(),
            message: "missing field status".into(),
        })?;
        self.status = job_status_from_api(api_status).ok_or_else(|| IbmError::ApiProtocol {
            job_id: self.job_id.to_string(),
            message: format!("unknown status code \"{api_status}\""),
        })?;
        self.api_status = api_status.to_string();
        Ok(self.status)
    }
}

impl fmt::Debug for CircuitJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitJob")
            .field("job_id", &self.job_id)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("creation_date", &self.creation_date)
            .field("backend", &self.backend.name())
            .field("retired", &self.backend.is_retired())
            .finish()
    }
}

/// Sub-jobs sharing one composite id, ordered by their index tag.
#[derive(Debug, Clone)]
pub struct CompositeJob {
    job_id: JobId,
    sub_jobs: Vec<CircuitJob>,
}

impl CompositeJob {
    /// Group sub-jobs under a composite id.
    ///
    /// Fails with [`IbmError::JobNotFound`] when there is no sub-job.
    pub fn new(job_id: impl Into<String>, mut sub_jobs: Vec<CircuitJob>) -> IbmResult<Self> {
        let job_id = job_id.into();
        if sub_jobs.is_empty() {
            return Err(IbmError::JobNotFound(job_id));
        }
        sub_jobs.sort_by_key(|job| {
            (
                job.composite_index().unwrap_or(usize::MAX),
                job.creation_date,
            )
        });
        Ok(Self {
            job_id: JobId::new(job_id),
            sub_jobs,
        })
    }

    /// Composite id.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Sub-jobs in index order.
    pub fn sub_jobs(&self) -> &[CircuitJob] {
        &self.sub_jobs
    }

    /// Status aggregated over the sub-jobs.
    pub fn status(&self) -> JobStatus {
        aggregate_status(self.sub_jobs.iter().map(CircuitJob::status))
    }

    /// Creation date of the earliest sub-job.
    pub fn creation_date(&self) -> DateTime<Utc> {
        self.sub_jobs
            .iter()
            .map(CircuitJob::creation_date)
            .min()
            .unwrap_or_default()
    }

    /// Backend of the first sub-job.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        self.sub_jobs[0].backend()
    }

    /// Name of the first sub-job.
    pub fn name(&self) -> Option<&str> {
        self.sub_jobs[0].name()
    }

    /// Tags of the first sub-job, without the composite bookkeeping tags.
    pub fn tags(&self) -> Vec<String> {
        self.sub_jobs[0]
            .tags()
            .iter()
            .filter(|t| {
                !t.starts_with(COMPOSITE_JOB_ID_PREFIX)
                    && !t.starts_with(COMPOSITE_JOB_INDEX_PREFIX)
            })
            .cloned()
            .collect()
    }

    /// Refresh every sub-job and return the aggregated status.
    pub async fn refresh(&mut self) -> IbmResult<JobStatus> {
        for job in &mut self.sub_jobs {
            job.refresh().await?;
        }
        Ok(self.status())
    }
}

/// Status of a group of jobs: the first of ERROR, CANCELLED, RUNNING,
/// QUEUED, VALIDATING, INITIALIZING present, otherwise DONE.
pub fn aggregate_status(statuses: impl IntoIterator<Item = JobStatus>) -> JobStatus {
    const PRECEDENCE: [JobStatus; 6] = [
        JobStatus::Error,
        JobStatus::Cancelled,
        JobStatus::Running,
        JobStatus::Queued,
        JobStatus::Validating,
        JobStatus::Initializing,
    ];
    let statuses: Vec<JobStatus> = statuses.into_iter().collect();
    PRECEDENCE
        .into_iter()
        .find(|status| statuses.contains(status))
        .unwrap_or(JobStatus::Done)
}

/// A job as returned by the backend service.
#[derive(Debug, Clone)]
pub enum IbmJob {
    /// A single job.
    Circuit(CircuitJob),
    /// Sub-jobs presented as one job.
    Composite(CompositeJob),
}

impl IbmJob {
    /// Job id (the composite id for composite jobs).
    pub fn job_id(&self) -> &JobId {
        match self {
            IbmJob::Circuit(job) => job.job_id(),
            IbmJob::Composite(job) => job.job_id(),
        }
    }

    /// Status as last seen.
    pub fn status(&self) -> JobStatus {
        match self {
            IbmJob::Circuit(job) => job.status(),
            IbmJob::Composite(job) => job.status(),
        }
    }

    /// Creation date.
    pub fn creation_date(&self) -> DateTime<Utc> {
        match self {
            IbmJob::Circuit(job) => job.creation_date(),
            IbmJob::Composite(job) => job.creation_date(),
        }
    }

    /// Backend the job ran on.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        match self {
            IbmJob::Circuit(job) => job.backend(),
            IbmJob::Composite(job) => job.backend(),
        }
    }

    /// Whether this is a composite job.
    pub fn is_composite(&self) -> bool {
        matches!(self, IbmJob::Composite(_))
    }

    /// Fetch the current status from the server.
    pub async fn refresh(&mut self) -> IbmResult<JobStatus> {
        match self {
            IbmJob::Circuit(job) => job.refresh().await,
            IbmJob::Composite(job) => job.refresh().await,
        }
    }

    /// Serializable overview of the job.
    pub fn summary(&self) -> JobSummary {
        let (name, tags, sub_jobs) = match self {
            IbmJob::Circuit(job) => (
                job.name().map(str::to_string),
                job.tags().to_vec(),
                0,
            ),
            IbmJob::Composite(job) => (
                job.name().map(str::to_string),
                job.tags(),
                job.sub_jobs().len(),
            ),
        };
        JobSummary {
            job_id: self.job_id().to_string(),
            name,
            status: self.status(),
            backend: self.backend().name().to_string(),
            retired_backend: self.backend().is_retired(),
            creation_date: self.creation_date(),
            tags,
            sub_jobs,
        }
    }
}

/// Flat view of a job for display and JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    /// Job id.
    pub job_id: String,
    /// Job name.
    pub name: Option<String>,
    /// Abstract status.
    pub status: JobStatus,
    /// Backend name.
    pub backend: String,
    /// Whether the backend is retired.
    pub retired_backend: bool,
    /// Creation date.
    pub creation_date: DateTime<Utc>,
    /// Tags.
    pub tags: Vec<String>,
    /// Number of sub-jobs; zero for single jobs.
    pub sub_jobs: usize,
}
