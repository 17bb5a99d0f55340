//! qbridge adapter for IBM Quantum
//!
//! This crate lists and retrieves jobs from the IBM Quantum job service and
//! exposes the backends an account can reach.
//!
//! # Authentication
//!
//! Pass a token explicitly, set one of the environment variables, or save an
//! account once:
//!
//! ```bash
//! export QBRIDGE_IBM_TOKEN="your-api-token-here"
//! # or: qbridge account save --api-token your-api-token-here
//! ```
//!
//! # Example: listing jobs
//!
//! ```ignore
//! use qbridge_adapter_ibm::{IbmProvider, JobQuery, JobStatus};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = IbmProvider::from_saved_or_env(None, None).await?;
//!
//!     let query = JobQuery::new()
//!         .with_limit(Some(50))
//!         .with_status(vec![JobStatus::Running, JobStatus::Queued])
//!         .with_tags(["calibration", "nightly"], "AND");
//!
//!     for job in provider.service().jobs(&query).await? {
//!         println!("{} {:?} on {}", job.job_id(), job.status(), job.backend().name());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Listing many jobs
//!
//! The job service caps the page size it returns without saying so, and
//! many jobs can share a creation timestamp. Listing therefore pages by
//! creation date: each round narrows the date window to the last record
//! seen and excludes the ids already returned at that instant, so no job is
//! returned twice or missed however the server caps pages.
//!
//! # Composite jobs
//!
//! Jobs tagged `ibmq_composite_job_id_<id>` are sub-jobs of one composite
//! job. Listings return them as a single [`IbmJob::Composite`] unless
//! [`JobQuery::ignore_composite_jobs`] is set.

pub mod account;
pub mod api;
pub mod backend;
pub mod error;
pub mod filter;
pub mod job;
pub mod paginate;
pub mod provider;
pub mod query;
pub mod reconstruct;
pub mod record;
pub mod service;
pub mod status;

pub use account::{CredentialResolver, delete_account, save_account, saved_account};
pub use api::{BackendInfo, BackendStatus, DEFAULT_AUTH_URL, IbmClient, JobApi};
pub use backend::{IbmBackend, RetiredBackend};
pub use error::{IbmError, IbmResult};
pub use filter::{DateRangeFilter, LogicalFilter, Predicate};
pub use job::{CircuitJob, CompositeJob, IbmJob, JobSummary};
pub use paginate::{PageRequest, fetch_records};
pub use provider::IbmProvider;
pub use query::{JobQuery, StatusArg, TagsOperator};
pub use reconstruct::JobReconstructor;
pub use record::RawJobRecord;
pub use service::BackendService;

// Re-export common types
pub use qbridge_hal::{Backend, BackendFilter, ConnectionConfig, Instance, JobStatus};
