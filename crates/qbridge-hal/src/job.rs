//! Job identifiers and the abstract job status.
//!
//! Providers report job state with their own status codes. The abstract
//! [`JobStatus`] is the normalized view callers filter and match on:
//!
//! ```text
//!   INITIALIZING ──→ VALIDATING ──→ QUEUED ──→ RUNNING ──→ DONE
//!        │               │            │           │
//!        │               │            │           ├──→ ERROR
//!        └───────────────┴────────────┴───────────┴──→ CANCELLED
//! ```
//!
//! Terminal states (`DONE`, `ERROR`, `CANCELLED`) are permanent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Abstract status of a job, independent of any provider's status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Job is being created on the remote side.
    Initializing,
    /// Job is waiting in the queue.
    Queued,
    /// Job payload is being validated.
    Validating,
    /// Job is running.
    Running,
    /// Job was cancelled.
    Cancelled,
    /// Job finished successfully.
    Done,
    /// Job failed.
    Error,
}

impl JobStatus {
    /// Every abstract status, in declaration order.
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Initializing,
        JobStatus::Queued,
        JobStatus::Validating,
        JobStatus::Running,
        JobStatus::Cancelled,
        JobStatus::Done,
        JobStatus::Error,
    ];

    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            JobStatus::Initializing => "INITIALIZING",
            JobStatus::Queued => "QUEUED",
            JobStatus::Validating => "VALIDATING",
            JobStatus::Running => "RUNNING",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Done => "DONE",
            JobStatus::Error => "ERROR",
        }
    }

    /// Look up a status by name, ignoring case.
    pub fn from_name(name: &str) -> HalResult<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| {
                HalError::InvalidArgument(format!(
                    "\"{name}\" is not a valid status value. Valid values are {}",
                    Self::ALL.map(JobStatus::name).join(", ")
                ))
            })
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Done | JobStatus::Error | JobStatus::Cancelled
        )
    }

    /// Check if the job has not reached a terminal state yet.
    pub fn is_pending(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JobStatus {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
