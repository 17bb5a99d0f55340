//! Mapping between abstract job statuses and the server's status codes.
//!
//! | Abstract       | Server codes              | Filter leaf                        |
//! |----------------|---------------------------|------------------------------------|
//! | `INITIALIZING` | `CREATING`, `CREATED`     | `{"status": {"inq": [..]}}`        |
//! | `VALIDATING`   | `VALIDATING`, `VALIDATED` | `{"status": {"inq": [..]}}`        |
//! | `QUEUED`       | `QUEUED`                  | `{"status": "QUEUED"}`             |
//! | `RUNNING`      | `RUNNING`                 | `{"status": "RUNNING"}`            |
//! | `CANCELLED`    | `CANCELLED`               | `{"status": "CANCELLED"}`          |
//! | `DONE`         | `COMPLETED`               | `{"status": "COMPLETED"}`          |
//! | `ERROR`        | any code starting `ERROR` | `{"status": {"regexp": "^ERROR"}}` |

use qbridge_hal::JobStatus;
use serde_json::Value;

use crate::filter::Predicate;

/// Field name of the status in listing filters.
pub const STATUS_FIELD: &str = "status";

/// Concrete server codes belonging to one abstract status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCodes {
    /// A single code.
    Exact(&'static str),
    /// Any of several codes.
    AnyOf(&'static [&'static str]),
    /// Every code starting with a prefix.
    Prefix(&'static str),
}

impl StatusCodes {
    /// Whether a concrete code belongs to this set.
    pub fn matches(self, code: &str) -> bool {
        match self {
            StatusCodes::Exact(c) => c == code,
            StatusCodes::AnyOf(codes) => codes.iter().any(|c| *c == code),
            StatusCodes::Prefix(prefix) => code.starts_with(prefix),
        }
    }

    /// Filter predicate selecting exactly these codes.
    pub fn predicate(self) -> Predicate {
        match self {
            StatusCodes::Exact(c) => Predicate::Eq(Value::from(c)),
            StatusCodes::AnyOf(codes) => {
                Predicate::In(codes.iter().map(|c| Value::from(*c)).collect())
            }
            StatusCodes::Prefix(prefix) => Predicate::Regexp(format!("^{prefix}")),
        }
    }
}

/// Server codes for an abstract status.
pub fn codes_for(status: JobStatus) -> StatusCodes {
    match status {
        JobStatus::Initializing => StatusCodes::AnyOf(&["CREATING", "CREATED"]),
        JobStatus::Validating => StatusCodes::AnyOf(&["VALIDATING", "VALIDATED"]),
        JobStatus::Queued => StatusCodes::Exact("QUEUED"),
        JobStatus::Running => StatusCodes::Exact("RUNNING"),
        JobStatus::Cancelled => StatusCodes::Exact("CANCELLED"),
        JobStatus::Done => StatusCodes::Exact("COMPLETED"),
        JobStatus::Error => StatusCodes::Prefix("ERROR"),
    }
}

/// Filter predicate on the status field for an abstract status.
pub fn status_predicate(status: JobStatus) -> Predicate {
    codes_for(status).predicate()
}

/// Abstract status of a concrete server code, if the code is known.
pub fn job_status_from_api(code: &str) -> Option<JobStatus> {
    JobStatus::ALL
        .into_iter()
        .find(|status| codes_for(*status).matches(code))
}
