//! Job listing queries and their translation into a [`LogicalFilter`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use qbridge_hal::JobStatus;
use serde_json::Value;

use crate::error::{IbmError, IbmResult};
use crate::filter::{DateRangeFilter, LogicalFilter, Predicate};
use crate::status::{STATUS_FIELD, status_predicate};

/// Number of jobs returned by default.
pub const DEFAULT_JOB_LIMIT: usize = 10;

/// How several job tags are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagsOperator {
    /// Jobs carrying every tag.
    And,
    /// Jobs carrying at least one of the tags.
    #[default]
    Or,
}

impl FromStr for TagsOperator {
    type Err = IbmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(TagsOperator::And),
            "OR" => Ok(TagsOperator::Or),
            _ => Err(IbmError::InvalidArgument(format!(
                "\"{s}\" is not a valid job_tags_operator value. Valid values are \"AND\" and \"OR\""
            ))),
        }
    }
}

impl fmt::Display for TagsOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagsOperator::And => f.write_str("AND"),
            TagsOperator::Or => f.write_str("OR"),
        }
    }
}

/// One status or a list of statuses, as given by the caller.
///
/// Names are validated when the query is turned into a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusArg {
    /// A single status name.
    One(String),
    /// Several status names, any of which matches.
    Many(Vec<String>),
}

impl From<JobStatus> for StatusArg {
    fn from(status: JobStatus) -> Self {
        StatusArg::One(status.name().to_string())
    }
}

impl From<&str> for StatusArg {
    fn from(name: &str) -> Self {
        StatusArg::One(name.to_string())
    }
}

impl From<String> for StatusArg {
    fn from(name: String) -> Self {
        StatusArg::One(name)
    }
}

impl From<Vec<JobStatus>> for StatusArg {
    fn from(statuses: Vec<JobStatus>) -> Self {
        StatusArg::Many(statuses.iter().map(|s| s.name().to_string()).collect())
    }
}

impl From<Vec<String>> for StatusArg {
    fn from(names: Vec<String>) -> Self {
        StatusArg::Many(names)
    }
}

impl From<&[&str]> for StatusArg {
    fn from(names: &[&str]) -> Self {
        StatusArg::Many(names.iter().map(|n| (*n).to_string()).collect())
    }
}

/// Parameters of a job listing.
#[derive(Debug, Clone)]
pub struct JobQuery {
    /// Maximum number of jobs; `None` lists every match.
    pub limit: Option<usize>,
    /// Number of matching jobs to skip first.
    pub skip: usize,
    /// Only jobs that ran on this backend.
    pub backend_name: Option<String>,
    /// Only jobs in this status or these statuses.
    pub status: Option<StatusArg>,
    /// Regular expression the job name must match.
    pub job_name: Option<String>,
    /// Only jobs created at or after this time.
    pub start_datetime: Option<DateTime<Utc>>,
    /// Only jobs created at or before this time.
    pub end_datetime: Option<DateTime<Utc>>,
    /// Tags to match.
    pub job_tags: Vec<String>,
    /// How `job_tags` are combined (`AND` or `OR`).
    pub job_tags_operator: String,
    /// Newest jobs first.
    pub descending: bool,
    /// Return the sub-jobs of composite jobs individually.
    pub ignore_composite_jobs: bool,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_JOB_LIMIT),
            skip: 0,
            backend_name: None,
            status: None,
            job_name: None,
            start_datetime: None,
            end_datetime: None,
            job_tags: Vec::new(),
            job_tags_operator: TagsOperator::Or.to_string(),
            descending: true,
            ignore_composite_jobs: false,
        }
    }
}

impl JobQuery {
    /// Query with the default limit and newest jobs first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of jobs; `None` lists every match.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Skip the first `skip` matches.
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Only jobs that ran on the backend.
    pub fn with_backend(mut self, name: impl Into<String>) -> Self {
        self.backend_name = Some(name.into());
        self
    }

    /// Only jobs in the given status or statuses.
    pub fn with_status(mut self, status: impl Into<StatusArg>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Only jobs whose name matches the regular expression.
    pub fn with_name(mut self, pattern: impl Into<String>) -> Self {
        self.job_name = Some(pattern.into());
        self
    }

    /// Only jobs created at or after `start`. Any time zone is accepted.
    pub fn with_start<Tz: chrono::TimeZone>(mut self, start: DateTime<Tz>) -> Self {
        self.start_datetime = Some(start.with_timezone(&Utc));
        self
    }

    /// Only jobs created at or before `end`. Any time zone is accepted.
    pub fn with_end<Tz: chrono::TimeZone>(mut self, end: DateTime<Tz>) -> Self {
        self.end_datetime = Some(end.with_timezone(&Utc));
        self
    }

    /// Only jobs carrying the tags, combined with `operator`.
    pub fn with_tags<I, S>(mut self, tags: I, operator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.job_tags = tags.into_iter().map(Into::into).collect();
        self.job_tags_operator = operator.into();
        self
    }

    /// Oldest jobs first instead of newest first.
    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }

    /// Return composite sub-jobs as individual jobs.
    pub fn ignoring_composite_jobs(mut self) -> Self {
        self.ignore_composite_jobs = true;
        self
    }

    /// Build the listing filter.
    ///
    /// Fails with [`IbmError::InvalidArgument`] for an unknown status name or
    /// tag operator.
    pub fn to_filter(&self) -> IbmResult<LogicalFilter> {
        let mut filter = LogicalFilter::new();

        if let Some(backend) = &self.backend_name {
            filter = filter.with_field(
                "backend.name",
                Predicate::Eq(Value::from(backend.as_str())),
            );
        }

        match &self.status {
            None => {}
            Some(StatusArg::One(name)) => {
                let status = JobStatus::from_name(name)?;
                filter = filter.with_field(STATUS_FIELD, status_predicate(status));
            }
            Some(StatusArg::Many(names)) => {
                let leaves = names
                    .iter()
                    .map(|name| -> IbmResult<LogicalFilter> {
                        let status = JobStatus::from_name(name)?;
                        Ok(LogicalFilter::leaf(STATUS_FIELD, status_predicate(status)))
                    })
                    .collect::<IbmResult<Vec<_>>>()?;
                if !leaves.is_empty() {
                    filter = filter.merge(LogicalFilter::any_of(leaves));
                }
            }
        }

        if let Some(pattern) = &self.job_name {
            filter = filter.with_field("name", Predicate::Regexp(pattern.clone()));
        }

        if self.start_datetime.is_some() || self.end_datetime.is_some() {
            filter = filter.with_creation_date(
                DateRangeFilter::new().updated(self.start_datetime, self.end_datetime),
            );
        }

        let operator: TagsOperator = self.job_tags_operator.parse()?;
        if !self.job_tags.is_empty() {
            let tags = self.job_tags.iter().map(|t| Value::from(t.as_str()));
            filter = match operator {
                TagsOperator::Or => filter.with_field("tags", Predicate::In(tags.collect())),
                TagsOperator::And => filter.merge(LogicalFilter::all_of(
                    tags.map(|tag| LogicalFilter::leaf("tags", Predicate::Eq(tag))),
                )),
            };
        }

        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let query = JobQuery::new();
        assert_eq!(query.limit, Some(DEFAULT_JOB_LIMIT));
        assert_eq!(query.skip, 0);
        assert!(query.descending);
        assert_eq!(query.job_tags_operator, "OR");
        assert!(query.to_filter().unwrap().is_empty());
    }

    #[test]
    fn test_error_status_is_prefix_regex() {
        let filter = JobQuery::new().with_status("error").to_filter().unwrap();
        assert_eq!(filter.to_json(), json!({"status": {"regexp": "^ERROR"}}));
    }

    #[test]
    fn test_status_list_becomes_or() {
        let filter = JobQuery::new()
            .with_status(vec![JobStatus::Running, JobStatus::Queued])
            .to_filter()
            .unwrap();
        assert_eq!(
            filter.to_json(),
            json!({"or": [{"status": "RUNNING"}, {"status": "QUEUED"}]})
        );
    }

    #[test]
    fn test_unknown_status_is_invalid_argument() {
        let err = JobQuery::new()
            .with_status(&["RUNNING", "SLEEPING"][..])
            .to_filter()
            .unwrap_err();
        assert!(matches!(err, IbmError::InvalidArgument(ref m) if m.contains("SLEEPING")));
    }

    #[test]
    fn test_and_tags() {
        let filter = JobQuery::new()
            .with_tags(["a", "b"], "AND")
            .to_filter()
            .unwrap();
        assert_eq!(
            filter.to_json(),
            json!({"and": [{"tags": "a"}, {"tags": "b"}]})
        );
    }

    #[test]
    fn test_or_tags_lowercase_operator() {
        let filter = JobQuery::new()
            .with_tags(["a", "b"], "or")
            .to_filter()
            .unwrap();
        assert_eq!(filter.to_json(), json!({"tags": {"inq": ["a", "b"]}}));
    }

    #[test]
    fn test_bad_tag_operator_names_value() {
        let err = JobQuery::new()
            .with_tags(["a"], "XOR")
            .to_filter()
            .unwrap_err();
        assert!(matches!(err, IbmError::InvalidArgument(ref m) if m.contains("XOR")));
    }

    #[test]
    fn test_dates_are_converted_to_utc() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let start = tz.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap();
        let filter = JobQuery::new().with_start(start).to_filter().unwrap();
        assert_eq!(
            filter.to_json(),
            json!({"creationDate": {"gte": "2021-03-01T10:00:00Z"}})
        );
    }

    #[test]
    fn test_full_query() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap();
        let filter = JobQuery::new()
            .with_backend("ibm_lagos")
            .with_status(JobStatus::Initializing)
            .with_name("^bell")
            .with_start(start)
            .with_end(end)
            .with_tags(["exp"], "OR")
            .to_filter()
            .unwrap();
        assert_eq!(
            filter.to_json(),
            json!({
                "backend.name": "ibm_lagos",
                "status": {"inq": ["CREATING", "CREATED"]},
                "name": {"regexp": "^bell"},
                "creationDate": {"between": ["2021-01-01T00:00:00Z", "2021-02-01T00:00:00Z"]},
                "tags": {"inq": ["exp"]},
            })
        );
    }
}
