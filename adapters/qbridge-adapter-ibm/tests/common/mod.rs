//! In-memory job listing endpoint for integration tests.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use qbridge_adapter_ibm::api::jobs_status_query;
use qbridge_adapter_ibm::{IbmError, IbmResult, JobApi, LogicalFilter, RawJobRecord};
use serde_json::{Value, json};

/// Job store that evaluates the serialized `where` clause the way the
/// listing endpoint does.
///
/// Supports equality (array fields match on membership), `inq`, `nin`,
/// `regexp` (a leading `^` anchors the match, anything else is a substring
/// match), `gte`/`lte`/`between` on dates, and nested `and`/`or`. Pages are
/// silently capped at `page_cap` records.
pub struct FakeJobStore {
    records: Vec<Value>,
    page_cap: usize,
    rounds: AtomicUsize,
    queries: Mutex<Vec<Value>>,
}

impl FakeJobStore {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            page_cap: usize::MAX,
            rounds: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page_cap(mut self, cap: usize) -> Self {
        self.page_cap = cap;
        self
    }

    /// Number of listing requests served.
    pub fn rounds(&self) -> usize {
        self.rounds.load(AtomicOrdering::SeqCst)
    }

    /// Wire payload of every listing request, in order.
    pub fn queries(&self) -> Vec<Value> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobApi for FakeJobStore {
    async fn list_jobs(
        &self,
        filter: &LogicalFilter,
        page_size: usize,
        skip: usize,
        descending: bool,
    ) -> IbmResult<Vec<RawJobRecord>> {
        self.rounds.fetch_add(1, AtomicOrdering::SeqCst);
        let query = jobs_status_query(filter, page_size, skip, descending);
        self.queries.lock().unwrap().push(query.clone());

        let condition = query.get("where").cloned().unwrap_or_else(|| json!({}));
        let mut matching: Vec<&Value> = self
            .records
            .iter()
            .filter(|record| matches(record, &condition))
            .collect();
        matching.sort_by(|a, b| {
            let order = creation_date(a)
                .cmp(&creation_date(b))
                .then_with(|| a["id"].as_str().cmp(&b["id"].as_str()));
            if descending { order.reverse() } else { order }
        });

        Ok(matching
            .into_iter()
            .skip(skip)
            .take(page_size.min(self.page_cap))
            .cloned()
            .map(RawJobRecord::from)
            .collect())
    }

    async fn get_job(&self, job_id: &str) -> IbmResult<RawJobRecord> {
        self.records
            .iter()
            .find(|record| record["id"] == job_id)
            .cloned()
            .map(RawJobRecord::from)
            .ok_or_else(|| IbmError::JobNotFound(job_id.to_string()))
    }
}

fn creation_date(record: &Value) -> Option<DateTime<Utc>> {
    record["creationDate"].as_str().and_then(parse_date)
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn matches(record: &Value, condition: &Value) -> bool {
    let Some(clauses) = condition.as_object() else {
        return true;
    };
    clauses.iter().all(|(key, clause)| match key.as_str() {
        "and" => clause
            .as_array()
            .is_none_or(|all| all.iter().all(|c| matches(record, c))),
        "or" => clause
            .as_array()
            .is_none_or(|any| any.iter().any(|c| matches(record, c))),
        field => field_matches(lookup(record, field), clause),
    })
}

fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |value, key| value.get(key))
}

fn holds(value: &Value, wanted: &Value) -> bool {
    match value {
        Value::Array(items) => items.contains(wanted),
        other => other == wanted,
    }
}

fn compare_dates(value: Option<&Value>, bound: &Value) -> Option<Ordering> {
    let value = parse_date(value?.as_str()?)?;
    let bound = parse_date(bound.as_str()?)?;
    Some(value.cmp(&bound))
}

fn field_matches(value: Option<&Value>, clause: &Value) -> bool {
    let Some(operators) = clause.as_object() else {
        return value.is_some_and(|v| holds(v, clause));
    };
    operators.iter().all(|(operator, argument)| match operator.as_str() {
        "inq" => argument.as_array().is_some_and(|set| {
            value.is_some_and(|v| set.iter().any(|wanted| holds(v, wanted)))
        }),
        "nin" => argument.as_array().is_none_or(|set| {
            !value.is_some_and(|v| set.iter().any(|excluded| holds(v, excluded)))
        }),
        "regexp" => {
            let Some(text) = value.and_then(Value::as_str) else {
                return false;
            };
            match argument.as_str() {
                Some(pattern) => match pattern.strip_prefix('^') {
                    Some(prefix) => text.starts_with(prefix),
                    None => text.contains(pattern),
                },
                None => false,
            }
        }
        "gte" => compare_dates(value, argument).is_some_and(Ordering::is_ge),
        "lte" => compare_dates(value, argument).is_some_and(Ordering::is_le),
        "between" => match argument.as_array().map(Vec::as_slice) {
            Some([lower, upper]) => {
                compare_dates(value, lower).is_some_and(Ordering::is_ge)
                    && compare_dates(value, upper).is_some_and(Ordering::is_le)
            }
            _ => false,
        },
        _ => false,
    })
}

/// Base instant test records are spread from.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap()
}

/// A completed job on `ibm_lagos` created `minutes` after [`epoch`].
pub fn job(id: &str, minutes: i64) -> Value {
    job_with(id, minutes, "COMPLETED", &[])
}

pub fn job_with(id: &str, minutes: i64, status: &str, tags: &[&str]) -> Value {
    json!({
        "id": id,
        "name": format!("experiment-{id}"),
        "status": status,
        "creationDate": (epoch() + Duration::minutes(minutes)).to_rfc3339(),
        "backend": {"name": "ibm_lagos"},
        "tags": tags,
    })
}

/// A sub-job of composite job `composite_id` at position `index`.
pub fn sub_job(id: &str, minutes: i64, composite_id: &str, index: usize, status: &str) -> Value {
    let index_tag = format!("ibmq_composite_job_indx_{index}");
    let mut record = job_with(id, minutes, status, &[composite_id, index_tag.as_str()]);
    record["experimentTag"] = Value::from(composite_id);
    record
}
