//! Raw job records as returned by the job listing endpoint.
//!
//! The server is not trusted to send well-typed data, so records are parsed
//! leniently: every field is optional, and a field that is present with the
//! wrong shape is remembered instead of failing the whole page. Deciding
//! whether a record is usable is left to the reconstructor.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Fields a record needs before it can become a job.
pub const REQUIRED_FIELDS: [&str; 4] = ["id", "backend", "creation_date", "status"];

/// One job record from the listing or single-job endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct RawJobRecord {
    id: Option<String>,
    name: Option<String>,
    backend_name: Option<String>,
    creation_date: Option<DateTime<Utc>>,
    status: Option<String>,
    tags: Vec<String>,
    experiment_tag: Option<String>,
    malformed: Vec<&'static str>,
}

impl RawJobRecord {
    /// Parse a record from a JSON value.
    pub fn from_value(raw: Value) -> Self {
        let mut record = RawJobRecord::default();
        let Some(object) = raw.as_object() else {
            record.malformed.push("record");
            return record;
        };

        record.id = record.string_field(object, &["id", "job_id"], "id");
        record.name = record.string_field(object, &["name"], "name");
        record.status = record.string_field(object, &["status"], "status");
        record.experiment_tag =
            record.string_field(object, &["experimentTag", "experiment_id"], "experiment_tag");
        record.backend_name = record.backend_field(object);
        record.creation_date = record.date_field(object);
        record.tags = record.tags_field(object);
        record
    }

    /// Job id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Job name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name of the backend the job ran on.
    pub fn backend_name(&self) -> Option<&str> {
        self.backend_name.as_deref()
    }

    /// Creation timestamp.
    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    /// Concrete status code reported by the server.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Job tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Experiment tag, used to group the sub-jobs of a composite job.
    pub fn experiment_tag(&self) -> Option<&str> {
        self.experiment_tag.as_deref()
    }

    /// Fields that were present but had the wrong shape.
    pub fn malformed_fields(&self) -> &[&'static str] {
        &self.malformed
    }

    /// Required fields that are missing or malformed.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .into_iter()
            .filter(|field| match *field {
                "id" => self.id.is_none(),
                "backend" => self.backend_name.is_none(),
                "creation_date" => self.creation_date.is_none(),
                "status" => self.status.is_none(),
                _ => false,
            })
            .collect()
    }

    /// Creation date and id, if the record can serve as a pagination
    /// watermark.
    pub fn watermark(&self) -> Option<(DateTime<Utc>, &str)> {
        Some((self.creation_date?, self.id.as_deref()?))
    }

    fn string_field(
        &mut self,
        object: &Map<String, Value>,
        keys: &[&str],
        label: &'static str,
    ) -> Option<String> {
        let value = keys.iter().find_map(|key| object.get(*key))?;
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            _ => {
                self.malformed.push(label);
                None
            }
        }
    }

    fn backend_field(&mut self, object: &Map<String, Value>) -> Option<String> {
        let value = ["backend", "_backend_info"]
            .iter()
            .find_map(|key| object.get(*key))?;
        match value {
            Value::Object(info) => match info.get("name") {
                Some(Value::String(name)) => Some(name.clone()),
                None | Some(Value::Null) => None,
                Some(_) => {
                    self.malformed.push("backend");
                    None
                }
            },
            Value::String(name) => Some(name.clone()),
            Value::Null => None,
            _ => {
                self.malformed.push("backend");
                None
            }
        }
    }

    fn date_field(&mut self, object: &Map<String, Value>) -> Option<DateTime<Utc>> {
        let value = ["creationDate", "creation_date"]
            .iter()
            .find_map(|key| object.get(*key))?;
        let parsed = match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            Value::Null => return None,
            _ => None,
        };
        if parsed.is_none() {
            self.malformed.push("creation_date");
        }
        parsed
    }

    fn tags_field(&mut self, object: &Map<String, Value>) -> Vec<String> {
        match object.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => {
                let tags: Vec<String> = items
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect();
                if tags.len() != items.len() {
                    self.malformed.push("tags");
                }
                tags
            }
            Some(_) => {
                self.malformed.push("tags");
                Vec::new()
            }
        }
    }
}

impl From<Value> for RawJobRecord {
    fn from(raw: Value) -> Self {
        Self::from_value(raw)
    }
}
