//! Logical filters for the job listing endpoint.
//!
//! A [`LogicalFilter`] is a value: field predicates plus `and`/`or` lists of
//! nested filters. Every combinator step returns a new filter, so one
//! pagination round can never alias the filter of another.
//!
//! Serialized, a filter is the `where` clause of a listing request:
//!
//! ```text
//! {"backend.name": "ibm_lagos",
//!  "creationDate": {"between": ["2021-01-01T00:00:00Z", "2021-02-01T00:00:00Z"]},
//!  "id": {"nin": ["5f1b..."]},
//!  "or": [{"status": "RUNNING"}, {"status": "QUEUED"}]}
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Value, json};

/// Field holding the job creation date.
pub const CREATION_DATE_FIELD: &str = "creationDate";

/// Field holding the job id.
pub const ID_FIELD: &str = "id";

/// Field every sub-job of a composite job carries the composite id in.
pub const EXPERIMENT_TAG_FIELD: &str = "experimentTag";

/// Condition on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals the value.
    Eq(Value),
    /// Field is one of the values (`inq`).
    In(Vec<Value>),
    /// Field is none of the values (`nin`).
    NotIn(Vec<Value>),
    /// Field matches a regular expression.
    Regexp(String),
    /// Field is a date inside the range.
    DateRange(DateRangeFilter),
}

impl Predicate {
    /// Wire encoding of the predicate.
    pub fn to_json(&self) -> Value {
        match self {
            Predicate::Eq(value) => value.clone(),
            Predicate::In(values) => json!({ "inq": values }),
            Predicate::NotIn(values) => json!({ "nin": values }),
            Predicate::Regexp(pattern) => json!({ "regexp": pattern }),
            Predicate::DateRange(range) => range.to_json(),
        }
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Tree of field predicates combined with `and`/`or`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogicalFilter {
    fields: BTreeMap<String, Predicate>,
    and: Vec<LogicalFilter>,
    or: Vec<LogicalFilter>,
}

impl LogicalFilter {
    /// A filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter with a single field predicate.
    pub fn leaf(field: impl Into<String>, predicate: Predicate) -> Self {
        Self::new().with_field(field, predicate)
    }

    /// Conjunction of the given filters.
    pub fn all_of(filters: impl IntoIterator<Item = LogicalFilter>) -> Self {
        Self {
            and: filters.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Disjunction of the given filters.
    pub fn any_of(filters: impl IntoIterator<Item = LogicalFilter>) -> Self {
        Self {
            or: filters.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Set a field predicate, replacing any previous one for the field.
    pub fn with_field(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.fields.insert(field.into(), predicate);
        self
    }

    /// Remove a field predicate, returning the filter and the removed
    /// predicate.
    pub fn split_field(mut self, field: &str) -> (Self, Option<Predicate>) {
        let removed = self.fields.remove(field);
        (self, removed)
    }

    /// Predicate on a field, if set.
    pub fn field(&self, field: &str) -> Option<&Predicate> {
        self.fields.get(field)
    }

    /// All field predicates.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sub-filters under `and`.
    pub fn and_clauses(&self) -> &[LogicalFilter] {
        &self.and
    }

    /// Sub-filters under `or`.
    pub fn or_clauses(&self) -> &[LogicalFilter] {
        &self.or
    }

    /// Whether the filter has no condition at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.and.is_empty() && self.or.is_empty()
    }

    /// Append the `and` and `or` sub-filters of `incoming` to this filter's.
    ///
    /// Existing sub-filters are never dropped or reordered. Field predicates
    /// of `incoming` are ignored.
    pub fn merge(mut self, incoming: LogicalFilter) -> Self {
        self.and.extend(incoming.and);
        self.or.extend(incoming.or);
        self
    }

    /// The creation-date range, empty if the filter has none.
    pub fn creation_date(&self) -> DateRangeFilter {
        match self.fields.get(CREATION_DATE_FIELD) {
            Some(Predicate::DateRange(range)) => *range,
            _ => DateRangeFilter::default(),
        }
    }

    /// Replace the creation-date range. An empty range removes the field.
    pub fn with_creation_date(mut self, range: DateRangeFilter) -> Self {
        if range.is_empty() {
            self.fields.remove(CREATION_DATE_FIELD);
        } else {
            self.fields
                .insert(CREATION_DATE_FIELD.to_string(), Predicate::DateRange(range));
        }
        self
    }

    /// Wire encoding of the filter.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for LogicalFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.fields.len()
            + usize::from(!self.and.is_empty())
            + usize::from(!self.or.is_empty());
        let mut map = serializer.serialize_map(Some(len))?;
        for (field, predicate) in &self.fields {
            map.serialize_entry(field, predicate)?;
        }
        if !self.and.is_empty() {
            map.serialize_entry("and", &self.and)?;
        }
        if !self.or.is_empty() {
            map.serialize_entry("or", &self.or)?;
        }
        map.end()
    }
}

/// Creation-date window with at most one lower and one upper bound.
///
/// Both bounds encode as `between`, a single one as `gte` or `lte`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRangeFilter {
    lower: Option<DateTime<Utc>>,
    upper: Option<DateTime<Utc>>,
}

impl DateRangeFilter {
    /// Window with no bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Window starting at `lower` (inclusive).
    pub fn since(lower: DateTime<Utc>) -> Self {
        Self::new().updated(Some(lower), None)
    }

    /// Window ending at `upper` (inclusive).
    pub fn until(upper: DateTime<Utc>) -> Self {
        Self::new().updated(None, Some(upper))
    }

    /// Window between two dates (inclusive).
    pub fn between(lower: DateTime<Utc>, upper: DateTime<Utc>) -> Self {
        Self::new().updated(Some(lower), Some(upper))
    }

    /// Lower bound.
    pub fn lower(&self) -> Option<DateTime<Utc>> {
        self.lower
    }

    /// Upper bound.
    pub fn upper(&self) -> Option<DateTime<Utc>> {
        self.upper
    }

    /// Whether no bound is set.
    pub fn is_empty(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Fold new bounds into the window.
    ///
    /// The lower bound becomes the latest of the known lower bounds and the
    /// upper bound the earliest of the known upper bounds, so the window
    /// never widens.
    pub fn updated(self, lower: Option<DateTime<Utc>>, upper: Option<DateTime<Utc>>) -> Self {
        Self {
            lower: tightest(self.lower, lower, std::cmp::max),
            upper: tightest(self.upper, upper, std::cmp::min),
        }
    }

    /// Wire encoding of the window.
    pub fn to_json(&self) -> Value {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => {
                json!({ "between": [format_timestamp(lower), format_timestamp(upper)] })
            }
            (Some(lower), None) => json!({ "gte": format_timestamp(lower) }),
            (None, Some(upper)) => json!({ "lte": format_timestamp(upper) }),
            (None, None) => json!({}),
        }
    }
}

fn tightest(
    current: Option<DateTime<Utc>>,
    new: Option<DateTime<Utc>>,
    pick: fn(DateTime<Utc>, DateTime<Utc>) -> DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (current, new) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}

/// Timestamp as sent to the server: RFC 3339 in UTC with a `Z` suffix.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 1, hour, 0, 0).unwrap()
    }

    fn status(code: &str) -> LogicalFilter {
        LogicalFilter::leaf("status", Predicate::Eq(json!(code)))
    }

    #[test]
    fn test_merge_appends_and_clauses() {
        let merged =
            LogicalFilter::all_of([status("A")]).merge(LogicalFilter::all_of([status("B")]));
        assert_eq!(
            merged.to_json(),
            json!({"and": [{"status": "A"}, {"status": "B"}]})
        );
    }

    #[test]
    fn test_merge_creates_missing_key() {
        let merged =
            LogicalFilter::all_of([status("A")]).merge(LogicalFilter::any_of([status("B")]));
        assert_eq!(merged.and_clauses().len(), 1);
        assert_eq!(merged.or_clauses(), [status("B")]);
    }

    #[test]
    fn test_merge_leaves_fields_untouched() {
        let base = LogicalFilter::leaf("name", Predicate::Regexp("^bell".into()));
        let incoming = LogicalFilter::leaf("name", Predicate::Regexp("other".into()))
            .merge(LogicalFilter::all_of([status("A")]));
        let merged = base.merge(incoming);
        assert_eq!(
            merged.field("name"),
            Some(&Predicate::Regexp("^bell".into()))
        );
        assert_eq!(merged.and_clauses(), [status("A")]);
    }

    #[test]
    fn test_leaf_encodings() {
        let filter = LogicalFilter::new()
            .with_field("backend.name", Predicate::Eq(json!("ibm_lagos")))
            .with_field("tags", Predicate::In(vec![json!("a"), json!("b")]))
            .with_field(ID_FIELD, Predicate::NotIn(vec![json!("j1")]))
            .with_field("name", Predicate::Regexp("^bell".into()));
        assert_eq!(
            filter.to_json(),
            json!({
                "backend.name": "ibm_lagos",
                "tags": {"inq": ["a", "b"]},
                "id": {"nin": ["j1"]},
                "name": {"regexp": "^bell"},
            })
        );
    }

    #[test]
    fn test_empty_filter_serializes_to_empty_object() {
        assert!(LogicalFilter::new().is_empty());
        assert_eq!(LogicalFilter::new().to_json(), json!({}));
    }

    #[test]
    fn test_date_range_encodings() {
        assert_eq!(DateRangeFilter::new().to_json(), json!({}));
        assert_eq!(
            DateRangeFilter::since(ts(10)).to_json(),
            json!({"gte": "2021-01-01T10:00:00Z"})
        );
        assert_eq!(
            DateRangeFilter::until(ts(12)).to_json(),
            json!({"lte": "2021-01-01T12:00:00Z"})
        );
        assert_eq!(
            DateRangeFilter::between(ts(10), ts(12)).to_json(),
            json!({"between": ["2021-01-01T10:00:00Z", "2021-01-01T12:00:00Z"]})
        );
    }

    #[test]
    fn test_date_range_collapses_to_between() {
        let range = DateRangeFilter::since(ts(10)).updated(None, Some(ts(12)));
        assert_eq!(range, DateRangeFilter::between(ts(10), ts(12)));
    }

    #[test]
    fn test_date_range_never_widens() {
        let range = DateRangeFilter::between(ts(10), ts(12));

        let tighter = range.updated(Some(ts(11)), Some(ts(11)));
        assert_eq!(tighter.lower(), Some(ts(11)));
        assert_eq!(tighter.upper(), Some(ts(11)));

        let wider = range.updated(Some(ts(9)), Some(ts(13)));
        assert_eq!(wider, range);

        let unchanged = range.updated(None, None);
        assert_eq!(unchanged, range);
    }

    #[test]
    fn test_creation_date_field() {
        let filter = LogicalFilter::new().with_creation_date(DateRangeFilter::until(ts(5)));
        assert_eq!(filter.creation_date(), DateRangeFilter::until(ts(5)));
        assert_eq!(
            filter.to_json(),
            json!({"creationDate": {"lte": "2021-01-01T05:00:00Z"}})
        );

        let cleared = filter.with_creation_date(DateRangeFilter::new());
        assert!(cleared.is_empty());
    }

    #[test]
    fn test_split_field() {
        let filter = LogicalFilter::leaf(ID_FIELD, Predicate::Eq(json!("j1")));
        let (rest, removed) = filter.split_field(ID_FIELD);
        assert!(rest.is_empty());
        assert_eq!(removed, Some(Predicate::Eq(json!("j1"))));
    }
}
