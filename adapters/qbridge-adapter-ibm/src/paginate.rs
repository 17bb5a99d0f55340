//! Watermark pagination over the job listing endpoint.
//!
//! The listing endpoint caps page sizes without saying so and orders by
//! creation date, which is not unique. Offsets are therefore only used for the
//! caller's initial `skip`; after the first page the position is carried by a
//! watermark:
//!
//! ```text
//!  round 1:  where = F                          skip = S
//!  round k:  where = F ∧ date ≤ W_t ∧ id ∉ W_ids  skip = 0     (newest first)
//!            where = F ∧ date ≥ W_t ∧ id ∉ W_ids  skip = 0     (oldest first)
//! ```
//!
//! `W_t` is the creation date of the last record of the previous page and
//! `W_ids` the ids already returned with exactly that date, so records tied
//! on the page boundary are neither lost nor returned twice.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::JobApi;
use crate::error::IbmResult;
use crate::filter::{DateRangeFilter, ID_FIELD, LogicalFilter, Predicate};
use crate::record::RawJobRecord;

/// Page size requested when the caller wants every match.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// How many records to fetch and in which order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of records; `None` fetches every match.
    pub limit: Option<usize>,
    /// Number of matches to skip before the first returned record.
    pub skip: usize,
    /// Newest records first.
    pub descending: bool,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: None,
            skip: 0,
            descending: true,
        }
    }
}

/// Last-seen position of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Watermark {
    at: DateTime<Utc>,
    ids: Vec<String>,
}

impl Watermark {
    /// Advance past `page`.
    ///
    /// Uses the last record carrying both an id and a creation date. Returns
    /// `None` if no record in the page does.
    fn advance(previous: Option<Watermark>, page: &[RawJobRecord]) -> Option<Watermark> {
        let (at, _) = page.iter().rev().find_map(RawJobRecord::watermark)?;
        let mut ids = match previous {
            Some(previous) if previous.at == at => previous.ids,
            _ => Vec::new(),
        };
        for (date, id) in page.iter().filter_map(RawJobRecord::watermark) {
            if date == at && !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
        Some(Watermark { at, ids })
    }

    fn exclusion(&self) -> Predicate {
        Predicate::NotIn(self.ids.iter().map(|id| Value::from(id.as_str())).collect())
    }
}

/// Filter for the round after `watermark`.
///
/// An id predicate the caller put in `initial` is kept alongside the
/// exclusion under `and`.
fn next_filter(
    initial: &LogicalFilter,
    window: DateRangeFilter,
    watermark: &Watermark,
) -> LogicalFilter {
    let (filter, prior_id) = initial
        .clone()
        .with_creation_date(window)
        .split_field(ID_FIELD);
    match prior_id {
        None => filter.with_field(ID_FIELD, watermark.exclusion()),
        Some(prior) => filter.merge(LogicalFilter::all_of([
            LogicalFilter::leaf(ID_FIELD, watermark.exclusion()),
            LogicalFilter::leaf(ID_FIELD, prior),
        ])),
    }
}

/// Fetch every record matching `initial`, up to `request.limit`.
///
/// Rounds are issued one after another; each depends on the last record of
/// the previous page. Stops on the first empty page, once the limit is
/// reached, or when a page cannot advance the watermark.
pub async fn fetch_records(
    api: &dyn JobApi,
    initial: &LogicalFilter,
    request: PageRequest,
) -> IbmResult<Vec<RawJobRecord>> {
    let mut records = Vec::new();
    if request.limit == Some(0) {
        return Ok(records);
    }

    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut filter = initial.clone();
    let mut window = initial.creation_date();
    let mut watermark: Option<Watermark> = None;
    let mut skip = request.skip;
    let mut round = 0usize;

    loop {
        round += 1;
        let page_size = match request.limit {
            Some(limit) => limit - records.len(),
            None => DEFAULT_PAGE_SIZE,
        };
        debug!(round, page_size, skip, "requesting job page");

        let page = api
            .list_jobs(&filter, page_size, skip, request.descending)
            .await?;
        if page.is_empty() {
            debug!(round, total = records.len(), "no more matching jobs");
            break;
        }

        let next = Watermark::advance(watermark.take(), &page);

        let mut fresh = 0usize;
        for record in page {
            if let Some(id) = record.id() {
                if !seen.insert(id.to_string()) {
                    continue;
                }
            }
            records.push(record);
            fresh += 1;
        }

        if let Some(limit) = request.limit {
            if records.len() >= limit {
                records.truncate(limit);
                break;
            }
        }
        if fresh == 0 {
            warn!(round, "job page repeated records already returned, stopping");
            break;
        }
        let Some(next) = next else {
            warn!(
                round,
                "no record in the job page has an id and a creation date, stopping"
            );
            break;
        };

        window = if request.descending {
            window.updated(None, Some(next.at))
        } else {
            window.updated(Some(next.at), None)
        };
        filter = next_filter(initial, window, &next);
        watermark = Some(next);
        skip = 0;
    }

    Ok(records)
}
