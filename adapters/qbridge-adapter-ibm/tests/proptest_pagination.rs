//! Property-based tests for filter merging, date windows and pagination.
//!
//! The listing endpoint caps pages at an unknown size and many jobs can share
//! a creation timestamp; pagination must still return every matching job
//! exactly once.

mod common;

use chrono::{DateTime, Duration, Utc};
use common::{FakeJobStore, epoch, job};
use proptest::prelude::*;
use qbridge_adapter_ibm::filter::DateRangeFilter;
use qbridge_adapter_ibm::paginate::DEFAULT_PAGE_SIZE;
use qbridge_adapter_ibm::{LogicalFilter, PageRequest, Predicate, fetch_records};
use rustc_hash::FxHashSet;
use serde_json::Value;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Failed to build runtime")
        .block_on(future)
}

fn minutes(offset: i64) -> DateTime<Utc> {
    epoch() + Duration::minutes(offset)
}

/// Optional timestamps within a day of the epoch.
fn arb_bound() -> impl Strategy<Value = Option<DateTime<Utc>>> {
    prop::option::of((-1440_i64..1440).prop_map(minutes))
}

/// Leaf filters on distinct fields, so merged filters can be compared.
fn arb_leaf() -> impl Strategy<Value = LogicalFilter> {
    ("[a-z]{1,6}", "[a-z0-9]{1,6}").prop_map(|(field, value)| {
        LogicalFilter::leaf(field, Predicate::Eq(Value::from(value)))
    })
}

fn arb_filter() -> impl Strategy<Value = LogicalFilter> {
    (
        prop::collection::vec(arb_leaf(), 0..3),
        prop::collection::vec(arb_leaf(), 0..3),
    )
        .prop_map(|(and, or)| {
            let mut filter = LogicalFilter::new();
            if !and.is_empty() {
                filter = filter.merge(LogicalFilter::all_of(and));
            }
            if !or.is_empty() {
                filter = filter.merge(LogicalFilter::any_of(or));
            }
            filter
        })
}

/// Records whose creation minutes are drawn from a small set, so ties are
/// frequent.
fn arb_records() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(0_i64..4, 0..60).prop_map(|offsets| {
        offsets
            .into_iter()
            .enumerate()
            .map(|(i, offset)| job(&format!("job-{i:03}"), offset))
            .collect()
    })
}

proptest! {
    /// Successive updates only ever tighten the window.
    #[test]
    fn test_date_window_only_tightens(
        start in arb_bound(),
        updates in prop::collection::vec((arb_bound(), arb_bound()), 1..10),
    ) {
        let mut window = DateRangeFilter::new().updated(start, None);
        for (lower, upper) in updates {
            let next = window.updated(lower, upper);
            if let (Some(before), Some(after)) = (window.lower(), next.lower()) {
                prop_assert!(after >= before, "lower bound moved back");
            }
            if let (Some(before), Some(after)) = (window.upper(), next.upper()) {
                prop_assert!(after <= before, "upper bound moved forward");
            }
            prop_assert!(window.lower().is_none() || next.lower().is_some());
            prop_assert!(window.upper().is_none() || next.upper().is_some());
            window = next;
        }
    }

    /// Merging keeps every clause and does not depend on grouping.
    #[test]
    fn test_merge_is_associative_and_lossless(
        a in arb_filter(),
        b in arb_filter(),
        c in arb_filter(),
    ) {
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.clone().merge(b.clone().merge(c.clone()));
        prop_assert_eq!(&left, &right);

        prop_assert_eq!(
            left.and_clauses().len(),
            a.and_clauses().len() + b.and_clauses().len() + c.and_clauses().len()
        );
        prop_assert_eq!(
            left.or_clauses().len(),
            a.or_clauses().len() + b.or_clauses().len() + c.or_clauses().len()
        );
    }

    /// Unbounded listings return each job once, over one round per page plus
    /// the final empty round.
    #[test]
    fn test_unbounded_listing_is_complete_without_duplicates(
        records in arb_records(),
        cap in 1_usize..=DEFAULT_PAGE_SIZE,
        descending in any::<bool>(),
    ) {
        let total = records.len();
        let store = FakeJobStore::new(records).with_page_cap(cap);
        let request = PageRequest { limit: None, skip: 0, descending };

        let fetched = block_on(fetch_records(&store, &LogicalFilter::new(), request))
            .expect("listing failed");

        let ids: FxHashSet<&str> = fetched.iter().filter_map(|r| r.id()).collect();
        prop_assert_eq!(fetched.len(), total);
        prop_assert_eq!(ids.len(), total, "duplicate ids returned");
        prop_assert_eq!(store.rounds(), total.div_ceil(cap) + 1);

        let dates: Vec<DateTime<Utc>> =
            fetched.iter().filter_map(|r| r.creation_date()).collect();
        let ordered = dates.windows(2).all(|pair| {
            if descending { pair[0] >= pair[1] } else { pair[0] <= pair[1] }
        });
        prop_assert!(ordered, "records out of order");
    }

    /// Bounded listings stop at the limit.
    #[test]
    fn test_bounded_listing_respects_limit(
        records in arb_records(),
        cap in 1_usize..=DEFAULT_PAGE_SIZE,
        limit in 0_usize..80,
    ) {
        let total = records.len();
        let store = FakeJobStore::new(records).with_page_cap(cap);
        let request = PageRequest { limit: Some(limit), ..PageRequest::default() };

        let fetched = block_on(fetch_records(&store, &LogicalFilter::new(), request))
            .expect("listing failed");

        let ids: FxHashSet<&str> = fetched.iter().filter_map(|r| r.id()).collect();
        prop_assert_eq!(fetched.len(), limit.min(total));
        prop_assert_eq!(ids.len(), fetched.len());
        if limit == 0 {
            prop_assert_eq!(store.rounds(), 0);
        }
    }
}
