//! Time-proximity merge.
//!
//! Delta bucketing floors timestamps, so two shots 200ms apart can land on either
//! side of a bucket boundary. This pass re-joins them:
//!
//! ```text
//! buckets ──► base key (key minus time parts) ──► one bucket?  keep as is
//!                                             └─► several?    pool members,
//!                                                             sort by time,
//!                                                             sliding window
//! ```
//!
//! A member joins the running cluster when it is at most `max_delta_ms` after
//! the previous member (inclusive). Clusters are keyed `<base>|timegroup_<n>`.
//! Members whose timestamp cannot be read keep their original bucket.

use super::compiled::CompiledCriteria;
use super::extract::parse_timestamp;
use super::grouping::{Bucket, GroupKey, KEY_SEPARATOR};
use crate::{Asset, FieldValue};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// A bucket after merging, keyed by its final rendered key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergedBucket {
    pub key: String,
    pub members: Vec<usize>,
}

impl From<Bucket> for MergedBucket {
    fn from(bucket: Bucket) -> Self {
        MergedBucket { key: bucket.key.render(), members: bucket.members }
    }
}

/// Merge buckets whose keys differ only in delta-bucketed timestamps.
pub(crate) fn merge(buckets: Vec<Bucket>, assets: &[Asset], criteria: &CompiledCriteria) -> Vec<MergedBucket> {
    let Some(window) = criteria.max_delta_ms.filter(|d| *d > 0) else {
        return buckets.into_iter().map(MergedBucket::from).collect();
    };

    let mut merged = Vec::with_capacity(buckets.len());
    let mut by_base: BTreeMap<String, Vec<Bucket>> = BTreeMap::new();
    for bucket in buckets {
        if bucket.key.has_time() {
            by_base.entry(bucket.key.render_without_time()).or_default().push(bucket);
        } else {
            merged.push(MergedBucket::from(bucket));
        }
    }

    for (base, group) in by_base {
        if group.len() == 1 {
            merged.extend(group.into_iter().map(MergedBucket::from));
            continue;
        }

        let mut timed: Vec<(DateTime<Utc>, usize)> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        for bucket in group {
            let mut unreadable = Vec::new();
            for &member in &bucket.members {
                if !seen.insert(member) {
                    continue;
                }
                match time_of(&assets[member], &bucket.key, criteria) {
                    Some(at) => timed.push((at, member)),
                    None => unreadable.push(member),
                }
            }
            if !unreadable.is_empty() {
                merged.push(MergedBucket { key: bucket.key.render(), members: unreadable });
            }
        }

        timed.sort_by_key(|(at, _)| *at);
        let clusters = sliding_window(&timed, window);
        log::debug!("[merge] base=\"{}\" members={} clusters={}", base, timed.len(), clusters.len());
        for (n, members) in clusters.into_iter().enumerate() {
            merged.push(MergedBucket { key: format!("{base}{KEY_SEPARATOR}timegroup_{n}"), members });
        }
    }

    merged
}

/// Split time-ordered members wherever the gap to the previous one exceeds
/// `window_ms`.
fn sliding_window(timed: &[(DateTime<Utc>, usize)], window_ms: i64) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut previous: Option<DateTime<Utc>> = None;
    for &(at, member) in timed {
        let joins = matches!(previous, Some(prev) if (at - prev).num_milliseconds() <= window_ms);
        previous = Some(at);
        match clusters.last_mut() {
            Some(current) if joins => current.push(member),
            _ => clusters.push(vec![member]),
        }
    }
    clusters
}

/// The asset's timestamp from the first time leaf of `key` that parses.
fn time_of(asset: &Asset, key: &GroupKey, criteria: &CompiledCriteria) -> Option<DateTime<Utc>> {
    key.time_leaves().find_map(|id| match asset.field(criteria.leaf(id).criterion.key) {
        FieldValue::Text(raw) => parse_timestamp(raw),
        FieldValue::Flag(_) => None,
    })
}
