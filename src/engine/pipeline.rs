//! Stage orchestration for one stacking run.
//!
//! ```text
//! assets ─► filter (archived / trashed)
//!        ─► group          (grouping.rs)     buckets + promote captures
//!        ─► merge          (time_merge.rs)   only with a positive delta
//!        ─► cluster        exact modes: buckets of 2+
//!                          group-union:  connected components (components.rs)
//!        ─► sort           (sort.rs)         primary first
//!        ─► Vec<Stack>
//! ```
//!
//! Any error aborts the run; no partial stack list is returned.

use super::compiled::{CompiledCriteria, CriteriaFeatures};
use super::components::connected_components;
use super::grouping::{Grouping, group};
use super::metrics::{RunMetrics, RunResult, StageMetrics};
use super::promote::PromoteList;
use super::sort::StackSorter;
use super::time_merge::{MergedBucket, merge};
use crate::error::Result;
use crate::{Asset, Stack};
use std::borrow::Cow;
use std::time::Instant;

/// One configured run over a compiled criteria set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pipeline<'a> {
    criteria: &'a CompiledCriteria,
    filename_promote: &'a PromoteList,
    extension_promote: &'a PromoteList,
    skip_archived: bool,
    skip_trashed: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(criteria: &'a CompiledCriteria, filename_promote: &'a PromoteList, extension_promote: &'a PromoteList) -> Self {
        Pipeline { criteria, filename_promote, extension_promote, skip_archived: false, skip_trashed: false }
    }

    pub fn skip_archived(mut self, skip: bool) -> Self {
        self.skip_archived = skip;
        self
    }

    pub fn skip_trashed(mut self, skip: bool) -> Self {
        self.skip_trashed = skip;
        self
    }

    pub fn run(self, assets: &[Asset]) -> Result<Vec<Stack>> {
        Ok(self.run_with_metrics(assets)?.stacks)
    }

    pub fn run_with_metrics(self, assets: &[Asset]) -> Result<RunResult> {
        let total_start = Instant::now();

        let considered: Cow<'_, [Asset]> = if self.skip_archived || self.skip_trashed {
            Cow::Owned(
                assets
                    .iter()
                    .filter(|a| !(self.skip_archived && a.is_archived) && !(self.skip_trashed && a.is_trashed))
                    .cloned()
                    .collect(),
            )
        } else {
            Cow::Borrowed(assets)
        };
        let mut metrics =
            RunMetrics { assets_total: assets.len(), assets_considered: considered.len(), ..RunMetrics::default() };

        let start = Instant::now();
        let Grouping { buckets, union, promotions } = group(&considered, self.criteria)?;
        metrics.grouping = StageMetrics { duration: start.elapsed(), produced: buckets.len() };

        let start = Instant::now();
        let merged: Vec<MergedBucket> = if self.criteria.features.contains(CriteriaFeatures::TIME_DELTA) {
            merge(buckets, &considered, self.criteria)
        } else {
            buckets.into_iter().map(MergedBucket::from).collect()
        };
        metrics.merge = StageMetrics { duration: start.elapsed(), produced: merged.len() };

        let start = Instant::now();
        let clusters: Vec<Vec<usize>> = if union {
            connected_components(considered.len(), &merged)
        } else {
            merged.into_iter().filter(|b| b.members.len() >= 2).map(|b| b.members).collect()
        };
        metrics.clustering = StageMetrics { duration: start.elapsed(), produced: clusters.len() };

        let start = Instant::now();
        let criteria = if self.criteria.features.contains(CriteriaFeatures::REGEX_PROMOTE) {
            self.criteria.criteria()
        } else {
            Vec::new()
        };
        let sorter = StackSorter::new(
            self.filename_promote,
            self.extension_promote,
            &self.criteria.filename_delimiters,
            &criteria,
            &promotions,
        );
        let stacks: Vec<Stack> = clusters
            .into_iter()
            .map(|members| {
                let mut stack: Vec<Asset> = members.iter().map(|&idx| considered[idx].clone()).collect();
                sorter.sort(&mut stack);
                Stack::new(stack)
            })
            .collect();
        metrics.sort = start.elapsed();
        metrics.total = total_start.elapsed();

        log::debug!(
            "[pipeline] assets={}/{} buckets={} merged={} stacks={} total={:?}",
            metrics.assets_considered,
            metrics.assets_total,
            metrics.grouping.produced,
            metrics.merge.produced,
            stacks.len(),
            metrics.total
        );

        Ok(RunResult { stacks, metrics })
    }
}
