use crate::criteria::CriteriaConfig;
use crate::engine::{CompiledCriteria, CriteriaFeatures, Pipeline, PromoteList, RunMetrics};
use crate::error::Result;
use crate::{Asset, Stack};
use std::time::Duration;

/// Options that complement the criteria configuration.
///
/// Promote lists are comma-separated; see [`PromoteList`] for the token syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Filename promotion list (`PARENT_FILENAME_PROMOTE`).
    pub filename_promote: String,
    /// Extension promotion list (`PARENT_EXT_PROMOTE`).
    pub extension_promote: String,
    /// Leave archived assets out of every stack.
    pub skip_archived: bool,
    /// Leave trashed assets out of every stack.
    pub skip_trashed: bool,
}

impl Options {
    pub fn with_promote(mut self, filename_promote: &str, extension_promote: &str) -> Self {
        self.filename_promote = filename_promote.to_string();
        self.extension_promote = extension_promote.to_string();
        self
    }
}

/// A compiled configuration, reusable across runs.
///
/// ```
/// use assetstack::{Asset, CriteriaConfig, Options, Stacker};
///
/// let config: CriteriaConfig = r#"[{"key":"originalFileName","split":{"delimiters":["."],"index":0}}]"#
///     .parse()
///     .unwrap();
/// let stacker = Stacker::new(&config, &Options::default().with_promote("", "cr2")).unwrap();
///
/// let stacks = stacker.run(&[Asset::new("a", "IMG_1.jpg"), Asset::new("b", "IMG_1.CR2")]).unwrap();
/// assert_eq!(stacks[0].ids(), vec!["b", "a"]);
/// ```
#[derive(Debug)]
pub struct Stacker {
    criteria: CompiledCriteria,
    mode: &'static str,
    filename_promote: PromoteList,
    extension_promote: PromoteList,
    skip_archived: bool,
    skip_trashed: bool,
}

impl Stacker {
    /// Validate `config` and precompile every pattern.
    pub fn new(config: &CriteriaConfig, options: &Options) -> Result<Self> {
        Ok(Stacker {
            criteria: CompiledCriteria::new(config)?,
            mode: config.mode_name(),
            filename_promote: PromoteList::parse(&options.filename_promote),
            extension_promote: PromoteList::parse(&options.extension_promote),
            skip_archived: options.skip_archived,
            skip_trashed: options.skip_trashed,
        })
    }

    pub fn features(&self) -> CriteriaFeatures {
        self.criteria.features
    }

    pub fn run(&self, assets: &[Asset]) -> Result<Vec<Stack>> {
        self.pipeline().run(assets)
    }

    /// Like [`run`](Self::run), with per-stage timings and counts.
    pub fn run_verbose(&self, assets: &[Asset]) -> Result<StackRun> {
        let run = self.pipeline().run_with_metrics(assets)?;
        let details = RunDetails::new(self.mode, self.criteria.features, &run.metrics, &run.stacks);
        Ok(StackRun { stacks: run.stacks, elapsed: run.metrics.total, details })
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.criteria, &self.filename_promote, &self.extension_promote)
            .skip_archived(self.skip_archived)
            .skip_trashed(self.skip_trashed)
    }
}

/// Additional details returned by [`stack_verbose_with`] and
/// [`Stacker::run_verbose`].
#[derive(Debug, Clone)]
pub struct RunDetails {
    /// `"legacy"`, `"groups"` or `"expression"`.
    pub mode: &'static str,
    pub features: CriteriaFeatures,
    pub assets_total: usize,
    pub assets_considered: usize,
    /// Buckets produced by grouping, before the time merge.
    pub buckets: usize,
    pub merged_buckets: usize,
    pub stacked_assets: usize,
    pub total: Duration,
    pub grouping: Duration,
    pub merge: Duration,
    pub clustering: Duration,
    pub sort: Duration,
}

impl RunDetails {
    fn new(mode: &'static str, features: CriteriaFeatures, metrics: &RunMetrics, stacks: &[Stack]) -> Self {
        RunDetails {
            mode,
            features,
            assets_total: metrics.assets_total,
            assets_considered: metrics.assets_considered,
            buckets: metrics.grouping.produced,
            merged_buckets: metrics.merge.produced,
            stacked_assets: stacks.iter().map(Stack::len).sum(),
            total: metrics.total,
            grouping: metrics.grouping.duration,
            merge: metrics.merge.duration,
            clustering: metrics.clustering.duration,
            sort: metrics.sort,
        }
    }
}

/// Result from [`stack_verbose_with`].
#[derive(Debug, Clone)]
pub struct StackRun {
    pub stacks: Vec<Stack>,
    pub elapsed: Duration,
    pub details: RunDetails,
}

/// Stack `assets` with a JSON criteria configuration and two comma-separated
/// promote lists. A blank `criteria` uses [`DEFAULT_CRITERIA`](crate::DEFAULT_CRITERIA).
///
/// # Example
/// ```
/// use assetstack::{Asset, stack};
///
/// let assets = vec![Asset::new("a", "IMG_1.jpg"), Asset::new("b", "IMG_1_edit.jpg")];
/// let criteria = r#"[{"key":"originalFileName","split":{"delimiters":["_edit","."],"index":0}}]"#;
///
/// let stacks = stack(&assets, criteria, "edit", "").unwrap();
/// assert_eq!(stacks[0].primary().id, "b");
/// ```
pub fn stack(assets: &[Asset], criteria: &str, filename_promote: &str, extension_promote: &str) -> Result<Vec<Stack>> {
    let config = CriteriaConfig::parse(criteria)?;
    stack_with(assets, &config, &Options::default().with_promote(filename_promote, extension_promote))
}

/// Stack `assets` with a parsed configuration and explicit options.
pub fn stack_with(assets: &[Asset], config: &CriteriaConfig, options: &Options) -> Result<Vec<Stack>> {
    Stacker::new(config, options)?.run(assets)
}

/// Stack `assets` and return per-stage details alongside the stacks.
pub fn stack_verbose_with(assets: &[Asset], config: &CriteriaConfig, options: &Options) -> Result<StackRun> {
    Stacker::new(config, options)?.run_verbose(assets)
}
