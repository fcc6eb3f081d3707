//! Pipeline run metrics.
//!
//! - `Pipeline::run` for normal operation.
//! - `Pipeline::run_with_metrics` for profiling and for inspecting what each
//!   stage produced.
//!
//! Stage counts are cheap; nothing here keeps per-asset data.

use crate::Stack;
use std::time::Duration;

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Total elapsed time for `Pipeline::run_with_metrics`.
    pub total: Duration,
    /// Assets handed to the run.
    pub assets_total: usize,
    /// Assets left after archive/trash filtering.
    pub assets_considered: usize,
    /// Key extraction and bucketing; `produced` counts buckets.
    pub grouping: StageMetrics,
    /// Time-proximity merge; `produced` counts buckets after merging.
    pub merge: StageMetrics,
    /// Bucket-to-cluster resolution; `produced` counts clusters of two or more.
    pub clustering: StageMetrics,
    /// Ordering inside stacks.
    pub sort: Duration,
}

/// Timing and output count for a single stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageMetrics {
    pub duration: Duration,
    pub produced: usize,
}

/// Pipeline output bundled with timing information.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub stacks: Vec<Stack>,
    pub metrics: RunMetrics,
}
