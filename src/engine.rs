//! Stacking engine.
//!
//! The engine is split into focused submodules under `src/engine/`; this file
//! wires them together and keeps the public paths flat (`crate::engine::Evaluator`,
//! `crate::engine::StackSorter`, ...).
//!
//! ## How the parts work together
//!
//! ```text
//! CriteriaConfig ── CompiledCriteria::new ──────────── (compiled.rs)
//!                     - validate, precompile regexes
//!                     - pick a Strategy, note features
//!                               │
//! assets ─────────────────────── Pipeline::run (pipeline.rs)
//!                               │
//!                               v
//!                   group (grouping.rs)
//!                     - extract_value (extract.rs)
//!                     - evaluate / capture (evaluate.rs)
//!                               │ buckets
//!                               v
//!                   merge (time_merge.rs)
//!                               │
//!                               v
//!                   connected_components (components.rs)   group-union only
//!                               │ clusters
//!                               v
//!                   StackSorter::sort (sort.rs, promote.rs)
//!                               │
//!                               v
//!                           Vec<Stack>
//! ```
//!
//! ## Responsibilities by module
//!
//! - `compiled.rs`: leaf arena, strategy, feature flags.
//! - `extract.rs`: one criterion against one asset; timestamp parsing.
//! - `evaluate.rs`: boolean evaluation and capture for expression mode.
//! - `grouping.rs`: structured keys and buckets for all three strategies.
//! - `time_merge.rs`: re-joins buckets split by delta bucketing.
//! - `components.rs`: clusters for group-union mode.
//! - `promote.rs` / `sort.rs`: promotion lists and the tiered comparator.
//! - `metrics.rs`: per-stage timings and counts.
//!
//! ## Public surface
//!
//! - [`extract`] and [`Evaluator`] for inspecting single assets.
//! - [`StackSorter`] and [`PromoteList`] for ordering assets outside a run.
//!
//! ## Debugging
//!
//! Stages log under the `assetstack` target: `debug` for per-stage summaries,
//! `trace` for per-asset extraction misses.

#[path = "engine/compiled.rs"]
mod compiled;
#[path = "engine/components.rs"]
mod components;
#[path = "engine/evaluate.rs"]
mod evaluate;
#[path = "engine/extract.rs"]
mod extract;
#[path = "engine/grouping.rs"]
mod grouping;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/pipeline.rs"]
mod pipeline;
#[path = "engine/promote.rs"]
mod promote;
#[path = "engine/sort.rs"]
mod sort;
#[path = "engine/time_merge.rs"]
mod time_merge;

pub(crate) use compiled::CompiledCriteria;
pub use compiled::CriteriaFeatures;
pub use evaluate::Evaluator;
pub use extract::extract;
pub use metrics::RunMetrics;
pub(crate) use pipeline::Pipeline;
pub use promote::{PromoteList, PromoteTokens};
pub use sort::{RegexPromotions, StackSorter};
