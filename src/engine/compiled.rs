//! Criteria compilation.
//!
//! This is the *static* side of a run: everything derived from the
//! configuration alone, computed once before the first asset is looked at.
//!
//! - Every criterion is copied into a flat arena (`CompiledCriteria::leaves`) in
//!   left-to-right declaration order, and its regex (if any) is compiled there.
//!   A bad pattern therefore fails the run before any asset work starts.
//! - The grouping strategy refers to leaves by `LeafId`, so expression trees and
//!   groups are plain index structures.
//! - `CriteriaFeatures` records coarse facts (time deltas present, promote
//!   captures present) that let later stages skip whole passes.
//!
//! ## Invariants
//!
//! - `LeafId` indexes `CompiledCriteria::leaves`; ids increase left to right, so
//!   iterating ids in ascending order is declaration order.
//! - `CompiledExpr::And`/`Or` are never empty (checked by `Expression::validate`
//!   before compiling).

use crate::criteria::{CriteriaConfig, Criterion, Expression, GroupOperator};
use crate::error::{Error, Result};
use regex::Regex;

/// Leaf identifier (index into `CompiledCriteria::leaves`).
pub(crate) type LeafId = usize;

bitflags::bitflags! {
    /// Coarse facts about a configuration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CriteriaFeatures: u8 {
        /// At least one timestamp criterion buckets by a positive delta.
        const TIME_DELTA    = 1 << 0;
        /// At least one regex carries a promote capture.
        const REGEX_PROMOTE = 1 << 1;
    }
}

/// A criterion with its regex compiled.
#[derive(Debug)]
pub(crate) struct CompiledCriterion {
    pub criterion: Criterion,
    pub regex: Option<Regex>,
}

impl CompiledCriterion {
    /// Compile a single criterion outside of a full configuration.
    pub fn compile(criterion: &Criterion) -> Result<Self> {
        criterion.validate()?;
        let regex = match &criterion.regex {
            Some(spec) => Some(Regex::new(&spec.pattern).map_err(|source| Error::InvalidPattern {
                key: criterion.key.to_string(),
                pattern: spec.pattern.clone(),
                source,
            })?),
            None => None,
        };
        Ok(CompiledCriterion { criterion: criterion.clone(), regex })
    }

    pub fn name(&self) -> &'static str {
        self.criterion.key.as_str()
    }

    pub fn is_time_delta(&self) -> bool {
        self.criterion.delta_ms().is_some()
    }
}

#[derive(Debug)]
pub(crate) enum CompiledExpr {
    Leaf(LeafId),
    And(Vec<CompiledExpr>),
    Or(Vec<CompiledExpr>),
    Not(Box<CompiledExpr>),
}

#[derive(Debug)]
pub(crate) struct CompiledGroup {
    pub operator: GroupOperator,
    pub leaves: Vec<LeafId>,
}

/// Grouping strategy selected by the configuration shape.
#[derive(Debug)]
pub(crate) enum Strategy {
    ExactKey(Vec<LeafId>),
    GroupUnion(Vec<CompiledGroup>),
    Expression(CompiledExpr),
}

/// Pre-compiled configuration shared read-only by every stage of a run.
#[derive(Debug)]
pub(crate) struct CompiledCriteria {
    pub leaves: Vec<CompiledCriterion>,
    pub strategy: Strategy,
    pub features: CriteriaFeatures,
    /// Largest positive delta; the merge window.
    pub max_delta_ms: Option<i64>,
    /// Delimiters used by the sorter's numeric-suffix detection.
    pub filename_delimiters: Vec<String>,
}

impl CompiledCriteria {
    /// Validate `config` and compile every regex it contains.
    pub fn new(config: &CriteriaConfig) -> Result<Self> {
        config.validate()?;

        let mut leaves: Vec<CompiledCriterion> = Vec::new();
        let strategy = match config {
            CriteriaConfig::Legacy(criteria) => {
                let ids = criteria.iter().map(|c| push_leaf(&mut leaves, c)).collect::<Result<Vec<_>>>()?;
                Strategy::ExactKey(ids)
            }
            CriteriaConfig::Groups(groups) => {
                let mut compiled = Vec::with_capacity(groups.len());
                for group in groups {
                    let ids = group.criteria.iter().map(|c| push_leaf(&mut leaves, c)).collect::<Result<Vec<_>>>()?;
                    compiled.push(CompiledGroup { operator: group.operator, leaves: ids });
                }
                Strategy::GroupUnion(compiled)
            }
            CriteriaConfig::Expression(expression) => Strategy::Expression(compile_expr(&mut leaves, expression)?),
        };

        let mut features = CriteriaFeatures::empty();
        for leaf in &leaves {
            if leaf.is_time_delta() {
                features |= CriteriaFeatures::TIME_DELTA;
            }
            if leaf.criterion.promotes() {
                features |= CriteriaFeatures::REGEX_PROMOTE;
            }
        }

        log::debug!(
            "[compile] mode={} leaves={} features={:?} max_delta_ms={:?}",
            config.mode_name(),
            leaves.len(),
            features,
            config.max_delta_ms()
        );

        Ok(CompiledCriteria {
            leaves,
            strategy,
            features,
            max_delta_ms: config.max_delta_ms(),
            filename_delimiters: config.filename_delimiters(),
        })
    }

    pub fn leaf(&self, id: LeafId) -> &CompiledCriterion {
        &self.leaves[id]
    }

    /// The source criteria, in leaf order (used by the sorter).
    pub fn criteria(&self) -> Vec<Criterion> {
        self.leaves.iter().map(|l| l.criterion.clone()).collect()
    }
}

/// Compile a standalone expression into its own leaf arena.
pub(crate) fn compile_expression(expression: &Expression) -> Result<(Vec<CompiledCriterion>, CompiledExpr)> {
    expression.validate()?;
    let mut leaves = Vec::new();
    let root = compile_expr(&mut leaves, expression)?;
    Ok((leaves, root))
}

fn push_leaf(leaves: &mut Vec<CompiledCriterion>, criterion: &Criterion) -> Result<LeafId> {
    leaves.push(CompiledCriterion::compile(criterion)?);
    Ok(leaves.len() - 1)
}

fn compile_expr(leaves: &mut Vec<CompiledCriterion>, expression: &Expression) -> Result<CompiledExpr> {
    Ok(match expression {
        Expression::Leaf(criterion) => CompiledExpr::Leaf(push_leaf(leaves, criterion)?),
        Expression::And(children) => {
            CompiledExpr::And(children.iter().map(|c| compile_expr(leaves, c)).collect::<Result<Vec<_>>>()?)
        }
        Expression::Or(children) => {
            CompiledExpr::Or(children.iter().map(|c| compile_expr(leaves, c)).collect::<Result<Vec<_>>>()?)
        }
        Expression::Not(child) => CompiledExpr::Not(Box::new(compile_expr(leaves, child)?)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::FieldKey;

    #[test]
    fn leaves_follow_declaration_order() {
        let expr = Expression::and(vec![
            Expression::or(vec![
                Expression::leaf(Criterion::new(FieldKey::OriginalFileName).with_regex("^PXL_", 0)),
                Expression::leaf(Criterion::new(FieldKey::OriginalFileName).with_regex("^IMG_", 0)),
            ]),
            Expression::leaf(Criterion::new(FieldKey::LocalDateTime).with_delta(2000)),
        ]);
        let compiled = CompiledCriteria::new(&CriteriaConfig::Expression(expr)).unwrap();

        assert_eq!(compiled.leaves.len(), 3);
        assert_eq!(compiled.leaf(2).criterion.key, FieldKey::LocalDateTime);
        assert!(compiled.leaves[0].regex.is_some());
        assert!(compiled.features.contains(CriteriaFeatures::TIME_DELTA));
        assert!(!compiled.features.contains(CriteriaFeatures::REGEX_PROMOTE));
        assert_eq!(compiled.max_delta_ms, Some(2000));
        match &compiled.strategy {
            Strategy::Expression(CompiledExpr::And(children)) => assert_eq!(children.len(), 2),
            other => panic!("unexpected strategy {other:?}"),
        }
    }

    #[test]
    fn bad_pattern_fails_before_any_asset() {
        let config = CriteriaConfig::Legacy(vec![Criterion::new(FieldKey::OriginalFileName).with_regex("(unclosed", 0)]);
        let err = CompiledCriteria::new(&config).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
        assert!(err.is_configuration());
    }

    #[test]
    fn promote_feature_detected() {
        let config = CriteriaConfig::Legacy(vec![
            Criterion::new(FieldKey::OriginalFileName).with_regex(r"^(\w+)_(RAW|EDIT)", 1).with_promote(2, &["EDIT"]),
        ]);
        let compiled = CompiledCriteria::new(&config).unwrap();
        assert!(compiled.features.contains(CriteriaFeatures::REGEX_PROMOTE));
        assert!(!compiled.features.contains(CriteriaFeatures::TIME_DELTA));
    }
}
