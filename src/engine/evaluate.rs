//! Boolean expression evaluation and value capture.
//!
//! Evaluation short-circuits left to right. A leaf is true when:
//!
//! ```text
//! boolean field   flag set               (or "true"/"false" matches the regex)
//! other fields    extracted value non-empty
//!                 (+ raw value matches the regex for fields without a transform)
//! ```
//!
//! Capture walks the same tree once the root is known to be true and records the
//! extracted values that made it so: every child of an `AND`, the first true
//! child of an `OR`, nothing below a `NOT`.

use super::compiled::{CompiledCriterion, CompiledExpr, LeafId, compile_expression};
use super::extract::{Extracted, extract_value};
use super::grouping::GroupKey;
use crate::criteria::Expression;
use crate::error::{Error, Result};
use crate::{Asset, FieldValue};
use std::collections::BTreeMap;

/// Extracted values by leaf, in declaration order.
pub(crate) type Captured = BTreeMap<LeafId, Extracted>;

pub(crate) fn evaluate(expr: &CompiledExpr, asset: &Asset, leaves: &[CompiledCriterion]) -> Result<bool> {
    match expr {
        CompiledExpr::Leaf(id) => leaf_matches(asset, &leaves[*id]),
        CompiledExpr::And(children) => {
            if children.is_empty() {
                return Err(Error::config("AND expression needs at least one child"));
            }
            for child in children {
                if !evaluate(child, asset, leaves)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        CompiledExpr::Or(children) => {
            if children.is_empty() {
                return Err(Error::config("OR expression needs at least one child"));
            }
            for child in children {
                if evaluate(child, asset, leaves)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        CompiledExpr::Not(child) => Ok(!evaluate(child, asset, leaves)?),
    }
}

fn leaf_matches(asset: &Asset, leaf: &CompiledCriterion) -> Result<bool> {
    let key = leaf.criterion.key;
    if let FieldValue::Flag(flag) = asset.field(key) {
        return Ok(match &leaf.regex {
            Some(re) => re.is_match(if flag { "true" } else { "false" }),
            None => flag,
        });
    }

    let extracted = extract_value(asset, leaf)?;
    if extracted.is_miss() {
        return Ok(false);
    }
    Ok(match &leaf.regex {
        Some(re) if !key.is_transformable() => re.is_match(&extracted.value),
        _ => true,
    })
}

/// Record the non-empty values of the leaves that make `expr` true.
pub(crate) fn capture(expr: &CompiledExpr, asset: &Asset, leaves: &[CompiledCriterion], out: &mut Captured) -> Result<()> {
    match expr {
        CompiledExpr::Leaf(id) => {
            let extracted = extract_value(asset, &leaves[*id])?;
            if !extracted.is_miss() {
                out.insert(*id, extracted);
            }
        }
        CompiledExpr::And(children) => {
            for child in children {
                capture(child, asset, leaves, out)?;
            }
        }
        CompiledExpr::Or(children) => {
            for child in children {
                if evaluate(child, asset, leaves)? {
                    capture(child, asset, leaves, out)?;
                    break;
                }
            }
        }
        CompiledExpr::Not(_) => {}
    }
    Ok(())
}

/// `Some(captured)` when the expression holds for `asset`.
pub(crate) fn match_and_capture(
    expr: &CompiledExpr,
    asset: &Asset,
    leaves: &[CompiledCriterion],
) -> Result<Option<Captured>> {
    if !evaluate(expr, asset, leaves)? {
        return Ok(None);
    }
    let mut captured = Captured::new();
    capture(expr, asset, leaves, &mut captured)?;
    Ok(Some(captured))
}

/// A compiled expression, usable on its own.
///
/// ```
/// use assetstack::{Asset, Criterion, Evaluator, Expression, FieldKey};
///
/// let expr = Expression::and(vec![
///     Expression::leaf(Criterion::new(FieldKey::OriginalFileName).with_regex("^(PXL)_", 1)),
///     Expression::not(Expression::leaf(Criterion::new(FieldKey::IsArchived))),
/// ]);
/// let evaluator = Evaluator::new(&expr).unwrap();
///
/// let asset = Asset::new("a1", "PXL_20230601.jpg");
/// assert!(evaluator.evaluate(&asset).unwrap());
/// assert_eq!(evaluator.grouping_key(&asset).unwrap().as_deref(), Some("originalFileName=PXL"));
/// ```
#[derive(Debug)]
pub struct Evaluator {
    leaves: Vec<CompiledCriterion>,
    root: CompiledExpr,
}

impl Evaluator {
    pub fn new(expression: &Expression) -> Result<Self> {
        let (leaves, root) = compile_expression(expression)?;
        Ok(Evaluator { leaves, root })
    }

    pub fn evaluate(&self, asset: &Asset) -> Result<bool> {
        evaluate(&self.root, asset, &self.leaves)
    }

    /// The grouping key `asset` would be bucketed under, or `None` when the
    /// expression is false or nothing was captured.
    pub fn grouping_key(&self, asset: &Asset) -> Result<Option<String>> {
        let Some(captured) = match_and_capture(&self.root, asset, &self.leaves)? else {
            return Ok(None);
        };
        let key = GroupKey::from_captured(&captured, &self.leaves);
        Ok((!key.is_empty()).then(|| key.render()))
    }
}
