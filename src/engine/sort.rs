//! Stack ordering.
//!
//! Each stack is sorted so that element 0 is the primary. Comparison falls
//! through the tiers below until one of them decides:
//!
//! ```text
//! 1. regex promote     per promoting criterion, in declaration order: the
//!                      asset whose promote capture sits earlier in
//!                      promoteKeys wins; any listed capture beats none
//! 2. filename list     FilenameRank, then larger numeric suffix on a
//!                      biggestNumber match
//! 3. extension list    position of the lowercased extension
//! 4. built-in          jpeg < jpg < png < everything else
//! 5. filename          plain string order
//! ```
//!
//! The sort is stable, so fully tied assets keep their input order.

use super::extract::extension_of;
use super::promote::{FilenameRank, PromoteList, PromoteTokens, Token, numeric_suffix};
use crate::Asset;
use crate::criteria::Criterion;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Promote captures by asset id, then by criterion index.
pub type RegexPromotions = HashMap<String, BTreeMap<usize, String>>;

/// Orders the assets of one stack.
///
/// `criteria` are indexed the same way as the inner keys of `promotions`.
#[derive(Debug, Clone, Copy)]
pub struct StackSorter<'a> {
    filename_promote: &'a PromoteList,
    extension_promote: &'a PromoteList,
    delimiters: &'a [String],
    criteria: &'a [Criterion],
    promotions: &'a RegexPromotions,
}

#[derive(Debug)]
struct SortKey {
    regex: Vec<Option<usize>>,
    filename: FilenameRank,
    biggest: Option<u64>,
    extension: usize,
    builtin: u8,
}

impl<'a> StackSorter<'a> {
    pub fn new(
        filename_promote: &'a PromoteList,
        extension_promote: &'a PromoteList,
        delimiters: &'a [String],
        criteria: &'a [Criterion],
        promotions: &'a RegexPromotions,
    ) -> Self {
        StackSorter { filename_promote, extension_promote, delimiters, criteria, promotions }
    }

    /// Sort `stack` in place; the primary ends up first.
    pub fn sort(&self, stack: &mut [Asset]) {
        if stack.len() < 2 {
            return;
        }
        let mode = self.filename_promote.detect_mode(stack[0].bare_file_name());
        let biggest_number = self.filename_promote.special_tokens().contains(PromoteTokens::BIGGEST_NUMBER);

        let mut keyed: Vec<(SortKey, Asset)> = stack
            .iter()
            .map(|asset| {
                let filename = self.filename_promote.rank(asset.bare_file_name(), &mode, self.delimiters);
                let biggest = match self.filename_promote.token(filename.position) {
                    Some(Token::BiggestNumber) if biggest_number => numeric_suffix(asset.bare_file_name(), self.delimiters),
                    _ => None,
                };
                let extension = extension_of(asset.bare_file_name());
                let key = SortKey {
                    regex: self.regex_ranks(asset),
                    filename,
                    biggest,
                    extension: self.extension_promote.extension_rank(&extension),
                    builtin: builtin_rank(&extension),
                };
                (key, asset.clone())
            })
            .collect();

        keyed.sort_by(|(ka, a), (kb, b)| compare(ka, kb).then_with(|| a.original_file_name.cmp(&b.original_file_name)));

        for (slot, (_, asset)) in stack.iter_mut().zip(keyed) {
            *slot = asset;
        }
    }

    fn regex_ranks(&self, asset: &Asset) -> Vec<Option<usize>> {
        let captured = self.promotions.get(&asset.id);
        self.criteria
            .iter()
            .enumerate()
            .filter_map(|(idx, criterion)| {
                let spec = criterion.regex.as_ref().filter(|_| criterion.promotes())?;
                let value = captured.and_then(|m| m.get(&idx));
                Some(value.and_then(|v| spec.promote_keys.iter().position(|k| k == v)))
            })
            .collect()
    }
}

fn compare(a: &SortKey, b: &SortKey) -> Ordering {
    for (ra, rb) in a.regex.iter().zip(&b.regex) {
        let ord = match (ra, rb) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.filename
        .cmp(&b.filename)
        .then_with(|| b.biggest.cmp(&a.biggest))
        .then_with(|| a.extension.cmp(&b.extension))
        .then_with(|| a.builtin.cmp(&b.builtin))
}

fn builtin_rank(extension: &str) -> u8 {
    match extension {
        "jpeg" => 0,
        "jpg" => 1,
        "png" => 2,
        _ => 3,
    }
}
