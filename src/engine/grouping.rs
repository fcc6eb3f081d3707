//! Grouping strategies.
//!
//! Each strategy turns every asset into zero or more `GroupKey`s and buckets
//! assets by the rendered key:
//!
//! ```text
//! ExactKey    values of the ordered criteria          "IMG_2482|2023-06-01T10:00:00.000Z"
//! GroupUnion  AND group -> one tagged key of pairs      "g0|originalFileName=IMG|type=IMAGE"
//!             OR group  -> one tagged key per criterion "g0c1|localDateTime=2023-..."
//! Expression  key=value pairs of the leaves that made
//!             the tree true                             "originalFileName=PXL_|localDateTime=..."
//! ```
//!
//! Keys stay structured (`KeyPart`s) until the time merge has had a chance to
//! drop the delta-bucketed components. Group-union buckets are not stacks yet:
//! the pipeline feeds them into `components.rs`.
//!
//! Promote captures met along the way are returned in `Grouping::promotions`
//! rather than written to shared state.

use super::compiled::{CompiledCriteria, CompiledCriterion, LeafId, Strategy};
use super::evaluate::{Captured, match_and_capture};
use super::extract::{Extracted, extract_value};
use super::sort::RegexPromotions;
use crate::Asset;
use crate::criteria::GroupOperator;
use crate::error::Result;
use std::collections::BTreeMap;

/// Separator between key components.
pub(crate) const KEY_SEPARATOR: &str = "|";

/// One component of a grouping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyPart {
    pub name: &'static str,
    pub value: String,
    /// Producing leaf when the part is a delta-bucketed timestamp.
    pub time_leaf: Option<LeafId>,
}

impl KeyPart {
    fn new(id: LeafId, leaf: &CompiledCriterion, value: String) -> Self {
        KeyPart { name: leaf.name(), value, time_leaf: leaf.is_time_delta().then_some(id) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyStyle {
    /// Bare values (exact-key mode).
    Values,
    /// `key=value` pairs.
    Pairs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GroupKey {
    pub tag: Option<String>,
    pub style: KeyStyle,
    pub parts: Vec<KeyPart>,
}

impl GroupKey {
    /// Expression-mode key: captured leaves in leaf order, first occurrence of
    /// each field name wins.
    pub fn from_captured(captured: &Captured, criteria: &[CompiledCriterion]) -> Self {
        let mut parts: Vec<KeyPart> = Vec::with_capacity(captured.len());
        for (&id, extracted) in captured {
            let leaf = &criteria[id];
            if let Some(kept) = parts.iter().find(|p| p.name == leaf.name()) {
                log::debug!(
                    "[group:expression] dropped {}={} from leaf {}; keeping {}",
                    kept.name,
                    extracted.value,
                    id,
                    kept.value
                );
                continue;
            }
            parts.push(KeyPart::new(id, leaf, extracted.value.clone()));
        }
        GroupKey { tag: None, style: KeyStyle::Pairs, parts }
    }

    pub fn render(&self) -> String {
        self.render_filtered(|_| true)
    }

    /// The key with every delta-bucketed component removed.
    pub fn render_without_time(&self) -> String {
        self.render_filtered(|p| p.time_leaf.is_none())
    }

    fn render_filtered(&self, keep: impl Fn(&KeyPart) -> bool) -> String {
        let mut segments: Vec<String> = Vec::with_capacity(self.parts.len() + 1);
        if let Some(tag) = &self.tag {
            segments.push(tag.clone());
        }
        for part in self.parts.iter().filter(|p| keep(p)) {
            segments.push(match self.style {
                KeyStyle::Values => part.value.clone(),
                KeyStyle::Pairs => format!("{}={}", part.name, part.value),
            });
        }
        segments.join(KEY_SEPARATOR)
    }

    pub fn has_time(&self) -> bool {
        self.parts.iter().any(|p| p.time_leaf.is_some())
    }

    pub fn time_leaves(&self) -> impl Iterator<Item = LeafId> + '_ {
        self.parts.iter().filter_map(|p| p.time_leaf)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Assets sharing one key. `members` are indices into the asset slice, in
/// input order.
#[derive(Debug, Clone)]
pub(crate) struct Bucket {
    pub key: GroupKey,
    pub members: Vec<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct Grouping {
    /// Buckets ordered by rendered key.
    pub buckets: Vec<Bucket>,
    /// Buckets are shared keys to be resolved by connectivity.
    pub union: bool,
    pub promotions: RegexPromotions,
}

/// Run the configured strategy over `assets`.
pub(crate) fn group(assets: &[Asset], criteria: &CompiledCriteria) -> Result<Grouping> {
    let mut collector = Collector::default();

    match &criteria.strategy {
        Strategy::ExactKey(ids) => {
            for (idx, asset) in assets.iter().enumerate() {
                let mut parts = Vec::with_capacity(ids.len());
                for &id in ids {
                    let leaf = criteria.leaf(id);
                    let extracted = extract_value(asset, leaf)?;
                    collector.note_promote(asset, id, &extracted);
                    if !extracted.is_miss() {
                        parts.push(KeyPart::new(id, leaf, extracted.value));
                    }
                }
                if parts.is_empty() {
                    continue;
                }
                collector.add(GroupKey { tag: None, style: KeyStyle::Values, parts }, idx);
            }
        }
        Strategy::GroupUnion(groups) => {
            for (idx, asset) in assets.iter().enumerate() {
                for (gi, group) in groups.iter().enumerate() {
                    match group.operator {
                        GroupOperator::And => {
                            let mut parts = Vec::with_capacity(group.leaves.len());
                            let mut pending = Vec::new();
                            for &id in &group.leaves {
                                let leaf = criteria.leaf(id);
                                let extracted = extract_value(asset, leaf)?;
                                if extracted.is_miss() {
                                    parts.clear();
                                    break;
                                }
                                pending.push((id, extracted.promote.clone()));
                                parts.push(KeyPart::new(id, leaf, extracted.value));
                            }
                            if parts.is_empty() {
                                continue;
                            }
                            for (id, promote) in pending {
                                collector.note_promote_value(asset, id, promote);
                            }
                            collector.add(GroupKey { tag: Some(format!("g{gi}")), style: KeyStyle::Pairs, parts }, idx);
                        }
                        GroupOperator::Or => {
                            for (ci, &id) in group.leaves.iter().enumerate() {
                                let leaf = criteria.leaf(id);
                                let extracted = extract_value(asset, leaf)?;
                                if extracted.is_miss() {
                                    continue;
                                }
                                collector.note_promote(asset, id, &extracted);
                                let key = GroupKey {
                                    tag: Some(format!("g{gi}c{ci}")),
                                    style: KeyStyle::Pairs,
                                    parts: vec![KeyPart::new(id, leaf, extracted.value)],
                                };
                                collector.add(key, idx);
                            }
                        }
                    }
                }
            }
        }
        Strategy::Expression(root) => {
            for (idx, asset) in assets.iter().enumerate() {
                let Some(captured) = match_and_capture(root, asset, &criteria.leaves)? else {
                    continue;
                };
                let key = GroupKey::from_captured(&captured, &criteria.leaves);
                if key.is_empty() {
                    log::trace!("[group:expression] asset={} matched without grouping values", asset.id);
                    continue;
                }
                for (&id, extracted) in &captured {
                    collector.note_promote(asset, id, extracted);
                }
                collector.add(key, idx);
            }
        }
    }

    let union = matches!(criteria.strategy, Strategy::GroupUnion(_));
    let grouping = collector.finish(union);
    log::debug!("[group] buckets={} union={}", grouping.buckets.len(), grouping.union);
    Ok(grouping)
}

#[derive(Default)]
struct Collector {
    buckets: BTreeMap<String, Bucket>,
    promotions: RegexPromotions,
}

impl Collector {
    fn add(&mut self, key: GroupKey, idx: usize) {
        let rendered = key.render();
        let bucket = self.buckets.entry(rendered).or_insert_with(|| Bucket { key, members: Vec::new() });
        if bucket.members.last() != Some(&idx) {
            bucket.members.push(idx);
        }
    }

    fn note_promote(&mut self, asset: &Asset, id: LeafId, extracted: &Extracted) {
        self.note_promote_value(asset, id, extracted.promote.clone());
    }

    fn note_promote_value(&mut self, asset: &Asset, id: LeafId, promote: Option<String>) {
        if let Some(value) = promote {
            self.promotions.entry(asset.id.clone()).or_default().insert(id, value);
        }
    }

    fn finish(self, union: bool) -> Grouping {
        Grouping { buckets: self.buckets.into_values().collect(), union, promotions: self.promotions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{CriteriaConfig, CriteriaGroup, Criterion, Expression, FieldKey};

    fn compile(config: CriteriaConfig) -> CompiledCriteria {
        CompiledCriteria::new(&config).unwrap()
    }

    fn keys(grouping: &Grouping) -> Vec<String> {
        grouping.buckets.iter().map(|b| b.key.render()).collect()
    }

    #[test]
    fn exact_key_skips_empty_values() {
        let criteria = compile(CriteriaConfig::Legacy(vec![
            Criterion::new(FieldKey::OriginalFileName).with_split(&["~", "."], 0),
            Criterion::new(FieldKey::DeviceId),
            Criterion::new(FieldKey::LocalDateTime),
        ]));
        let assets = vec![
            Asset::new("a", "IMG_1.jpg").taken_at("2023-06-01T10:00:00Z"),
            Asset::new("b", "IMG_1~2.heic").taken_at("2023-06-01T10:00:00Z"),
            Asset::new("c", "IMG_2.jpg"),
        ];
        let grouping = group(&assets, &criteria).unwrap();
        assert!(!grouping.union);
        assert_eq!(keys(&grouping), vec!["IMG_1|2023-06-01T10:00:00.000Z", "IMG_2"]);
        assert_eq!(grouping.buckets[0].members, vec![0, 1]);
        assert_eq!(grouping.buckets[1].members, vec![2]);
    }

    #[test]
    fn and_group_needs_every_value() {
        let criteria = compile(CriteriaConfig::Groups(vec![CriteriaGroup {
            operator: GroupOperator::And,
            criteria: vec![Criterion::new(FieldKey::OriginalFileName), Criterion::new(FieldKey::DeviceId)],
        }]));
        let mut with_device = Asset::new("a", "IMG_1.jpg");
        with_device.device_id = "pixel".to_string();
        let without_device = Asset::new("b", "IMG_1.jpg");

        let grouping = group(&[with_device, without_device], &criteria).unwrap();
        assert!(grouping.union);
        assert_eq!(keys(&grouping), vec!["g0|originalFileName=IMG_1|deviceId=pixel"]);
        assert_eq!(grouping.buckets[0].members, vec![0]);
    }

    #[test]
    fn and_groups_do_not_share_keys() {
        let criteria = compile(CriteriaConfig::Groups(vec![
            CriteriaGroup {
                operator: GroupOperator::And,
                criteria: vec![Criterion::new(FieldKey::OriginalFileName).with_split(&["_", "."], 1)],
            },
            CriteriaGroup {
                operator: GroupOperator::And,
                criteria: vec![Criterion::new(FieldKey::OriginalFileName).with_split(&["_", "."], 0)],
            },
        ]));
        let assets = vec![Asset::new("a", "X_IMG.jpg"), Asset::new("b", "IMG_Y.jpg")];

        let grouping = group(&assets, &criteria).unwrap();
        assert_eq!(
            keys(&grouping),
            vec![
                "g0|originalFileName=IMG",
                "g0|originalFileName=Y",
                "g1|originalFileName=IMG",
                "g1|originalFileName=X",
            ]
        );
        assert!(grouping.buckets.iter().all(|b| b.members.len() == 1));
    }

    #[test]
    fn or_group_emits_tagged_keys() {
        let criteria = compile(CriteriaConfig::Groups(vec![CriteriaGroup {
            operator: GroupOperator::Or,
            criteria: vec![Criterion::new(FieldKey::OriginalFileName), Criterion::new(FieldKey::Checksum)],
        }]));
        let mut asset = Asset::new("a", "IMG_1.jpg");
        asset.checksum = "sum".to_string();

        let grouping = group(&[asset], &criteria).unwrap();
        assert_eq!(keys(&grouping), vec!["g0c0|originalFileName=IMG_1", "g0c1|checksum=sum"]);
    }

    #[test]
    fn expression_keys_follow_first_matching_branch() {
        let criteria = compile(CriteriaConfig::Expression(Expression::and(vec![
            Expression::or(vec![
                Expression::leaf(Criterion::new(FieldKey::OriginalFileName).with_regex("^(PXL)_", 1)),
                Expression::leaf(Criterion::new(FieldKey::OriginalFileName).with_regex("^(IMG)_", 1)),
                Expression::leaf(Criterion::new(FieldKey::Checksum)),
            ]),
            Expression::not(Expression::leaf(Criterion::new(FieldKey::IsArchived))),
        ])));
        let mut img = Asset::new("a", "IMG_1.jpg");
        img.checksum = "sum".to_string();
        let mut archived = Asset::new("b", "PXL_1.jpg");
        archived.is_archived = true;

        let grouping = group(&[img, archived], &criteria).unwrap();
        assert_eq!(keys(&grouping), vec!["originalFileName=IMG"]);
    }

    #[test]
    fn repeated_field_keeps_first_capture() {
        let criteria = compile(CriteriaConfig::Expression(Expression::and(vec![
            Expression::leaf(Criterion::new(FieldKey::OriginalFileName).with_regex("^(IMG)_", 1)),
            Expression::leaf(Criterion::new(FieldKey::OriginalFileName).with_regex(r"_(\d+)", 1)),
        ])));
        let assets = vec![Asset::new("a", "IMG_0001.jpg"), Asset::new("b", "IMG_0002.jpg")];

        let grouping = group(&assets, &criteria).unwrap();
        assert_eq!(keys(&grouping), vec!["originalFileName=IMG"]);
        assert_eq!(grouping.buckets[0].members, vec![0, 1]);
    }

    #[test]
    fn expression_matching_only_through_not_is_excluded() {
        let criteria = compile(CriteriaConfig::Expression(Expression::not(Expression::leaf(Criterion::new(
            FieldKey::IsFavorite,
        )))));
        let grouping = group(&[Asset::new("a", "x.jpg"), Asset::new("b", "y.jpg")], &criteria).unwrap();
        assert!(grouping.buckets.is_empty());
    }

    #[test]
    fn time_components_can_be_stripped() {
        let criteria = compile(CriteriaConfig::Legacy(vec![
            Criterion::new(FieldKey::OriginalFileName),
            Criterion::new(FieldKey::LocalDateTime).with_delta(1000),
        ]));
        let assets = vec![Asset::new("a", "IMG_1.jpg").taken_at("2023-06-01T10:00:00.400Z")];
        let grouping = group(&assets, &criteria).unwrap();
        let key = &grouping.buckets[0].key;
        assert!(key.has_time());
        assert_eq!(key.render(), "IMG_1|2023-06-01T10:00:00.000Z");
        assert_eq!(key.render_without_time(), "IMG_1");
        assert_eq!(key.time_leaves().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn promotions_are_collected_per_asset() {
        let criteria = compile(CriteriaConfig::Legacy(vec![
            Criterion::new(FieldKey::OriginalFileName)
                .with_regex(r"^(\w+?)(?:_(EDIT|RAW))?\.\w+$", 1)
                .with_promote(2, &["EDIT", "RAW"]),
        ]));
        let assets = vec![Asset::new("a", "IMG_0001_RAW.dng"), Asset::new("b", "IMG_0001.jpg")];
        let grouping = group(&assets, &criteria).unwrap();
        assert_eq!(grouping.buckets[0].members, vec![0, 1]);
        assert_eq!(grouping.promotions.get("a").and_then(|m| m.get(&0)).map(String::as_str), Some("RAW"));
        assert!(!grouping.promotions.contains_key("b"));
    }
}
