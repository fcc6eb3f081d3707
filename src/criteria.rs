//! Criteria model.
//!
//! A criteria configuration describes *how* two assets are recognized as
//! variants of the same capture. It comes in three shapes:
//!
//! ```text
//! [ {criterion}, ... ]                              -> CriteriaConfig::Legacy
//! { "mode": "advanced", "groups": [ {group}, ... ] } -> CriteriaConfig::Groups
//! { "mode": "advanced", "expression": {node} }       -> CriteriaConfig::Expression
//! ```
//!
//! Everything here is plain data. Patterns are compiled later, once per run, by
//! `engine::compiled`.
//!
//! ## Invariants
//!
//! - `FieldKey` is closed: an unknown `key` fails at parse time.
//! - `Expression::And`/`Expression::Or` hold at least one child and `NOT` nodes
//!   hold exactly one. Parsing enforces this and `Expression::validate` re-checks
//!   trees built in code.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default criteria used when no configuration is supplied: the filename up to
/// the first `~` or `.`, then the capture timestamp.
pub const DEFAULT_CRITERIA: &str =
    r#"[{"key":"originalFileName","split":{"delimiters":["~","."],"index":0}},{"key":"localDateTime"}]"#;

// --- Field identifiers --------------------------------------------------------

/// Asset fields a criterion can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldKey {
    Id,
    OriginalFileName,
    OriginalPath,
    LocalDateTime,
    FileCreatedAt,
    FileModifiedAt,
    UpdatedAt,
    IsArchived,
    IsFavorite,
    IsOffline,
    IsTrashed,
    Type,
    OwnerId,
    DeviceId,
    DeviceAssetId,
    LibraryId,
    OriginalMimeType,
    Checksum,
    Duration,
}

impl FieldKey {
    pub const ALL: [FieldKey; 19] = [
        FieldKey::Id,
        FieldKey::OriginalFileName,
        FieldKey::OriginalPath,
        FieldKey::LocalDateTime,
        FieldKey::FileCreatedAt,
        FieldKey::FileModifiedAt,
        FieldKey::UpdatedAt,
        FieldKey::IsArchived,
        FieldKey::IsFavorite,
        FieldKey::IsOffline,
        FieldKey::IsTrashed,
        FieldKey::Type,
        FieldKey::OwnerId,
        FieldKey::DeviceId,
        FieldKey::DeviceAssetId,
        FieldKey::LibraryId,
        FieldKey::OriginalMimeType,
        FieldKey::Checksum,
        FieldKey::Duration,
    ];

    /// The JSON name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Id => "id",
            FieldKey::OriginalFileName => "originalFileName",
            FieldKey::OriginalPath => "originalPath",
            FieldKey::LocalDateTime => "localDateTime",
            FieldKey::FileCreatedAt => "fileCreatedAt",
            FieldKey::FileModifiedAt => "fileModifiedAt",
            FieldKey::UpdatedAt => "updatedAt",
            FieldKey::IsArchived => "isArchived",
            FieldKey::IsFavorite => "isFavorite",
            FieldKey::IsOffline => "isOffline",
            FieldKey::IsTrashed => "isTrashed",
            FieldKey::Type => "type",
            FieldKey::OwnerId => "ownerId",
            FieldKey::DeviceId => "deviceId",
            FieldKey::DeviceAssetId => "deviceAssetId",
            FieldKey::LibraryId => "libraryId",
            FieldKey::OriginalMimeType => "originalMimeType",
            FieldKey::Checksum => "checksum",
            FieldKey::Duration => "duration",
        }
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, FieldKey::IsArchived | FieldKey::IsFavorite | FieldKey::IsOffline | FieldKey::IsTrashed)
    }

    pub fn is_timestamp(self) -> bool {
        matches!(self, FieldKey::LocalDateTime | FieldKey::FileCreatedAt | FieldKey::FileModifiedAt | FieldKey::UpdatedAt)
    }

    /// Filename and path fields get split/regex transforms during extraction;
    /// every other field uses an attached regex as a match filter only.
    pub fn is_transformable(self) -> bool {
        matches!(self, FieldKey::OriginalFileName | FieldKey::OriginalPath)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FieldKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::config(format!("unknown criterion key '{s}'")))
    }
}

impl TryFrom<String> for FieldKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FieldKey> for String {
    fn from(key: FieldKey) -> Self {
        key.as_str().to_string()
    }
}

// --- Criterion ------------------------------------------------------------------

/// Cumulative split: the value is split by every delimiter in turn and the part
/// at `index` is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub delimiters: Vec<String>,
    #[serde(default)]
    pub index: usize,
}

/// Regex transform. On filename/path fields the capture at `index` becomes the
/// value; on other fields the pattern is only a match filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexSpec {
    #[serde(rename = "key")]
    pub pattern: String,
    #[serde(default)]
    pub index: usize,
    /// Capture holding a secondary value used to order assets inside a stack.
    #[serde(rename = "promoteIndex", default, skip_serializing_if = "Option::is_none")]
    pub promote_index: Option<usize>,
    /// Preferred promote values, best first.
    #[serde(rename = "promoteKeys", default, skip_serializing_if = "Vec::is_empty")]
    pub promote_keys: Vec<String>,
}

/// Time bucketing tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub milliseconds: i64,
}

/// One field-extraction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub key: FieldKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<Split>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<RegexSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Delta>,
}

impl Criterion {
    pub fn new(key: FieldKey) -> Self {
        Criterion { key, split: None, regex: None, delta: None }
    }

    pub fn with_split(mut self, delimiters: &[&str], index: usize) -> Self {
        self.split = Some(Split { delimiters: delimiters.iter().map(|d| d.to_string()).collect(), index });
        self
    }

    pub fn with_regex(mut self, pattern: &str, index: usize) -> Self {
        self.regex = Some(RegexSpec { pattern: pattern.to_string(), index, promote_index: None, promote_keys: Vec::new() });
        self
    }

    /// Attach a promote capture to an existing regex (no-op without one).
    pub fn with_promote(mut self, promote_index: usize, promote_keys: &[&str]) -> Self {
        if let Some(regex) = self.regex.as_mut() {
            regex.promote_index = Some(promote_index);
            regex.promote_keys = promote_keys.iter().map(|k| k.to_string()).collect();
        }
        self
    }

    pub fn with_delta(mut self, milliseconds: i64) -> Self {
        self.delta = Some(Delta { milliseconds });
        self
    }

    /// Effective bucketing delta: only positive deltas on timestamp fields count.
    pub fn delta_ms(&self) -> Option<i64> {
        match self.delta {
            Some(Delta { milliseconds }) if milliseconds > 0 && self.key.is_timestamp() => Some(milliseconds),
            _ => None,
        }
    }

    /// Whether this criterion yields a secondary promote value.
    pub fn promotes(&self) -> bool {
        self.regex.as_ref().map(|r| r.promote_index.is_some()).unwrap_or(false)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(split) = &self.split {
            if split.delimiters.iter().any(|d| d.is_empty()) {
                return Err(Error::config(format!("criterion '{}' has an empty split delimiter", self.key)));
            }
        }
        if let Some(delta) = self.delta {
            if delta.milliseconds < 0 {
                return Err(Error::config(format!(
                    "criterion '{}' has a negative delta ({} ms)",
                    self.key, delta.milliseconds
                )));
            }
        }
        Ok(())
    }
}

// --- Groups ---------------------------------------------------------------------

/// Group operator; read case-insensitively, written upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GroupOperator {
    And,
    Or,
}

impl GroupOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupOperator::And => "AND",
            GroupOperator::Or => "OR",
        }
    }
}

impl FromStr for GroupOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(GroupOperator::And),
            "OR" => Ok(GroupOperator::Or),
            _ => Err(Error::config(format!("unknown group operator '{s}'"))),
        }
    }
}

impl TryFrom<String> for GroupOperator {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<GroupOperator> for String {
    fn from(operator: GroupOperator) -> Self {
        operator.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaGroup {
    pub operator: GroupOperator,
    pub criteria: Vec<Criterion>,
}

// --- Expressions ----------------------------------------------------------------

/// Boolean criteria tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawExpression")]
pub enum Expression {
    Leaf(Criterion),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
}

/// JSON form of an expression node: either `{"criteria": {...}}` or
/// `{"operator": "AND" | "OR" | "NOT", "children": [...]}`.
#[derive(Debug, Deserialize)]
struct RawExpression {
    #[serde(default)]
    operator: Option<String>,
    #[serde(default)]
    criteria: Option<Criterion>,
    #[serde(default)]
    children: Vec<RawExpression>,
}

impl TryFrom<RawExpression> for Expression {
    type Error = Error;

    fn try_from(raw: RawExpression) -> Result<Self> {
        let Some(operator) = raw.operator else {
            return match raw.criteria {
                Some(criterion) => {
                    criterion.validate()?;
                    Ok(Expression::Leaf(criterion))
                }
                None => Err(Error::config("expression node has neither an operator nor criteria")),
            };
        };

        if raw.criteria.is_some() {
            return Err(Error::config(format!("'{operator}' node must not carry criteria")));
        }

        let children = raw.children.into_iter().map(Expression::try_from).collect::<Result<Vec<_>>>()?;

        match operator.to_ascii_uppercase().as_str() {
            "AND" if !children.is_empty() => Ok(Expression::And(children)),
            "OR" if !children.is_empty() => Ok(Expression::Or(children)),
            "AND" | "OR" => Err(Error::config(format!("'{operator}' node needs at least one child"))),
            "NOT" => {
                let count = children.len();
                let mut children = children.into_iter();
                match (children.next(), count) {
                    (Some(child), 1) => Ok(Expression::Not(Box::new(child))),
                    _ => Err(Error::config(format!("'NOT' node needs exactly one child, found {count}"))),
                }
            }
            _ => Err(Error::config(format!("unknown expression operator '{operator}'"))),
        }
    }
}

impl Expression {
    pub fn leaf(criterion: Criterion) -> Self {
        Expression::Leaf(criterion)
    }

    pub fn and(children: Vec<Expression>) -> Self {
        Expression::And(children)
    }

    pub fn or(children: Vec<Expression>) -> Self {
        Expression::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Expression) -> Self {
        Expression::Not(Box::new(child))
    }

    /// Leaf criteria in left-to-right order.
    pub fn leaves(&self) -> Vec<&Criterion> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Criterion>) {
        match self {
            Expression::Leaf(c) => out.push(c),
            Expression::And(children) | Expression::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            Expression::Not(child) => child.collect_leaves(out),
        }
    }

    /// Re-check structural invariants for trees built in code.
    pub fn validate(&self) -> Result<()> {
        match self {
            Expression::Leaf(c) => c.validate(),
            Expression::And(children) | Expression::Or(children) => {
                if children.is_empty() {
                    let op = if matches!(self, Expression::And(_)) { "AND" } else { "OR" };
                    return Err(Error::config(format!("'{op}' node needs at least one child")));
                }
                children.iter().try_for_each(Expression::validate)
            }
            Expression::Not(child) => child.validate(),
        }
    }
}

// --- Whole configuration ----------------------------------------------------------

/// A parsed criteria configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaConfig {
    /// Ordered criteria whose values form one exact key.
    Legacy(Vec<Criterion>),
    /// AND/OR groups whose keys are unioned through shared-key connectivity.
    Groups(Vec<CriteriaGroup>),
    /// A boolean tree; matching leaves form the key.
    Expression(Expression),
}

#[derive(Debug, Deserialize)]
struct AdvancedConfig {
    mode: String,
    #[serde(default)]
    groups: Option<Vec<CriteriaGroup>>,
    #[serde(default)]
    expression: Option<Expression>,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        CriteriaConfig::Legacy(vec![
            Criterion::new(FieldKey::OriginalFileName).with_split(&["~", "."], 0),
            Criterion::new(FieldKey::LocalDateTime),
        ])
    }
}

impl FromStr for CriteriaConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CriteriaConfig::parse(s)
    }
}

impl CriteriaConfig {
    /// Parse a configuration string. Blank input yields the default criteria.
    ///
    /// The advanced form (an object with `mode`) is tried first; anything else
    /// must be a bare list of criteria.
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(CriteriaConfig::default());
        }

        let value: serde_json::Value = serde_json::from_str(json)?;
        let config = match &value {
            serde_json::Value::Object(map) if map.contains_key("mode") => {
                let advanced: AdvancedConfig = serde_json::from_value(value)?;
                Self::from_advanced(advanced)?
            }
            serde_json::Value::Array(_) => {
                let criteria: Vec<Criterion> = serde_json::from_value(value)?;
                CriteriaConfig::Legacy(criteria)
            }
            _ => {
                return Err(Error::config("expected a list of criteria or an object with a 'mode' field"));
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn from_advanced(advanced: AdvancedConfig) -> Result<Self> {
        if advanced.mode != "advanced" {
            return Err(Error::config(format!("unsupported criteria mode '{}'", advanced.mode)));
        }
        match (advanced.expression, advanced.groups) {
            (Some(expression), _) => Ok(CriteriaConfig::Expression(expression)),
            (None, Some(groups)) => Ok(CriteriaConfig::Groups(groups)),
            (None, None) => Err(Error::config("advanced mode needs an 'expression' or 'groups'")),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            CriteriaConfig::Legacy(criteria) => {
                if criteria.is_empty() {
                    return Err(Error::config("criteria list is empty"));
                }
                criteria.iter().try_for_each(Criterion::validate)
            }
            CriteriaConfig::Groups(groups) => {
                if groups.is_empty() {
                    return Err(Error::config("advanced mode has an empty 'groups' list"));
                }
                for (idx, group) in groups.iter().enumerate() {
                    if group.criteria.is_empty() {
                        return Err(Error::config(format!("group {idx} has no criteria")));
                    }
                    group.criteria.iter().try_for_each(Criterion::validate)?;
                }
                Ok(())
            }
            CriteriaConfig::Expression(expression) => expression.validate(),
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            CriteriaConfig::Legacy(_) => "legacy",
            CriteriaConfig::Groups(_) => "groups",
            CriteriaConfig::Expression(_) => "expression",
        }
    }

    /// Every criterion of the configuration, in declaration order.
    pub fn leaves(&self) -> Vec<&Criterion> {
        match self {
            CriteriaConfig::Legacy(criteria) => criteria.iter().collect(),
            CriteriaConfig::Groups(groups) => groups.iter().flat_map(|g| g.criteria.iter()).collect(),
            CriteriaConfig::Expression(expression) => expression.leaves(),
        }
    }

    /// Largest effective time delta across all criteria.
    pub fn max_delta_ms(&self) -> Option<i64> {
        self.leaves().iter().filter_map(|c| c.delta_ms()).max()
    }

    /// Split delimiters of every filename criterion, deduplicated, in order.
    pub fn filename_delimiters(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for criterion in self.leaves() {
            if criterion.key != FieldKey::OriginalFileName {
                continue;
            }
            if let Some(split) = &criterion.split {
                for delimiter in &split.delimiters {
                    if !out.contains(delimiter) {
                        out.push(delimiter.clone());
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_config_is_default() {
        let config = CriteriaConfig::parse("  ").unwrap();
        assert_eq!(config, CriteriaConfig::default());
        assert_eq!(CriteriaConfig::parse(DEFAULT_CRITERIA).unwrap(), CriteriaConfig::default());
    }

    #[test]
    fn parses_legacy_list() {
        let json = r#"[
            {"key": "originalFileName", "regex": {"key": "^(PXL)_(\\d+)", "index": 1, "promoteIndex": 2, "promoteKeys": ["1", "2"]}},
            {"key": "localDateTime", "delta": {"milliseconds": 1000}}
        ]"#;
        let config = CriteriaConfig::parse(json).unwrap();
        let CriteriaConfig::Legacy(criteria) = &config else { panic!("expected legacy config") };
        assert_eq!(criteria.len(), 2);
        let regex = criteria[0].regex.as_ref().unwrap();
        assert_eq!(regex.index, 1);
        assert_eq!(regex.promote_index, Some(2));
        assert_eq!(regex.promote_keys, vec!["1", "2"]);
        assert_eq!(criteria[1].delta_ms(), Some(1000));
        assert_eq!(config.max_delta_ms(), Some(1000));
    }

    #[test]
    fn parses_groups() {
        let json = r#"{"mode": "advanced", "groups": [
            {"operator": "OR", "criteria": [
                {"key": "originalPath", "split": {"delimiters": ["/"], "index": 2}},
                {"key": "localDateTime", "delta": {"milliseconds": 1000}}
            ]},
            {"operator": "and", "criteria": [{"key": "type"}]}
        ]}"#;
        let config = CriteriaConfig::parse(json).unwrap();
        let CriteriaConfig::Groups(groups) = &config else { panic!("expected groups") };
        assert_eq!(groups[0].operator, GroupOperator::Or);
        assert_eq!(groups[1].operator, GroupOperator::And);
        assert_eq!(config.leaves().len(), 3);
    }

    #[test]
    fn parses_expression_tree() {
        let json = r#"{"mode": "advanced", "expression": {"operator": "AND", "children": [
            {"operator": "OR", "children": [
                {"criteria": {"key": "originalFileName", "regex": {"key": "^PXL_", "index": 0}}},
                {"criteria": {"key": "originalFileName", "regex": {"key": "^IMG_", "index": 0}}}
            ]},
            {"operator": "NOT", "children": [{"criteria": {"key": "isArchived"}}]},
            {"criteria": {"key": "localDateTime", "delta": {"milliseconds": 2000}}}
        ]}}"#;
        let config = CriteriaConfig::parse(json).unwrap();
        let CriteriaConfig::Expression(expr) = &config else { panic!("expected expression") };
        let keys: Vec<FieldKey> = expr.leaves().iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            vec![FieldKey::OriginalFileName, FieldKey::OriginalFileName, FieldKey::IsArchived, FieldKey::LocalDateTime]
        );
    }

    #[test]
    fn operators_ignore_case() {
        // Array of (operator, expected)
        let cases = [
            ("AND", GroupOperator::And),
            ("and", GroupOperator::And),
            ("And", GroupOperator::And),
            ("OR", GroupOperator::Or),
            ("oR", GroupOperator::Or),
        ];
        for (operator, expected) in cases {
            let json = format!(r#"{{"mode": "advanced", "groups": [{{"operator": "{operator}", "criteria": [{{"key": "type"}}]}}]}}"#);
            let CriteriaConfig::Groups(groups) = CriteriaConfig::parse(&json).unwrap() else { panic!("expected groups") };
            assert_eq!(groups[0].operator, expected, "operator {operator}");

            let json = format!(
                r#"{{"mode": "advanced", "expression": {{"operator": "{operator}", "children": [{{"criteria": {{"key": "type"}}}}]}}}}"#
            );
            let CriteriaConfig::Expression(expr) = CriteriaConfig::parse(&json).unwrap() else { panic!("expected expression") };
            let parsed = match expr {
                Expression::And(_) => GroupOperator::And,
                Expression::Or(_) => GroupOperator::Or,
                other => panic!("unexpected node {other:?}"),
            };
            assert_eq!(parsed, expected, "expression operator {operator}");
        }

        let err = CriteriaConfig::parse(r#"{"mode": "advanced", "groups": [{"operator": "XOR", "criteria": [{"key": "type"}]}]}"#)
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("unknown group operator"), "{err}");
        assert_eq!(serde_json::to_string(&GroupOperator::Or).unwrap(), r#""OR""#);
    }

    #[test]
    fn expression_wins_over_groups() {
        let json = r#"{"mode": "advanced",
            "groups": [{"operator": "AND", "criteria": [{"key": "type"}]}],
            "expression": {"criteria": {"key": "checksum"}}}"#;
        let config = CriteriaConfig::parse(json).unwrap();
        assert_eq!(config.mode_name(), "expression");
    }

    #[test]
    fn rejects_malformed_configs() {
        let cases: Vec<(&str, &str)> = vec![
            (r#"[{"key": "nope"}]"#, "unknown criterion key"),
            ("[]", "empty"),
            (r#"{"mode": "advanced"}"#, "needs an 'expression' or 'groups'"),
            (r#"{"mode": "advanced", "expression": null}"#, "needs an 'expression' or 'groups'"),
            (r#"{"mode": "advanced", "groups": []}"#, "empty 'groups'"),
            (r#"{"mode": "simple", "groups": []}"#, "unsupported criteria mode"),
            (r#"{"mode": "advanced", "expression": {"operator": "AND", "children": []}}"#, "at least one child"),
            (r#"{"mode": "advanced", "expression": {"operator": "XOR", "children": [{"criteria": {"key": "id"}}]}}"#, "unknown expression operator"),
            (
                r#"{"mode": "advanced", "expression": {"operator": "NOT", "children": [{"criteria": {"key": "id"}}, {"criteria": {"key": "type"}}]}}"#,
                "exactly one child",
            ),
            (r#"{"mode": "advanced", "expression": {}}"#, "neither an operator nor criteria"),
            (r#"[{"key": "localDateTime", "delta": {"milliseconds": -5}}]"#, "negative delta"),
            (r#"[{"key": "originalFileName", "split": {"delimiters": [""], "index": 0}}]"#, "empty split delimiter"),
            (r#""just a string""#, "expected a list of criteria"),
            ("{not json", "Invalid criteria JSON"),
        ];

        for (json, needle) in cases {
            let err = CriteriaConfig::parse(json).unwrap_err();
            assert!(err.is_configuration(), "expected configuration error for {json}, got {err:?}");
            assert!(err.to_string().contains(needle), "error for {json} should mention '{needle}', got '{err}'");
        }
    }

    #[test]
    fn validate_catches_programmatic_trees() {
        assert!(Expression::and(vec![]).validate().is_err());
        assert!(Expression::or(vec![]).validate().is_err());
        assert!(Expression::not(Expression::and(vec![])).validate().is_err());
        assert!(Expression::not(Expression::leaf(Criterion::new(FieldKey::IsFavorite))).validate().is_ok());
    }

    #[test]
    fn delta_only_applies_to_timestamps() {
        assert_eq!(Criterion::new(FieldKey::LocalDateTime).with_delta(0).delta_ms(), None);
        assert_eq!(Criterion::new(FieldKey::Type).with_delta(500).delta_ms(), None);
        assert_eq!(Criterion::new(FieldKey::FileCreatedAt).with_delta(500).delta_ms(), Some(500));
    }

    #[test]
    fn collects_filename_delimiters() {
        let config = CriteriaConfig::Legacy(vec![
            Criterion::new(FieldKey::OriginalFileName).with_split(&["~", "."], 0),
            Criterion::new(FieldKey::OriginalPath).with_split(&["/"], 1),
            Criterion::new(FieldKey::OriginalFileName).with_split(&["_", "~"], 0),
        ]);
        assert_eq!(config.filename_delimiters(), vec!["~", ".", "_"]);
    }
}
