//! Promotion lists.
//!
//! A promotion list is a comma-separated, ordered list of tokens; earlier tokens
//! win. Filename lists understand a few special tokens:
//!
//! ```text
//! "edit,raw"          substring match, case-insensitive
//! ""  (empty token)   names matching none of the literal tokens
//! "biggestNumber"     names with a numeric suffix; larger numbers first
//! "sequence"          names with a digit run; ranked by the number
//! "sequence:4"        ... a run of exactly four digits
//! "sequence:IMG_"     ... the digits right after "IMG_"
//! ```
//!
//! When every token is a literal following one `prefix<digits>suffix` template
//! with strictly increasing numbers (`"cover_1,cover_2,cover_3"`) and the
//! stack's first filename fits the template, the list switches to template
//! mode: names are ranked by the number in the template, so `cover_10` sorts
//! after `cover_3` even though it is not listed.

use super::extract::strip_extension;
use regex::Regex;

bitflags::bitflags! {
    /// Special tokens present in a list.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PromoteTokens: u8 {
        const EMPTY          = 1 << 0;
        const BIGGEST_NUMBER = 1 << 1;
        const SEQUENCE       = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Literal(String),
    Empty,
    BiggestNumber,
    Sequence(SequenceRule),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SequenceRule {
    AnyDigits,
    Width(usize),
    Prefix(String),
}

impl SequenceRule {
    fn parse(arg: &str) -> Self {
        if arg.is_empty() {
            return SequenceRule::AnyDigits;
        }
        match arg.parse::<usize>() {
            Ok(width) if width > 0 => SequenceRule::Width(width),
            _ => SequenceRule::Prefix(arg.to_lowercase()),
        }
    }

    /// The sequence number in a lowercased, extension-less name.
    fn number(&self, stem: &str) -> Option<u64> {
        let digits = match self {
            SequenceRule::AnyDigits => regex!(r"\d+").find_iter(stem).last()?.as_str(),
            SequenceRule::Width(width) => {
                regex!(r"\d+").find_iter(stem).filter(|m| m.as_str().len() == *width).last()?.as_str()
            }
            SequenceRule::Prefix(prefix) => {
                let start = stem.rfind(prefix.as_str())? + prefix.len();
                let rest = &stem[start..];
                let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
                &rest[..end]
            }
        };
        parse_number(digits)
    }
}

/// Position in a filename list; lower is better. `sequence` breaks ties
/// between names matched by the same token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FilenameRank {
    pub position: usize,
    pub sequence: u64,
}

/// How a filename list is matched for one stack.
#[derive(Debug, Clone)]
pub(crate) enum MatchMode {
    Contains,
    Template(Regex),
}

/// A parsed promotion list.
///
/// ```
/// use assetstack::PromoteList;
///
/// let list = PromoteList::parse(" Edit, RAW ,");
/// assert_eq!(list.tokens(), ["edit", "raw", ""]);
/// assert!(PromoteList::parse("").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromoteList {
    raw: Vec<String>,
    tokens: Vec<Token>,
    kinds: PromoteTokens,
}

impl PromoteList {
    /// Parse a CSV list. Tokens are trimmed and lowercased; a blank string is
    /// the empty list.
    pub fn parse(csv: &str) -> Self {
        if csv.trim().is_empty() {
            return PromoteList::default();
        }

        let mut list = PromoteList::default();
        for piece in csv.split(',') {
            let raw = piece.trim().to_lowercase();
            let token = if raw.is_empty() {
                list.kinds |= PromoteTokens::EMPTY;
                Token::Empty
            } else if raw == "biggestnumber" {
                list.kinds |= PromoteTokens::BIGGEST_NUMBER;
                Token::BiggestNumber
            } else if raw == "sequence" {
                list.kinds |= PromoteTokens::SEQUENCE;
                Token::Sequence(SequenceRule::AnyDigits)
            } else if let Some(arg) = raw.strip_prefix("sequence:") {
                list.kinds |= PromoteTokens::SEQUENCE;
                Token::Sequence(SequenceRule::parse(arg))
            } else {
                Token::Literal(raw.clone())
            };
            list.raw.push(raw);
            list.tokens.push(token);
        }
        list
    }

    pub fn tokens(&self) -> &[String] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn special_tokens(&self) -> PromoteTokens {
        self.kinds
    }

    pub(crate) fn token(&self, position: usize) -> Option<&Token> {
        self.tokens.get(position)
    }

    /// Pick the match mode for a stack whose first filename is `sample`.
    pub(crate) fn detect_mode(&self, sample: &str) -> MatchMode {
        match self.template() {
            Some(pattern) if pattern.is_match(&sample.to_lowercase()) => MatchMode::Template(pattern),
            _ => MatchMode::Contains,
        }
    }

    /// `prefix(\d+)suffix` when all tokens are literals of one template with
    /// strictly increasing numbers.
    fn template(&self) -> Option<Regex> {
        if self.tokens.len() < 2 || !self.kinds.is_empty() {
            return None;
        }
        let shape = regex!(r"^(\D*)(\d+)(\D*)$");
        let mut template: Option<(&str, &str)> = None;
        let mut last: Option<u64> = None;
        for raw in &self.raw {
            let caps = shape.captures(raw)?;
            let (prefix, suffix) = (caps.get(1)?.as_str(), caps.get(3)?.as_str());
            let number = parse_number(caps.get(2)?.as_str())?;
            match template {
                Some(t) if t != (prefix, suffix) => return None,
                _ => template = Some((prefix, suffix)),
            }
            if last.is_some_and(|prev| number <= prev) {
                return None;
            }
            last = Some(number);
        }
        let (prefix, suffix) = template?;
        if prefix.is_empty() && suffix.is_empty() {
            return None;
        }
        Regex::new(&format!(r"{}(\d+){}", regex::escape(prefix), regex::escape(suffix))).ok()
    }

    /// Rank a bare filename against this list.
    pub(crate) fn rank(&self, name: &str, mode: &MatchMode, delimiters: &[String]) -> FilenameRank {
        let miss = FilenameRank { position: self.tokens.len(), sequence: 0 };
        let lower = name.to_lowercase();

        if let MatchMode::Template(pattern) = mode {
            return match pattern.captures_iter(&lower).last().and_then(|c| parse_number(c.get(1)?.as_str())) {
                Some(sequence) => FilenameRank { position: 0, sequence },
                None => miss,
            };
        }

        let stem = strip_extension(&lower);
        for (position, token) in self.tokens.iter().enumerate() {
            let hit = match token {
                Token::Literal(literal) => lower.contains(literal.as_str()).then_some(0),
                Token::Empty => (!self.any_literal_in(&lower)).then_some(0),
                Token::BiggestNumber => numeric_suffix(name, delimiters).map(|_| 0),
                Token::Sequence(rule) => rule.number(stem),
            };
            if let Some(sequence) = hit {
                return FilenameRank { position, sequence };
            }
        }
        miss
    }

    /// Position of a lowercased extension (no dot); tokens may carry a leading
    /// dot.
    pub(crate) fn extension_rank(&self, extension: &str) -> usize {
        self.raw
            .iter()
            .position(|token| token.strip_prefix('.').unwrap_or(token) == extension)
            .unwrap_or(self.raw.len())
    }

    fn any_literal_in(&self, lower: &str) -> bool {
        self.tokens.iter().any(|t| matches!(t, Token::Literal(literal) if lower.contains(literal.as_str())))
    }
}

/// The number after the last configured delimiter of the extension-less name
/// (`IMG_0001~3.jpg` with `~` -> 3).
pub(crate) fn numeric_suffix(name: &str, delimiters: &[String]) -> Option<u64> {
    let stem = strip_extension(name);
    let cut = delimiters
        .iter()
        .filter(|d| !d.is_empty())
        .filter_map(|d| stem.rfind(d.as_str()).map(|pos| pos + d.len()))
        .max()?;
    let tail = &stem[cut..];
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    parse_number(tail)
}

/// Overlong digit runs saturate.
fn parse_number(digits: &str) -> Option<u64> {
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}
