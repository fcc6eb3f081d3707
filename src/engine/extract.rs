//! Field extraction.
//!
//! Turns `(asset, criterion)` into the string that takes part in grouping keys:
//!
//! ```text
//! flag fields       -> "true" | "false"
//! timestamp fields  -> parse, floor to delta, re-render as UTC millis
//! originalFileName  -> strip extension, then regex (on the full name) or split
//! originalPath      -> '\' -> '/', then regex or split
//! everything else   -> raw value
//! ```
//!
//! An empty result is a *soft miss*: the asset simply does not contribute on
//! that criterion. A capture or split index that does not exist is a hard
//! `Error::ExtractionRange` and aborts the run.

use super::compiled::CompiledCriterion;
use crate::criteria::Criterion;
use crate::error::{Error, Result};
use crate::{Asset, FieldKey, FieldValue};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Captures;

/// Extracted value plus the optional secondary promote capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Extracted {
    pub value: String,
    pub promote: Option<String>,
}

impl Extracted {
    fn of(value: String) -> Self {
        Extracted { value, promote: None }
    }

    fn miss() -> Self {
        Extracted::default()
    }

    pub fn is_miss(&self) -> bool {
        self.value.is_empty()
    }
}

/// Extract the value of `criterion` from `asset`.
///
/// Returns `(value, promote_value)`; an empty `value` means the asset does not
/// provide this criterion. The regex (if any) is compiled on every call, so
/// prefer [`stack_with`](crate::stack_with) or [`Stacker`](crate::Stacker) for
/// bulk work.
pub fn extract(asset: &Asset, criterion: &Criterion) -> Result<(String, Option<String>)> {
    let compiled = CompiledCriterion::compile(criterion)?;
    let extracted = extract_value(asset, &compiled)?;
    Ok((extracted.value, extracted.promote))
}

pub(crate) fn extract_value(asset: &Asset, leaf: &CompiledCriterion) -> Result<Extracted> {
    let criterion = &leaf.criterion;
    let raw = match asset.field(criterion.key) {
        FieldValue::Flag(flag) => return Ok(Extracted::of(flag.to_string())),
        FieldValue::Text(raw) => raw,
    };

    if raw.is_empty() {
        log::trace!("[extract:miss] asset={} key={} reason=empty", asset.id, criterion.key);
        return Ok(Extracted::miss());
    }

    match criterion.key {
        key if key.is_timestamp() => match render_timestamp(raw, criterion.delta_ms()) {
            Some(value) => Ok(Extracted::of(value)),
            None => {
                log::trace!("[extract:miss] asset={} key={} reason=unparseable \"{}\"", asset.id, key, raw);
                Ok(Extracted::miss())
            }
        },
        FieldKey::OriginalFileName => transform(asset, leaf, raw, strip_extension(raw)),
        FieldKey::OriginalPath => {
            let normalized = raw.replace('\\', "/");
            transform(asset, leaf, &normalized, &normalized)
        }
        _ => Ok(Extracted::of(raw.to_string())),
    }
}

/// Regex (against `regex_input`) or cumulative split (of `split_input`).
fn transform(asset: &Asset, leaf: &CompiledCriterion, regex_input: &str, split_input: &str) -> Result<Extracted> {
    if let (Some(re), Some(spec)) = (&leaf.regex, &leaf.criterion.regex) {
        let Some(caps) = re.captures(regex_input) else {
            log::trace!("[extract:miss] asset={} key={} reason=no-match", asset.id, leaf.name());
            return Ok(Extracted::miss());
        };
        let value = capture(asset, leaf, &caps, spec.index)?.unwrap_or_default();
        let promote = match spec.promote_index {
            Some(index) => capture(asset, leaf, &caps, index)?.filter(|p| !p.is_empty()),
            None => None,
        };
        return Ok(Extracted { value, promote });
    }

    if let Some(split) = &leaf.criterion.split {
        let parts = split_cumulative(split_input, &split.delimiters);
        return match parts.get(split.index) {
            Some(part) => Ok(Extracted::of(part.to_string())),
            None => Err(Error::ExtractionRange {
                asset_id: asset.id.clone(),
                key: leaf.name().to_string(),
                reason: format!("split index {} out of range for \"{}\" ({} parts)", split.index, split_input, parts.len()),
            }),
        };
    }

    Ok(Extracted::of(split_input.to_string()))
}

/// Capture group `index`; `None` when the group exists but did not participate.
fn capture(asset: &Asset, leaf: &CompiledCriterion, caps: &Captures<'_>, index: usize) -> Result<Option<String>> {
    if index >= caps.len() {
        return Err(Error::ExtractionRange {
            asset_id: asset.id.clone(),
            key: leaf.name().to_string(),
            reason: format!("capture index {} out of range (pattern has {} groups)", index, caps.len()),
        });
    }
    Ok(caps.get(index).map(|m| m.as_str().to_string()))
}

/// Split by every delimiter in turn: `a~b.c` by `["~", "."]` -> `[a, b, c]`.
pub(crate) fn split_cumulative<'a>(input: &'a str, delimiters: &[String]) -> Vec<&'a str> {
    let mut parts = vec![input];
    for delimiter in delimiters {
        parts = parts.into_iter().flat_map(|p| p.split(delimiter.as_str())).collect();
    }
    parts
}

/// Drop the final `.ext` of a filename; dotfiles and names without a dot are
/// returned unchanged.
pub(crate) fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 && !name[pos..].contains(['/', '\\']) => &name[..pos],
        _ => name,
    }
}

/// Lowercased extension without the dot (`""` when there is none).
pub(crate) fn extension_of(name: &str) -> String {
    let stem = strip_extension(name);
    if stem.len() == name.len() { String::new() } else { name[stem.len() + 1..].to_ascii_lowercase() }
}

/// Parse an inventory timestamp (RFC 3339, fractional seconds, offset). Values
/// without an offset are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|naive| naive.and_utc())
}

/// Re-render a timestamp in UTC with millisecond precision, floored to a
/// multiple of `delta_ms` when given.
pub(crate) fn render_timestamp(raw: &str, delta_ms: Option<i64>) -> Option<String> {
    let ts = parse_timestamp(raw)?;
    let ts = match delta_ms {
        Some(delta) if delta > 0 => {
            let millis = ts.timestamp_millis();
            Utc.timestamp_millis_opt(millis - millis.rem_euclid(delta)).single()?
        }
        _ => ts,
    };
    Some(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(asset: &Asset, criterion: Criterion) -> Result<(String, Option<String>)> {
        extract(asset, &criterion)
    }

    #[test]
    fn flags_render_as_strings() {
        let mut asset = Asset::new("a", "x.jpg");
        asset.is_favorite = true;
        assert_eq!(run(&asset, Criterion::new(FieldKey::IsFavorite)).unwrap().0, "true");
        assert_eq!(run(&asset, Criterion::new(FieldKey::IsArchived)).unwrap().0, "false");
    }

    #[test]
    fn timestamps_floor_to_delta() {
        let asset = Asset::new("a", "x.jpg").taken_at("2023-06-01T10:00:01.999+00:00");
        assert_eq!(run(&asset, Criterion::new(FieldKey::LocalDateTime)).unwrap().0, "2023-06-01T10:00:01.999Z");
        assert_eq!(
            run(&asset, Criterion::new(FieldKey::LocalDateTime).with_delta(1000)).unwrap().0,
            "2023-06-01T10:00:01.000Z"
        );
        assert_eq!(
            run(&asset, Criterion::new(FieldKey::LocalDateTime).with_delta(60_000)).unwrap().0,
            "2023-06-01T10:00:00.000Z"
        );

        let offset = Asset::new("b", "x.jpg").taken_at("2023-06-01T12:00:00.5+02:00");
        assert_eq!(run(&offset, Criterion::new(FieldKey::LocalDateTime)).unwrap().0, "2023-06-01T10:00:00.500Z");

        let naive = Asset::new("c", "x.jpg").taken_at("2023-06-01T10:00:00");
        assert_eq!(run(&naive, Criterion::new(FieldKey::LocalDateTime)).unwrap().0, "2023-06-01T10:00:00.000Z");
    }

    #[test]
    fn bad_timestamps_are_soft_misses() {
        let asset = Asset::new("a", "x.jpg").taken_at("yesterday-ish");
        assert_eq!(run(&asset, Criterion::new(FieldKey::LocalDateTime)).unwrap(), (String::new(), None));
        let empty = Asset::new("b", "x.jpg");
        assert_eq!(run(&empty, Criterion::new(FieldKey::FileCreatedAt)).unwrap().0, "");
    }

    #[test]
    fn filename_split_is_cumulative() {
        let asset = Asset::new("a", "IMG_2482~edit.v2.jpg");
        let cases: Vec<(&[&str], usize, &str)> = vec![
            (&["~"], 0, "IMG_2482"),
            (&["~"], 1, "edit.v2"),
            (&["~", "."], 1, "edit"),
            (&["~", "."], 2, "v2"),
            (&["_", "~", "."], 1, "2482"),
        ];
        for (delimiters, index, expected) in cases {
            let criterion = Criterion::new(FieldKey::OriginalFileName).with_split(delimiters, index);
            assert_eq!(run(&asset, criterion).unwrap().0, expected, "delimiters={delimiters:?} index={index}");
        }
        assert_eq!(run(&asset, Criterion::new(FieldKey::OriginalFileName)).unwrap().0, "IMG_2482~edit.v2");
    }

    #[test]
    fn split_index_out_of_range_is_fatal() {
        let asset = Asset::new("a42", "IMG.jpg");
        let err = run(&asset, Criterion::new(FieldKey::OriginalFileName).with_split(&["~"], 1)).unwrap_err();
        match err {
            Error::ExtractionRange { asset_id, key, .. } => {
                assert_eq!(asset_id, "a42");
                assert_eq!(key, "originalFileName");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn filename_regex_sees_extension() {
        let asset = Asset::new("a", "PXL_20230601_RAW.dng");
        let criterion = Criterion::new(FieldKey::OriginalFileName).with_regex(r"^PXL_(\d+)_\w+\.(dng)$", 1);
        assert_eq!(run(&asset, criterion).unwrap().0, "20230601");

        let miss = Asset::new("b", "DSC_1.jpg");
        let criterion = Criterion::new(FieldKey::OriginalFileName).with_regex("^PXL_", 0);
        assert_eq!(run(&miss, criterion).unwrap().0, "");
    }

    #[test]
    fn capture_index_out_of_range_is_fatal() {
        let asset = Asset::new("a", "PXL_1.jpg");
        let criterion = Criterion::new(FieldKey::OriginalFileName).with_regex("^PXL_(\\d)", 2);
        assert!(matches!(run(&asset, criterion), Err(Error::ExtractionRange { .. })));

        // No match means no captures to index: soft miss, not an error.
        let other = Asset::new("b", "DSC_1.jpg");
        let criterion = Criterion::new(FieldKey::OriginalFileName).with_regex("^PXL_(\\d)", 2);
        assert_eq!(run(&other, criterion).unwrap().0, "");
    }

    #[test]
    fn promote_capture_is_independent() {
        let criterion = Criterion::new(FieldKey::OriginalFileName)
            .with_regex(r"^(\w+?)(?:_(EDIT|RAW))?\.\w+$", 1)
            .with_promote(2, &["EDIT", "RAW"]);

        let edited = Asset::new("a", "IMG_0001_EDIT.jpg");
        assert_eq!(run(&edited, criterion.clone()).unwrap(), ("IMG_0001".to_string(), Some("EDIT".to_string())));

        let plain = Asset::new("b", "IMG_0001.jpg");
        assert_eq!(run(&plain, criterion).unwrap(), ("IMG_0001".to_string(), None));
    }

    #[test]
    fn path_normalizes_backslashes() {
        let asset = Asset::new("a", "x.jpg").at_path(r"C:\photos\2023\trip\x.jpg");
        assert_eq!(run(&asset, Criterion::new(FieldKey::OriginalPath)).unwrap().0, "C:/photos/2023/trip/x.jpg");
        let split = Criterion::new(FieldKey::OriginalPath).with_split(&["/"], 3);
        assert_eq!(run(&asset, split).unwrap().0, "trip");
        let regex = Criterion::new(FieldKey::OriginalPath).with_regex(r"photos/(\d{4})/", 1);
        assert_eq!(run(&asset, regex).unwrap().0, "2023");
    }

    #[test]
    fn direct_fields_pass_through() {
        let mut asset = Asset::new("a", "x.jpg");
        asset.checksum = "abc==".to_string();
        assert_eq!(run(&asset, Criterion::new(FieldKey::Checksum)).unwrap().0, "abc==");
        assert_eq!(run(&asset, Criterion::new(FieldKey::Type)).unwrap().0, "IMAGE");
        assert_eq!(run(&asset, Criterion::new(FieldKey::DeviceId)).unwrap().0, "");
    }

    #[test]
    fn extension_helpers() {
        assert_eq!(strip_extension("IMG_1.JPG"), "IMG_1");
        assert_eq!(strip_extension(".hidden"), ".hidden");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension("dir.v2/noext"), "dir.v2/noext");
        assert_eq!(extension_of("IMG_1.JPG"), "jpg");
        assert_eq!(extension_of("noext"), "");
    }

    #[test]
    fn extraction_is_idempotent() {
        let asset = Asset::new("a", "IMG_2482~3.jpg").taken_at("2023-06-01T10:00:00.123Z");
        let criteria = vec![
            Criterion::new(FieldKey::OriginalFileName).with_split(&["~", "."], 0),
            Criterion::new(FieldKey::LocalDateTime).with_delta(1000),
        ];
        for criterion in criteria {
            assert_eq!(run(&asset, criterion.clone()).unwrap(), run(&asset, criterion).unwrap());
        }
    }
}
