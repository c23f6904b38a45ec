//! Partition path rendering
//!
//! Partition key formats are templates with 1-based placeholders (`{1}`, `{2}`, ...)
//! that refer to capture groups of the table's key pattern. Rendering never touches
//! the [`PartitionKey`] it reads from; every object gets a freshly built string.

use crate::definition::PartitionKey;
use crate::error::{AdminError, Result};
use crate::relocate::KeyMatch;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\d+)\}").expect("placeholder pattern is valid"));

/// Capture indices referenced by a format template, in order of appearance
///
/// Indices too large for `usize` come back as `None`.
pub fn placeholder_indices(format: &str) -> impl Iterator<Item = Option<usize>> + '_ {
    PLACEHOLDER_RE
        .captures_iter(format)
        .map(|caps| caps[1].parse::<usize>().ok())
}

/// Substitute every placeholder in `key.format` and coerce integer-typed values
pub fn render_value(key: &PartitionKey, matched: &KeyMatch, object_key: &str) -> Result<String> {
    let mut missing = None;
    let rendered = PLACEHOLDER_RE.replace_all(&key.format, |caps: &Captures<'_>| {
        // An index too large for usize cannot name a group either
        let index = caps[1].parse::<usize>().unwrap_or(usize::MAX);
        let group = matched.get(index);
        if group.is_none() && missing.is_none() {
            missing = Some(index);
        }
        group.unwrap_or_default().to_string()
    });

    if let Some(index) = missing {
        return Err(AdminError::MissingCapture {
            key_name: key.name.clone(),
            index,
            object_key: object_key.to_string(),
        });
    }

    if key.is_integer() {
        return canonical_integer(&rendered).ok_or_else(|| AdminError::InvalidIntPartition {
            key_name: key.name.clone(),
            value: rendered.to_string(),
        });
    }

    Ok(rendered.into_owned())
}

/// Canonical text of a decimal integer of any length: "01" -> "1", "-007" -> "-7"
fn canonical_integer(text: &str) -> Option<String> {
    let text = text.trim();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Some("0".to_string());
    }
    Some(format!("{sign}{digits}"))
}

/// `name=value` segments for every key, in declared order, joined by `/`
pub fn render_partition_path(
    keys: &[PartitionKey],
    matched: &KeyMatch,
    object_key: &str,
) -> Result<String> {
    let segments = keys
        .iter()
        .map(|key| -> Result<String> {
            Ok(format!("{}={}", key.name, render_value(key, matched, object_key)?))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("/"))
}

/// Replace the matched leading span of `object_key` with `partition_path`
///
/// `matched_len` is the byte length of the full match in the original key. When the
/// match ended on a path separator, the separator is kept between the partition
/// path and the remainder.
pub fn rewrite_key(object_key: &str, matched_len: usize, partition_path: &str) -> String {
    let (matched, rest) = object_key.split_at(matched_len);
    if matched.ends_with('/') {
        format!("{partition_path}/{rest}")
    } else {
        format!("{partition_path}{rest}")
    }
}
