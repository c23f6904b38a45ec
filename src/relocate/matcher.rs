//! Staged object key matching

use crate::error::{AdminError, Result};
use regex::Regex;

/// Owned result of matching one object key
///
/// Index 0 is the full match; indices `1..` are the capture groups. Groups that
/// did not participate in the match are `None`. Transforms receive and return this
/// value, so it is freely editable without affecting the key it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMatch {
    groups: Vec<Option<String>>,
    matched_len: usize,
}

impl KeyMatch {
    /// Build from raw groups; the full match length is taken from group 0
    pub fn from_groups(groups: Vec<Option<String>>) -> Self {
        let matched_len = groups
            .first()
            .and_then(|g| g.as_ref())
            .map_or(0, String::len);
        Self { groups, matched_len }
    }

    /// Full matched text (group 0)
    pub fn full(&self) -> &str {
        self.get(0).unwrap_or_default()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Overwrite a capture group value; out-of-range indices are ignored
    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        if let Some(slot) = self.groups.get_mut(index) {
            *slot = Some(value.into());
        }
    }

    /// Number of capture groups, excluding the full match
    pub fn group_count(&self) -> usize {
        self.groups.len().saturating_sub(1)
    }

    /// Byte length of the span matched in the original key
    ///
    /// Fixed when the match is taken; edits through [`KeyMatch::set`] do not change it.
    pub fn matched_len(&self) -> usize {
        self.matched_len
    }
}

/// Compile a table's pattern anchored at its staging prefix
pub fn compile_key_pattern(prefix: &str, pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^{}{}", regex::escape(prefix), pattern))
        .map_err(|e| AdminError::InvalidDefinition(format!("invalid regexp '{pattern}': {e}")))
}

/// Match an object key, failing when it does not match
pub fn match_key(re: &Regex, table: &str, object_key: &str) -> Result<KeyMatch> {
    let caps = re.captures(object_key).ok_or_else(|| AdminError::UnmatchedKey {
        table: table.to_string(),
        key: object_key.to_string(),
    })?;

    let groups = caps
        .iter()
        .map(|g| g.map(|m| m.as_str().to_string()))
        .collect();
    Ok(KeyMatch::from_groups(groups))
}
