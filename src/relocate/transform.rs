//! Per-object match transforms
//!
//! A transform sees every staged object's match before the partition path is built
//! and may rewrite capture values. The rewritten match only feeds path rendering;
//! the span replaced in the original key is always the one actually matched.

use crate::definition::TableDefinition;
use crate::error::{AdminError, Result};
use crate::relocate::KeyMatch;
use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Strategy applied to each match before partition path rendering
pub trait MatchTransform: Send + Sync {
    fn transform(
        &self,
        matched: KeyMatch,
        object_key: &str,
        table: &TableDefinition,
    ) -> Result<KeyMatch>;
}

impl<F> MatchTransform for F
where
    F: Fn(KeyMatch, &str, &TableDefinition) -> Result<KeyMatch> + Send + Sync,
{
    fn transform(
        &self,
        matched: KeyMatch,
        object_key: &str,
        table: &TableDefinition,
    ) -> Result<KeyMatch> {
        self(matched, object_key, table)
    }
}

/// Leaves every match untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl MatchTransform for IdentityTransform {
    fn transform(&self, matched: KeyMatch, _: &str, _: &TableDefinition) -> Result<KeyMatch> {
        Ok(matched)
    }
}

static OFFSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])(\d{2}):?(\d{2})$").expect("offset pattern is valid"));

/// Parse a UTC offset written as `+09:00`, `-0530`, or `Z`
pub fn parse_utc_offset(text: &str) -> Result<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| AdminError::Transform(text.to_string()));
    }
    let caps = OFFSET_RE
        .captures(text)
        .ok_or_else(|| AdminError::Transform(format!("invalid UTC offset '{text}'")))?;
    let hours: i32 = caps[2].parse().unwrap_or(0);
    let minutes: i32 = caps[3].parse().unwrap_or(0);
    let seconds = (hours * 3600 + minutes * 60) * if &caps[1] == "-" { -1 } else { 1 };
    FixedOffset::east_opt(seconds)
        .ok_or_else(|| AdminError::Transform(format!("UTC offset out of range '{text}'")))
}

/// Re-expresses a UTC year/month/day/hour capture quartet in a fixed offset
///
/// Objects are commonly staged under UTC hour prefixes while the table is
/// partitioned by local date. The shift applies only to tables that declare a
/// partition key named `trigger_key` (default `dt`); other tables pass through.
#[derive(Debug, Clone)]
pub struct UtcOffsetShift {
    offset: FixedOffset,
    trigger_key: String,
    groups: [usize; 4],
}

impl UtcOffsetShift {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            trigger_key: "dt".to_string(),
            groups: [1, 2, 3, 4],
        }
    }

    /// Partition key whose presence enables the shift
    pub fn trigger_key(mut self, name: impl Into<String>) -> Self {
        self.trigger_key = name.into();
        self
    }

    /// Capture indices holding year, month, day, and hour
    pub fn groups(mut self, year: usize, month: usize, day: usize, hour: usize) -> Self {
        self.groups = [year, month, day, hour];
        self
    }

    fn captured_utc(&self, matched: &KeyMatch, object_key: &str) -> Result<NaiveDateTime> {
        let mut parts = [0u32; 4];
        for (slot, &index) in parts.iter_mut().zip(self.groups.iter()) {
            let raw = matched.get(index).ok_or_else(|| {
                AdminError::Transform(format!(
                    "capture group {index} is missing in '{object_key}'"
                ))
            })?;
            *slot = raw.parse().map_err(|_| {
                AdminError::Transform(format!(
                    "capture group {index} of '{object_key}' is not numeric: '{raw}'"
                ))
            })?;
        }
        let [year, month, day, hour] = parts;
        NaiveDate::from_ymd_opt(year as i32, month, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .ok_or_else(|| {
                AdminError::Transform(format!("'{object_key}' does not encode a valid UTC hour"))
            })
    }
}

impl MatchTransform for UtcOffsetShift {
    fn transform(
        &self,
        mut matched: KeyMatch,
        object_key: &str,
        table: &TableDefinition,
    ) -> Result<KeyMatch> {
        if !table.partition.keys.iter().any(|k| k.name == self.trigger_key) {
            return Ok(matched);
        }

        let utc = self.captured_utc(&matched, object_key)?;
        let local = utc + Duration::seconds(i64::from(self.offset.local_minus_utc()));

        let [year, month, day, hour] = self.groups;
        matched.set(year, local.format("%Y").to_string());
        matched.set(month, local.format("%m").to_string());
        matched.set(day, local.format("%d").to_string());
        matched.set(hour, local.format("%H").to_string());
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Fields, PartitionKey, PartitionSpec, TypeDef};

    fn table_with_key(name: &str) -> TableDefinition {
        TableDefinition {
            columns: [("id", TypeDef::scalar("string"))].into_iter().collect::<Fields>(),
            partition: PartitionSpec {
                keys: vec![PartitionKey::new(name, "string", "{1}-{2}-{3}")],
                pre_partition_location: None,
                regexp: None,
            },
            src_location: "s3://b/t/".to_string(),
        }
    }

    fn utc_match(y: &str, m: &str, d: &str, h: &str) -> KeyMatch {
        KeyMatch::from_groups(vec![
            Some(format!("raw/{y}/{m}/{d}/{h}/")),
            Some(y.to_string()),
            Some(m.to_string()),
            Some(d.to_string()),
            Some(h.to_string()),
        ])
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+09:00").unwrap().local_minus_utc(), 9 * 3600);
        assert_eq!(parse_utc_offset("-0530").unwrap().local_minus_utc(), -(5 * 3600 + 30 * 60));
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("Asia/Tokyo").is_err());
        assert!(parse_utc_offset("+99:00").is_err());
    }

    #[test]
    fn test_shift_rolls_over_day_boundary() {
        let shift = UtcOffsetShift::new(parse_utc_offset("+09:00").unwrap());
        let original = utc_match("2024", "12", "31", "20");
        let shifted = shift
            .transform(original.clone(), "raw/2024/12/31/20/a.json", &table_with_key("dt"))
            .unwrap();
        assert_eq!(shifted.get(1), Some("2025"));
        assert_eq!(shifted.get(2), Some("01"));
        assert_eq!(shifted.get(3), Some("01"));
        assert_eq!(shifted.get(4), Some("05"));
        // The matched span of the original key is unchanged
        assert_eq!(shifted.full(), original.full());
        assert_eq!(shifted.matched_len(), original.matched_len());
    }

    #[test]
    fn test_shift_skips_tables_without_trigger_key() {
        let shift = UtcOffsetShift::new(parse_utc_offset("+09:00").unwrap());
        let original = utc_match("2024", "01", "02", "10");
        let out = shift
            .transform(original.clone(), "k", &table_with_key("day"))
            .unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_shift_rejects_non_numeric_capture() {
        let shift = UtcOffsetShift::new(parse_utc_offset("+01:00").unwrap());
        let m = utc_match("2024", "xx", "02", "10");
        assert!(matches!(
            shift.transform(m, "k", &table_with_key("dt")),
            Err(AdminError::Transform(_))
        ));
    }

    #[test]
    fn test_closure_transform() {
        let upper = |mut m: KeyMatch, _: &str, _: &TableDefinition| -> Result<KeyMatch> {
            let value = m.get(1).unwrap_or_default().to_uppercase();
            m.set(1, value);
            Ok(m)
        };
        let m = KeyMatch::from_groups(vec![Some("raw/ab/".to_string()), Some("ab".to_string())]);
        let out = upper.transform(m, "raw/ab/x", &table_with_key("dt")).unwrap();
        assert_eq!(out.get(1), Some("AB"));
    }
}
