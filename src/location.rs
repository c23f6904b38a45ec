//! S3-style object locations
//!
//! Every location in a definition (`srcLocation`, `prePartitionLocation`,
//! `snapshotLocation`) is written as `s3://bucket/path`. The bucket is everything
//! up to the first `/` after the scheme; the path is the remainder and may be empty.

use crate::error::{AdminError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^s3://([^/]+)/(.*)$").expect("location pattern is valid"));

/// A bucket plus key prefix parsed from an `s3://` URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub bucket: String,
    pub path: String,
}

impl Location {
    /// Parse `s3://bucket/path`
    ///
    /// # Examples
    ///
    /// ```
    /// use athena_admin::Location;
    ///
    /// let loc = Location::parse("s3://bucket/a/b").unwrap();
    /// assert_eq!(loc.bucket, "bucket");
    /// assert_eq!(loc.path, "a/b");
    /// assert!(Location::parse("not-a-uri").is_err());
    /// ```
    pub fn parse(location: &str) -> Result<Self> {
        let caps = LOCATION_RE
            .captures(location)
            .ok_or_else(|| AdminError::InvalidLocation(location.to_string()))?;

        Ok(Self {
            bucket: caps[1].to_string(),
            path: caps[2].to_string(),
        })
    }

    /// Location of `suffix` appended verbatim to this location's path
    pub fn join(&self, suffix: &str) -> Self {
        Self {
            bucket: self.bucket.clone(),
            path: format!("{}{}", self.path, suffix),
        }
    }

    /// Bucket-level staging URI the query engine writes results under
    pub fn staging_uri(&self) -> String {
        format!("s3://{}/tmp/", self.bucket)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_path() {
        let loc = Location::parse("s3://bucket/a/b").unwrap();
        assert_eq!(
            loc,
            Location {
                bucket: "bucket".to_string(),
                path: "a/b".to_string()
            }
        );
    }

    #[test]
    fn test_parse_empty_path() {
        let loc = Location::parse("s3://bucket/").unwrap();
        assert_eq!(loc.bucket, "bucket");
        assert_eq!(loc.path, "");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let invalid = vec![
            "not-a-uri",
            "",
            "s3://bucket",
            "s3:///path",
            "gs://bucket/path",
            "https://bucket/path",
        ];

        for s in invalid {
            match Location::parse(s) {
                Err(AdminError::InvalidLocation(got)) => assert_eq!(got, s),
                other => panic!("expected InvalidLocation for {:?}, got {:?}", s, other),
            }
        }
    }

    #[test]
    fn test_display_round_trips() {
        let loc = Location::parse("s3://logs/access/2024/").unwrap();
        assert_eq!(loc.to_string(), "s3://logs/access/2024/");
    }

    #[test]
    fn test_join_and_staging() {
        let loc = Location::parse("s3://warehouse/tables/events/").unwrap();
        let joined = loc.join("dt=2024-01-02/file.json");
        assert_eq!(joined.path, "tables/events/dt=2024-01-02/file.json");
        assert_eq!(loc.staging_uri(), "s3://warehouse/tmp/");
    }
}
