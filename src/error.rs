//! Error types shared by every admin operation.

use crate::query::QueryError;
use crate::store::StoreError;

/// Errors raised while loading definitions, relocating objects, or migrating the catalog
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// A location string is not of the form `s3://bucket/path`
    #[error("invalid S3 location: {0}")]
    InvalidLocation(String),

    /// The database definition failed validation
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// A staged object key did not match the table's key pattern
    #[error("object key '{key}' does not match the pattern of table '{table}'")]
    UnmatchedKey { table: String, key: String },

    /// A partition key format referenced a capture group that did not participate in the match
    #[error("partition key '{key_name}' references capture group {index}, which did not match in '{object_key}'")]
    MissingCapture {
        key_name: String,
        index: usize,
        object_key: String,
    },

    /// An `int` partition key rendered to a value that is not an integer
    #[error("partition key '{key_name}' is typed int but rendered '{value}'")]
    InvalidIntPartition { key_name: String, value: String },

    /// A match transform rejected its input
    #[error("match transform failed: {0}")]
    Transform(String),

    /// Object store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Query execution failure
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The persisted snapshot exists but could not be decoded
    #[error("snapshot at {location} could not be decoded: {source}")]
    Snapshot {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A fan-out unit panicked instead of returning
    #[error("coroutine panicked: {0}")]
    TaskPanicked(String),
}

/// Result alias used throughout the crate
pub type Result<T, E = AdminError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_key_display() {
        let err = AdminError::UnmatchedKey {
            table: "access_log".to_string(),
            key: "raw/readme.txt".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "object key 'raw/readme.txt' does not match the pattern of table 'access_log'"
        );
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: AdminError = StoreError::NotFound {
            bucket: "b".to_string(),
            key: "k".to_string(),
        }
        .into();
        assert!(err.to_string().contains("b/k"));
    }
}
