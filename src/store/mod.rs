//! Object store contract
//!
//! The admin operations only need list/get/put/delete/copy addressed by bucket and
//! key. Calls are blocking from the caller's point of view; implementations backed
//! by network I/O are expected to yield inside `may` coroutines the way
//! `may`-aware clients do, so a fan-out of calls keeps many requests in flight.

mod local;
mod memory;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use bytes::Bytes;

/// Object store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed object does not exist
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Local I/O failure
    #[error("object store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend failure
    #[error("object store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// One listed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    /// Zero-length placeholder whose key ends in `/`
    pub is_directory_marker: bool,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let is_directory_marker = key.ends_with('/');
        Self {
            key,
            is_directory_marker,
        }
    }
}

/// Storage operations consumed by relocation and snapshot persistence
///
/// # Errors
///
/// Every method returns `StoreError`; `get` returns `StoreError::NotFound` for a
/// missing object so callers can tell absence apart from failure.
pub trait ObjectStore: Send + Sync + 'static {
    /// Every object whose key starts with `prefix`
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError>;

    fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Succeeds when the object is already absent
    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Copy `source_bucket/source_key` to `dest_bucket/dest_key`
    fn copy(
        &self,
        dest_bucket: &str,
        source_bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StoreError>;
}
