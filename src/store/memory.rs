use crate::store::{ObjectEntry, ObjectStore, StoreError};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// In-memory object store
///
/// Thread-safe via `RwLock`; clones share the same objects. Listings come back in
/// key order.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<(String, String), Bytes>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, replacing any existing one
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert((bucket.to_string(), key.to_string()), data.into());
        }
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .read()
            .map(|o| o.contains_key(&(bucket.to_string(), key.to_string())))
            .unwrap_or(false)
    }

    /// Every key held in `bucket`, in order
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .map(|o| {
                o.keys()
                    .filter(|(b, _)| b == bucket)
                    .map(|(_, k)| k.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        Ok(objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| ObjectEntry::new(k.clone()))
            .collect())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError> {
        self.objects
            .write()
            .map_err(|_| Self::poisoned())?
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.objects
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn copy(
        &self,
        dest_bucket: &str,
        source_bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StoreError> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        let data = objects
            .get(&(source_bucket.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                bucket: source_bucket.to_string(),
                key: source_key.to_string(),
            })?;
        objects.insert((dest_bucket.to_string(), dest_key.to_string()), data);
        Ok(())
    }
}
