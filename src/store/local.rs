use crate::store::{ObjectEntry, ObjectStore, StoreError};
use bytes::Bytes;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Filesystem-backed object store
///
/// Each bucket is a directory under `root`; object keys are `/`-separated paths
/// relative to it. Empty directories are listed as directory markers.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        // Only plain relative segments stay under the root
        let escapes = |s: &str| {
            Path::new(s)
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        };
        if bucket.is_empty() || bucket.contains('/') || escapes(bucket) || escapes(key) {
            return Err(StoreError::Backend(format!(
                "refusing to address {bucket}/{key} outside the store root"
            )));
        }
        Ok(self.root.join(bucket).join(key))
    }

    fn not_found(bucket: &str, key: &str) -> StoreError {
        StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

fn walk(dir: &Path, relative: &str, out: &mut Vec<ObjectEntry>) -> std::io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    if entries.is_empty() && !relative.is_empty() {
        out.push(ObjectEntry::new(format!("{relative}/")));
        return Ok(());
    }

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if relative.is_empty() {
            name
        } else {
            format!("{relative}/{name}")
        };
        if entry.file_type()?.is_dir() {
            walk(&entry.path(), &key, out)?;
        } else {
            out.push(ObjectEntry::new(key));
        }
    }
    Ok(())
}

impl ObjectStore for LocalObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        let bucket_dir = self.object_path(bucket, "")?;
        if !bucket_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        walk(&bucket_dir, "", &mut entries)?;
        entries.retain(|e| e.key.starts_with(prefix));
        Ok(entries)
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Self::not_found(bucket, key)),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &data)?;
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn copy(
        &self,
        dest_bucket: &str,
        source_bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StoreError> {
        let source = self.object_path(source_bucket, source_key)?;
        let dest = self.object_path(dest_bucket, dest_key)?;
        if !source.is_file() {
            return Err(Self::not_found(source_bucket, source_key));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &dest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.put("b", "raw/2024/a.json", Bytes::from_static(b"a")).unwrap();
        store.put("b", "raw/2024/b.json", Bytes::from_static(b"b")).unwrap();
        store.put("b", "other/c.json", Bytes::from_static(b"c")).unwrap();
        fs::create_dir_all(dir.path().join("b/raw/empty")).unwrap();

        let keys: Vec<String> = store
            .list("b", "raw/")
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["raw/2024/a.json", "raw/2024/b.json", "raw/empty/"]);
        assert_eq!(store.get("b", "raw/2024/a.json").unwrap(), Bytes::from_static(b"a"));
    }

    #[test]
    fn test_missing_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.get("b", "nope").unwrap_err().is_not_found());
        assert!(store.list("b", "").unwrap().is_empty());
        assert!(store.delete("b", "nope").is_ok());
        assert!(store.copy("b", "b", "nope", "dest").unwrap_err().is_not_found());
    }

    #[test]
    fn test_copy_across_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("staging", "raw/a", Bytes::from_static(b"x")).unwrap();
        store.copy("data", "staging", "raw/a", "t/dt=1/a").unwrap();
        assert_eq!(store.get("data", "t/dt=1/a").unwrap(), Bytes::from_static(b"x"));
        assert!(store.get("staging", "raw/a").is_ok());
    }

    #[test]
    fn test_rejects_parent_escape() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(matches!(
            store.get("b", "../secret"),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn test_rejects_absolute_key() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        // s3://admin//tmp/x.json parses to an absolute-looking key
        let key = format!("{}/def.json", outside.path().display());
        assert!(key.starts_with('/'));
        assert!(matches!(
            store.put("admin", &key, Bytes::from_static(b"{}")),
            Err(StoreError::Backend(_))
        ));
        assert!(!outside.path().join("def.json").exists());
        assert!(matches!(store.get("admin", &key), Err(StoreError::Backend(_))));
        assert!(store
            .copy("admin", "admin", "a.json", &key)
            .is_err());
    }
}
