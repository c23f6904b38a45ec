//! Integration tests for staged object relocation
//!
//! Objects are seeded into a `MemoryObjectStore` under a staging prefix and
//! relocated into `name=value` partition paths under the table location.

use athena_admin::{
    AdminError, DatabaseDefinition, KeyMatch, MemoryObjectStore, ObjectEntry, ObjectStore,
    Relocator, StoreError, TableDefinition, TableRelocation, UtcOffsetShift,
};
use athena_admin::relocate::parse_utc_offset;
use bytes::Bytes;
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

const EVENTS: &str = r#"{
    "general": {"databaseName": "analytics", "engineRegion": "us-east-1",
                "snapshotLocation": "s3://admin/analytics.json"},
    "tables": {
        "events": {
            "columns": {"id": "string", "payload": {"kind": "string"}},
            "partition": {
                "keys": [{"name": "dt", "type": "string", "format": "{1}-{2}-{3}"},
                         {"name": "hour", "type": "int", "format": "{4}"}],
                "prePartitionLocation": "s3://staging/raw/",
                "regexp": "(\\d{4})/(\\d{2})/(\\d{2})/(\\d{2})/"
            },
            "srcLocation": "s3://data/events/"
        },
        "users": {
            "columns": {"id": "string"},
            "partition": {"keys": [{"name": "region", "type": "string"}]},
            "srcLocation": "s3://data/users/"
        }
    }
}"#;

fn definition() -> DatabaseDefinition {
    DatabaseDefinition::from_json_str(EVENTS).unwrap()
}

fn relocator(store: &MemoryObjectStore) -> Relocator {
    Relocator::new(Arc::new(store.clone()))
}

/// Delegates to a memory store but fails copies of keys containing `poison`
struct PoisonedCopies {
    inner: MemoryObjectStore,
}

impl ObjectStore for PoisonedCopies {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        self.inner.list(bucket, prefix)
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.inner.get(bucket, key)
    }

    fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError> {
        self.inner.put(bucket, key, data)
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.inner.delete(bucket, key)
    }

    fn copy(
        &self,
        dest_bucket: &str,
        source_bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StoreError> {
        if source_key.contains("poison") {
            return Err(StoreError::Backend(format!("copy of {source_key} refused")));
        }
        self.inner.copy(dest_bucket, source_bucket, source_key, dest_key)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_relocates_into_partition_path() {
    let store = MemoryObjectStore::new();
    store.insert("staging", "raw/2024/01/02/10/file.json", "{\"id\":\"a\"}");
    store.insert("staging", "raw/2024/01/02/09/other.json", "{\"id\":\"b\"}");

    let report = relocator(&store).relocate(&definition()).unwrap();
    assert_eq!(report.moved(), 2);

    assert_eq!(
        store.keys("data"),
        vec![
            "events/dt=2024-01-02/hour=10/file.json".to_string(),
            "events/dt=2024-01-02/hour=9/other.json".to_string(),
        ]
    );
    assert!(store.keys("staging").is_empty());
    assert_eq!(
        store.get("data", "events/dt=2024-01-02/hour=10/file.json").unwrap(),
        Bytes::from_static(b"{\"id\":\"a\"}")
    );
}

#[test]
fn test_table_without_staging_is_skipped() {
    let store = MemoryObjectStore::new();
    let report = relocator(&store).relocate(&definition()).unwrap();
    assert_eq!(
        report.tables,
        vec![
            TableRelocation::Relocated {
                table: "events".to_string(),
                moved: 0,
                directory_markers: 0,
            },
            TableRelocation::Skipped {
                table: "users".to_string(),
            },
        ]
    );
}

#[test]
fn test_rerun_is_a_no_op() {
    let store = MemoryObjectStore::new();
    store.insert("staging", "raw/2024/01/02/10/file.json", "{}");
    let relocator = relocator(&store);

    assert_eq!(relocator.relocate(&definition()).unwrap().moved(), 1);
    let before = store.keys("data");

    assert_eq!(relocator.relocate(&definition()).unwrap().moved(), 0);
    assert_eq!(store.keys("data"), before);
}

#[test]
fn test_keep_originals() {
    let store = MemoryObjectStore::new();
    store.insert("staging", "raw/2024/01/02/10/file.json", "{}");

    relocator(&store)
        .delete_originals(false)
        .relocate(&definition())
        .unwrap();

    assert!(store.contains("staging", "raw/2024/01/02/10/file.json"));
    assert!(store.contains("data", "events/dt=2024-01-02/hour=10/file.json"));
}

#[test]
fn test_directory_markers_are_not_moved() {
    let store = MemoryObjectStore::new();
    store.insert("staging", "raw/2024/", "");
    store.insert("staging", "raw/2024/01/02/10/file.json", "{}");

    let report = relocator(&store).relocate(&definition()).unwrap();
    assert_eq!(
        report.tables[0],
        TableRelocation::Relocated {
            table: "events".to_string(),
            moved: 1,
            directory_markers: 1,
        }
    );
    assert!(store.contains("staging", "raw/2024/"));
}

#[test]
fn test_unmatched_key_fails_the_table() {
    let store = MemoryObjectStore::new();
    store.insert("staging", "raw/misc/readme.txt", "hello");

    match relocator(&store).relocate(&definition()) {
        Err(AdminError::UnmatchedKey { table, key }) => {
            assert_eq!(table, "events");
            assert_eq!(key, "raw/misc/readme.txt");
        }
        other => panic!("expected UnmatchedKey, got {:?}", other),
    }
    assert!(store.contains("staging", "raw/misc/readme.txt"));
}

#[test]
fn test_copy_failure_keeps_the_source() {
    let inner = MemoryObjectStore::new();
    inner.insert("staging", "raw/2024/01/02/10/poison.json", "{}");
    inner.insert("staging", "raw/2024/01/02/11/fine.json", "{}");

    let result = Relocator::new(Arc::new(PoisonedCopies {
        inner: inner.clone(),
    }))
    .relocate(&definition());

    assert!(matches!(
        result,
        Err(AdminError::Store(StoreError::Backend(_)))
    ));
    assert!(inner.contains("staging", "raw/2024/01/02/10/poison.json"));
    assert!(!inner.contains("data", "events/dt=2024-01-02/hour=10/poison.json"));
}

#[test]
fn test_utc_offset_shift_changes_only_the_partition_path() {
    let store = MemoryObjectStore::new();
    store.insert("staging", "raw/2024/01/02/20/file.json", "{}");

    let shift = UtcOffsetShift::new(parse_utc_offset("+09:00").unwrap());
    relocator(&store)
        .with_transform(shift)
        .relocate(&definition())
        .unwrap();

    // 2024-01-02T20:00Z is 2024-01-03T05:00+09:00; the file name is untouched
    assert_eq!(
        store.keys("data"),
        vec!["events/dt=2024-01-03/hour=5/file.json".to_string()]
    );
}

#[test]
fn test_closure_transform_sees_the_original_key() {
    let store = MemoryObjectStore::new();
    store.insert("staging", "raw/2024/01/02/10/file.json", "{}");

    relocator(&store)
        .with_transform(
            |mut matched: KeyMatch, key: &str, table: &TableDefinition| -> athena_admin::Result<KeyMatch> {
                assert_eq!(key, "raw/2024/01/02/10/file.json");
                assert_eq!(table.src_location, "s3://data/events/");
                matched.set(4, "00");
                Ok(matched)
            },
        )
        .relocate(&definition())
        .unwrap();

    assert_eq!(
        store.keys("data"),
        vec!["events/dt=2024-01-02/hour=0/file.json".to_string()]
    );
}

#[test]
fn test_plan_does_not_move() {
    let store = MemoryObjectStore::new();
    store.insert("staging", "raw/2024/01/02/10/file.json", "{}");

    let plan = relocator(&store).plan(&definition()).unwrap();
    assert_eq!(plan.len(), 1);
    let (table, moves) = &plan[0];
    assert_eq!(table, "events");
    assert_eq!(moves[0].source.to_string(), "s3://staging/raw/2024/01/02/10/file.json");
    assert_eq!(
        moves[0].destination.to_string(),
        "s3://data/events/dt=2024-01-02/hour=10/file.json"
    );
    assert!(store.contains("staging", "raw/2024/01/02/10/file.json"));
    assert!(store.keys("data").is_empty());
}
