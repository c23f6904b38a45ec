//! Persisted snapshot of the last applied definition
//!
//! The snapshot is the serialized [`DatabaseDefinition`] stored verbatim at
//! `general.snapshotLocation`. It is read once at the start of a migration and
//! written once at the end, without locking.

use crate::definition::DatabaseDefinition;
use crate::error::{AdminError, Result};
use crate::location::Location;
use crate::store::{ObjectStore, StoreError};
use bytes::Bytes;

/// Read the previous snapshot
///
/// Returns `Ok(None)` when no snapshot object exists yet. Any other store failure,
/// and any snapshot that does not decode, is an error.
pub fn load_snapshot(store: &dyn ObjectStore, location: &str) -> Result<Option<DatabaseDefinition>> {
    let target = Location::parse(location)?;
    let bytes = match store.get(&target.bucket, &target.path) {
        Ok(bytes) => bytes,
        Err(StoreError::NotFound { .. }) => {
            log::info!("[migrate] no previous snapshot at {}", location);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    // Previous snapshots were valid when written; do not re-validate them here
    let previous = serde_json::from_slice(&bytes).map_err(|source| AdminError::Snapshot {
        location: location.to_string(),
        source,
    })?;
    Ok(Some(previous))
}

/// Write `definition` as the new snapshot at its own `snapshotLocation`
pub fn save_snapshot(store: &dyn ObjectStore, definition: &DatabaseDefinition) -> Result<()> {
    let target = Location::parse(&definition.general.snapshot_location)?;
    let body = definition.to_json_vec()?;
    store.put(&target.bucket, &target.path, Bytes::from(body))?;
    log::info!("[migrate] saved snapshot to {}", target);
    Ok(())
}
