//! Object relocation into partition-key paths
//!
//! For each table with a staging location and key pattern, every staged object is
//! matched, its `name=value` partition path is rendered, and the object is copied
//! (and by default deleted) under the table's `srcLocation`:
//!
//! ```text
//! s3://staging/raw/2024/01/02/10/file.json
//!   -> s3://data/events/dt=2024-01-02/hour=10/file.json
//! ```
//!
//! Tables are processed one after another. Objects of one table are processed
//! concurrently; the table finishes (all copies and deletes settled) before the
//! next one starts. A failing object stops objects not yet started but does not
//! undo completed ones, so a run can simply be repeated: relocated objects are no
//! longer listed under the staging prefix.

mod matcher;
mod template;
mod transform;

pub use matcher::{compile_key_pattern, match_key, KeyMatch};
pub use template::{placeholder_indices, render_partition_path, render_value, rewrite_key};
pub use transform::{parse_utc_offset, IdentityTransform, MatchTransform, UtcOffsetShift};

use crate::definition::{DatabaseDefinition, TableDefinition};
use crate::error::Result;
use crate::fanout::fan_out;
use crate::location::Location;
use crate::store::{ObjectEntry, ObjectStore};
use regex::Regex;
use std::sync::Arc;

/// Where one staged object goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: Location,
    pub destination: Location,
}

/// Outcome for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRelocation {
    /// No staging location or pattern configured
    Skipped { table: String },
    Relocated {
        table: String,
        moved: usize,
        directory_markers: usize,
    },
}

/// Outcome of a relocation run, in table order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationReport {
    pub tables: Vec<TableRelocation>,
}

impl RelocationReport {
    /// Total objects moved across every table
    pub fn moved(&self) -> usize {
        self.tables
            .iter()
            .map(|t| match t {
                TableRelocation::Relocated { moved, .. } => *moved,
                TableRelocation::Skipped { .. } => 0,
            })
            .sum()
    }
}

/// Compiled per-table relocation parameters
struct TableJob {
    name: String,
    table: TableDefinition,
    staging: Location,
    target: Location,
    pattern: Regex,
}

impl TableJob {
    fn prepare(name: &str, table: &TableDefinition) -> Result<Option<Self>> {
        let Some((location, pattern)) = table.partition.staging() else {
            return Ok(None);
        };
        let staging = Location::parse(location)?;
        let pattern = compile_key_pattern(&staging.path, pattern)?;
        Ok(Some(Self {
            name: name.to_string(),
            table: table.clone(),
            staging,
            target: Location::parse(&table.src_location)?,
            pattern,
        }))
    }

    /// Destination of one staged key
    fn destination(&self, object_key: &str, transform: &dyn MatchTransform) -> Result<Location> {
        let matched = match_key(&self.pattern, &self.name, object_key)?;
        let matched_len = matched.matched_len();
        let matched = transform.transform(matched, object_key, &self.table)?;
        let partition_path = render_partition_path(&self.table.partition.keys, &matched, object_key)?;
        let new_key = rewrite_key(object_key, matched_len, &partition_path);
        Ok(self.target.join(&new_key))
    }
}

/// Compute moves for one table without touching the store beyond listing
pub fn plan_table(
    store: &dyn ObjectStore,
    name: &str,
    table: &TableDefinition,
    transform: &dyn MatchTransform,
) -> Result<Vec<PlannedMove>> {
    let Some(job) = TableJob::prepare(name, table)? else {
        return Ok(Vec::new());
    };
    store
        .list(&job.staging.bucket, &job.staging.path)?
        .into_iter()
        .filter(|entry| !entry.is_directory_marker)
        .map(|entry| -> Result<PlannedMove> {
            Ok(PlannedMove {
                destination: job.destination(&entry.key, transform)?,
                source: Location {
                    bucket: job.staging.bucket.clone(),
                    path: entry.key,
                },
            })
        })
        .collect()
}

/// Moves staged objects into partitioned locations
///
/// # Example
///
/// ```rust
/// use athena_admin::{DatabaseDefinition, MemoryObjectStore, Relocator};
/// use std::sync::Arc;
///
/// let store = MemoryObjectStore::new();
/// store.insert("staging", "raw/2024/01/02/10/file.json", "{}");
///
/// let def = DatabaseDefinition::from_json_str(r#"{
///     "general": {"databaseName": "db", "engineRegion": "us-east-1",
///                 "snapshotLocation": "s3://admin/def.json"},
///     "tables": {"events": {
///         "columns": {"id": "string"},
///         "partition": {
///             "keys": [{"name": "dt", "type": "string", "format": "{1}-{2}-{3}"},
///                      {"name": "hour", "type": "int", "format": "{4}"}],
///             "prePartitionLocation": "s3://staging/raw/",
///             "regexp": "(\\d{4})/(\\d{2})/(\\d{2})/(\\d{2})/"
///         },
///         "srcLocation": "s3://data/events/"
///     }}
/// }"#).unwrap();
///
/// let report = Relocator::new(Arc::new(store.clone())).relocate(&def).unwrap();
/// assert_eq!(report.moved(), 1);
/// assert!(store.contains("data", "events/dt=2024-01-02/hour=10/file.json"));
/// assert!(!store.contains("staging", "raw/2024/01/02/10/file.json"));
/// ```
pub struct Relocator {
    store: Arc<dyn ObjectStore>,
    transform: Arc<dyn MatchTransform>,
    delete_originals: bool,
}

impl Relocator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            transform: Arc::new(IdentityTransform),
            delete_originals: true,
        }
    }

    /// Delete each staged object after its copy succeeds (default `true`)
    pub fn delete_originals(mut self, delete: bool) -> Self {
        self.delete_originals = delete;
        self
    }

    /// Rewrite capture values before partition paths are rendered
    pub fn with_transform(mut self, transform: impl MatchTransform + 'static) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    /// Relocate every configured table, one table at a time
    pub fn relocate(&self, definition: &DatabaseDefinition) -> Result<RelocationReport> {
        let mut report = RelocationReport::default();
        for (name, table) in &definition.tables {
            report.tables.push(self.relocate_table(name, table)?);
        }
        Ok(report)
    }

    /// Relocate a single table's staged objects
    pub fn relocate_table(&self, name: &str, table: &TableDefinition) -> Result<TableRelocation> {
        #[cfg(feature = "tracing")]
        let _span = crate::metrics::tracing_helpers::relocate_table_span(name).entered();

        let Some(job) = TableJob::prepare(name, table)? else {
            log::debug!("[relocate] skip the table {}", name);
            return Ok(TableRelocation::Skipped {
                table: name.to_string(),
            });
        };

        let (markers, objects): (Vec<ObjectEntry>, Vec<ObjectEntry>) = self
            .store
            .list(&job.staging.bucket, &job.staging.path)?
            .into_iter()
            .partition(|entry| entry.is_directory_marker);
        for marker in &markers {
            log::debug!("[relocate] skip directory marker {}", marker.key);
        }

        let job = Arc::new(job);
        let store = Arc::clone(&self.store);
        let transform = Arc::clone(&self.transform);
        let delete_originals = self.delete_originals;

        let moved = fan_out(objects, move |entry: ObjectEntry| {
            let destination = job.destination(&entry.key, transform.as_ref())?;
            store.copy(
                &destination.bucket,
                &job.staging.bucket,
                &entry.key,
                &destination.path,
            )?;
            log::info!("[relocate] {} -> {}", entry.key, destination.path);
            if delete_originals {
                store.delete(&job.staging.bucket, &entry.key)?;
            }
            #[cfg(feature = "metrics")]
            crate::metrics::METRICS.record_relocation(&job.name);
            Ok(())
        })?
        .len();

        Ok(TableRelocation::Relocated {
            table: name.to_string(),
            moved,
            directory_markers: markers.len(),
        })
    }

    /// Compute moves for every configured table without copying anything
    pub fn plan(&self, definition: &DatabaseDefinition) -> Result<Vec<(String, Vec<PlannedMove>)>> {
        definition
            .tables
            .iter()
            .filter(|(_, table)| table.partition.staging().is_some())
            .map(|(name, table)| -> Result<(String, Vec<PlannedMove>)> {
                let moves = plan_table(self.store.as_ref(), name, table, self.transform.as_ref())?;
                Ok((name.clone(), moves))
            })
            .collect()
    }
}
