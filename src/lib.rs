//! # athena-admin
//!
//! Lifecycle management for partitioned, schema-on-read external tables whose data
//! lives in an object store:
//!
//! - [`Relocator`] moves staged objects into `name=value` partition paths
//! - [`CatalogMigrator`] diffs a [`DatabaseDefinition`] against the last applied
//!   snapshot, drops and recreates tables, and persists the new snapshot
//! - [`CatalogMigrator::repair_partitions`] registers newly laid-out partitions
//!
//! Concurrent work runs on `may` coroutines. Object storage and query execution
//! are reached through the [`ObjectStore`] and [`QueryClientFactory`] traits.

pub mod config;
pub mod ddl;
pub mod definition;
pub mod diff;
pub mod error;
pub mod fanout;
pub mod location;
pub mod metrics;
pub mod orchestrator;
pub mod query;
pub mod relocate;
pub mod snapshot;
pub mod store;

pub use config::AdminConfig;
pub use definition::{
    DatabaseDefinition, Fields, General, PartitionKey, PartitionSpec, TableDefinition, TypeDef,
};
pub use diff::DefinitionDiff;
pub use error::{AdminError, Result};
pub use location::Location;
pub use orchestrator::{CatalogMigrator, MigrationPlan, MigrationSummary};
pub use query::{
    QueryClientFactory, QueryCompletion, QueryContext, QueryError, QueryExecutor,
    RecordingQueryClient,
};
pub use relocate::{
    IdentityTransform, KeyMatch, MatchTransform, PlannedMove, RelocationReport, Relocator,
    TableRelocation, UtcOffsetShift,
};
pub use store::{LocalObjectStore, MemoryObjectStore, ObjectEntry, ObjectStore, StoreError};
