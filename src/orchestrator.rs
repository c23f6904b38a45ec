//! Catalog migration
//!
//! One migration run loads the previous snapshot, diffs it against the definition
//! being applied, drops removed tables, recreates new or changed tables, and only
//! then persists the new snapshot:
//!
//! 1. load snapshot (missing means no prior migration)
//! 2. diff
//! 3. drop phase, with the previous snapshot's database and connection parameters
//! 4. create phase: `DROP TABLE IF EXISTS` then `CREATE EXTERNAL TABLE` per table
//! 5. persist snapshot
//!
//! Tables within a phase run concurrently. A failure aborts the rest of that phase
//! and the snapshot is left untouched; tables already handled keep their new state
//! and the next run's diff picks up the difference.
//!
//! Partition repair is a separate operation and is never chained onto `migrate`.

use crate::ddl;
use crate::definition::{DatabaseDefinition, TableDefinition};
use crate::diff::{diff, DefinitionDiff};
use crate::error::Result;
use crate::fanout::fan_out;
use crate::query::{QueryClientFactory, QueryContext, QueryExecutor};
use crate::snapshot::{load_snapshot, save_snapshot};
use crate::store::ObjectStore;
use std::sync::Arc;

/// What a migration would do, computed without executing anything
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    current: Arc<DatabaseDefinition>,
    /// Snapshot loaded from the store, `None` when none exists yet
    pub previous: Option<DatabaseDefinition>,
    pub diff: DefinitionDiff,
}

impl MigrationPlan {
    /// Nothing to drop or create
    pub fn is_empty(&self) -> bool {
        self.diff.is_empty()
    }

    /// DDL `migrate` would issue: drop phase first, then the create phase
    ///
    /// Tables are listed by name; at execution time statements of different
    /// tables in one phase run concurrently.
    pub fn statements(&self) -> Vec<String> {
        let mut statements = Vec::new();
        if let Some(previous) = &self.previous {
            for name in &self.diff.drop {
                statements.push(ddl::drop_table_if_exists(&previous.general.database_name, name));
            }
        }

        let database = &self.current.general.database_name;
        for name in &self.diff.create_or_update {
            if let Some(table) = self.current.tables.get(name) {
                statements.push(ddl::drop_table_if_exists(database, name));
                statements.push(create_statement(database, name, table));
            }
        }
        statements
    }
}

/// Outcome of a successful migration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    /// Tables dropped and recreated, by name
    pub created: Vec<String>,
    /// Tables removed from the definition, by name
    pub dropped: Vec<String>,
    /// Whether a previous snapshot was found
    pub previous_existed: bool,
}

fn create_statement(database: &str, name: &str, table: &TableDefinition) -> String {
    ddl::create_table(
        database,
        name,
        &table.columns,
        &table.partition.keys,
        &table.src_location,
    )
}

fn execute_statement(
    client: &dyn QueryExecutor,
    kind: &'static str,
    table: &str,
    sql: &str,
) -> Result<()> {
    #[cfg(feature = "tracing")]
    let _span = crate::metrics::tracing_helpers::statement_span(kind, table).entered();

    log::debug!("[{}] {}", kind, sql);
    let completion = client.execute(sql)?;
    log::debug!("[{}] {} finished in {:?}", kind, table, completion.elapsed);

    #[cfg(feature = "metrics")]
    crate::metrics::METRICS.record_statement(kind, completion.elapsed);
    Ok(())
}

/// Applies a [`DatabaseDefinition`] to the catalog
///
/// # Example
///
/// ```rust
/// use athena_admin::{CatalogMigrator, DatabaseDefinition, MemoryObjectStore, RecordingQueryClient};
/// use std::sync::Arc;
///
/// let def = DatabaseDefinition::from_json_str(r#"{
///     "general": {"databaseName": "db", "engineRegion": "us-east-1",
///                 "snapshotLocation": "s3://admin/def.json"},
///     "tables": {"events": {
///         "columns": {"id": "string"},
///         "partition": {"keys": [{"name": "dt", "type": "string"}]},
///         "srcLocation": "s3://data/events/"
///     }}
/// }"#).unwrap();
///
/// let store = MemoryObjectStore::new();
/// let client = RecordingQueryClient::new();
/// let migrator = CatalogMigrator::new(def, Arc::new(store.clone()), Arc::new(client.clone()));
///
/// let summary = migrator.migrate().unwrap();
/// assert_eq!(summary.created, vec!["events".to_string()]);
/// assert_eq!(client.sql().len(), 2);
/// assert!(store.contains("admin", "def.json"));
/// ```
pub struct CatalogMigrator {
    definition: Arc<DatabaseDefinition>,
    store: Arc<dyn ObjectStore>,
    clients: Arc<dyn QueryClientFactory>,
}

impl CatalogMigrator {
    pub fn new(
        definition: DatabaseDefinition,
        store: Arc<dyn ObjectStore>,
        clients: Arc<dyn QueryClientFactory>,
    ) -> Self {
        Self {
            definition: Arc::new(definition),
            store,
            clients,
        }
    }

    pub fn definition(&self) -> &DatabaseDefinition {
        &self.definition
    }

    /// Load the previous snapshot and diff it against the current definition
    pub fn plan(&self) -> Result<MigrationPlan> {
        let previous = load_snapshot(
            self.store.as_ref(),
            &self.definition.general.snapshot_location,
        )?;
        let diff = diff(&self.definition, previous.as_ref());
        Ok(MigrationPlan {
            current: Arc::clone(&self.definition),
            previous,
            diff,
        })
    }

    /// Run the drop and create phases, then persist the snapshot
    pub fn migrate(&self) -> Result<MigrationSummary> {
        let MigrationPlan { previous, diff, .. } = self.plan()?;

        let mut summary = MigrationSummary {
            previous_existed: previous.is_some(),
            ..Default::default()
        };

        if let Some(previous) = previous {
            if !diff.drop.is_empty() {
                summary.dropped = diff.drop.iter().cloned().collect();
                log::info!("[migrate] drop table: {}", summary.dropped.join(","));
                self.drop_phase(&previous, &summary.dropped)?;
            }
        }

        if !diff.create_or_update.is_empty() {
            summary.created = diff.create_or_update.iter().cloned().collect();
            log::info!("[migrate] new/update table: {}", summary.created.join(","));
            self.create_phase(&summary.created)?;
        }

        save_snapshot(self.store.as_ref(), &self.definition)?;
        Ok(summary)
    }

    fn drop_phase(&self, previous: &DatabaseDefinition, names: &[String]) -> Result<()> {
        let targets: Vec<(String, String)> = names
            .iter()
            .filter_map(|name| {
                previous
                    .tables
                    .get(name)
                    .map(|table| (name.clone(), table.src_location.clone()))
            })
            .collect();

        let database = previous.general.database_name.clone();
        let region = previous.general.engine_region.clone();
        let clients = Arc::clone(&self.clients);

        fan_out(targets, move |(name, src_location): (String, String)| {
            let context = QueryContext::for_table(&region, &src_location)?;
            let client = clients.client(&context)?;
            execute_statement(
                client.as_ref(),
                "drop",
                &name,
                &ddl::drop_table_if_exists(&database, &name),
            )
        })?;
        Ok(())
    }

    fn create_phase(&self, names: &[String]) -> Result<()> {
        let definition = Arc::clone(&self.definition);
        let clients = Arc::clone(&self.clients);

        fan_out(names.to_vec(), move |name: String| {
            let Some(table) = definition.tables.get(&name) else {
                return Ok(());
            };
            let database = &definition.general.database_name;
            let context = QueryContext::for_table(&definition.general.engine_region, &table.src_location)?;
            let client = clients.client(&context)?;

            // The create for a table is only issued once its drop has completed
            execute_statement(
                client.as_ref(),
                "drop",
                &name,
                &ddl::drop_table_if_exists(database, &name),
            )?;
            execute_statement(
                client.as_ref(),
                "create",
                &name,
                &create_statement(database, &name, table),
            )
        })?;
        Ok(())
    }

    /// Register newly laid-out partitions for every table
    ///
    /// Returns the repaired table names. Independent of `migrate`.
    pub fn repair_partitions(&self) -> Result<Vec<String>> {
        let definition = Arc::clone(&self.definition);
        let clients = Arc::clone(&self.clients);
        let names: Vec<String> = definition.tables.keys().cloned().collect();

        let repaired = fan_out(names, move |name: String| {
            let Some(table) = definition.tables.get(&name) else {
                return Ok(name);
            };
            let context = QueryContext::for_table(&definition.general.engine_region, &table.src_location)?;
            let client = clients.client(&context)?;
            execute_statement(
                client.as_ref(),
                "repair",
                &name,
                &ddl::repair_table(&definition.general.database_name, &name),
            )?;
            Ok(name)
        })?;

        log::info!("[partition] repaired: {}", repaired.join(","));
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Fields, General, PartitionKey, PartitionSpec, TypeDef};
    use crate::query::RecordingQueryClient;
    use crate::snapshot::save_snapshot;
    use crate::store::MemoryObjectStore;

    fn table(bucket: &str, column_type: &str) -> TableDefinition {
        TableDefinition {
            columns: [("id", TypeDef::scalar(column_type))].into_iter().collect::<Fields>(),
            partition: PartitionSpec {
                keys: vec![PartitionKey::new("dt", "string", "")],
                pre_partition_location: None,
                regexp: None,
            },
            src_location: format!("s3://{bucket}/data/"),
        }
    }

    fn definition(database: &str, tables: &[(&str, TableDefinition)]) -> DatabaseDefinition {
        let mut def = DatabaseDefinition::empty(General {
            database_name: database.to_string(),
            engine_region: "us-east-1".to_string(),
            snapshot_location: "s3://admin/def.json".to_string(),
        });
        for (name, t) in tables {
            def.tables.insert(name.to_string(), t.clone());
        }
        def
    }

    fn migrator(
        def: DatabaseDefinition,
        store: &MemoryObjectStore,
        client: &RecordingQueryClient,
    ) -> CatalogMigrator {
        CatalogMigrator::new(def, Arc::new(store.clone()), Arc::new(client.clone()))
    }

    #[test]
    fn test_plan_statements_order() {
        let store = MemoryObjectStore::new();
        let previous = definition("olddb", &[("gone", table("b1", "int")), ("kept", table("b1", "int"))]);
        save_snapshot(&store, &previous).unwrap();

        let current = definition("db", &[("kept", table("b1", "bigint")), ("added", table("b2", "int"))]);
        let plan = migrator(current, &store, &RecordingQueryClient::new()).plan().unwrap();

        assert!(plan.previous.is_some());
        let statements = plan.statements();
        assert_eq!(statements[0], "DROP TABLE IF EXISTS olddb.gone");
        assert_eq!(statements[1], "DROP TABLE IF EXISTS db.added");
        assert!(statements[2].starts_with("CREATE EXTERNAL TABLE db.added (id int)"));
        assert_eq!(statements[3], "DROP TABLE IF EXISTS db.kept");
        assert!(statements[4].starts_with("CREATE EXTERNAL TABLE db.kept (id bigint)"));
        assert_eq!(statements.len(), 5);
    }

    #[test]
    fn test_plan_issues_nothing() {
        let store = MemoryObjectStore::new();
        let client = RecordingQueryClient::new();
        let plan = migrator(definition("db", &[("t", table("b", "int"))]), &store, &client)
            .plan()
            .unwrap();
        assert!(!plan.is_empty());
        assert!(client.sql().is_empty());
        assert!(!store.contains("admin", "def.json"));
    }

    #[test]
    fn test_unchanged_definition_still_persists() {
        let store = MemoryObjectStore::new();
        let def = definition("db", &[("t", table("b", "int"))]);
        save_snapshot(&store, &def).unwrap();

        let client = RecordingQueryClient::new();
        let summary = migrator(def, &store, &client).migrate().unwrap();
        assert!(summary.previous_existed);
        assert!(summary.created.is_empty());
        assert!(summary.dropped.is_empty());
        assert!(client.sql().is_empty());
        assert!(store.contains("admin", "def.json"));
    }

    #[test]
    fn test_repair_partitions_every_table() {
        let store = MemoryObjectStore::new();
        let client = RecordingQueryClient::new();
        let def = definition("db", &[("a", table("b1", "int")), ("b", table("b2", "int"))]);
        let repaired = migrator(def, &store, &client).repair_partitions().unwrap();
        assert_eq!(repaired, vec!["a".to_string(), "b".to_string()]);

        let mut sql = client.sql();
        sql.sort();
        assert_eq!(sql, vec!["MSCK REPAIR TABLE db.a", "MSCK REPAIR TABLE db.b"]);
    }
}
