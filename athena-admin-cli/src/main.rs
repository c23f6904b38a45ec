//! athena-admin CLI
//!
//! Runs relocation, catalog migration, and partition repair against a local object
//! store. Query statements are printed rather than sent to an engine.

use anyhow::{Context, Result};
use athena_admin::{
    AdminConfig, CatalogMigrator, DatabaseDefinition, LocalObjectStore, MigrationPlan,
    ObjectStore, RecordingQueryClient, RelocationReport, Relocator, TableRelocation,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "athena-admin")]
#[command(about = "Partitioned external table administration")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file (default: config/athena-admin.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Definition file, overrides `definition_path` from the configuration
    #[arg(long)]
    definition: Option<PathBuf>,

    /// Local object store root, overrides `store_root` from the configuration
    #[arg(long)]
    store_root: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the definition
    Validate,

    /// Show the table diff and the DDL a migration would issue
    Plan,

    /// Move staged objects into partitioned locations
    Relocate {
        /// Copy without deleting the staged objects
        #[arg(long)]
        keep_originals: bool,

        /// Shift UTC-staged keys into this offset, e.g. +09:00
        #[arg(long)]
        utc_offset: Option<String>,

        /// Show where each object would go without copying
        #[arg(long)]
        dry_run: bool,
    },

    /// Drop and recreate changed tables, then save the snapshot
    Migrate,

    /// Repair partitions of every table
    Partition,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if cli.quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    } else if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let quiet = cli.quiet;
    match run(cli) {
        Ok(()) => {
            if !quiet {
                println!("{}", "✅ Success".green());
            }
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{} {:#}", "❌ Error:".red(), e);
            process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<AdminConfig> {
    let mut config = match &cli.config {
        Some(path) => AdminConfig::load_from(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => AdminConfig::load().context("loading configuration")?,
    };
    if let Some(path) = &cli.definition {
        config.definition_path = path.clone();
    }
    if let Some(root) = &cli.store_root {
        config.store_root = root.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    let definition = DatabaseDefinition::load(&config.definition_path)
        .with_context(|| format!("loading definition {}", config.definition_path.display()))?;
    let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&config.store_root));

    match cli.command {
        Commands::Validate => {
            println!(
                "{} is valid: database {}, {} table(s)",
                config.definition_path.display(),
                definition.general.database_name.bold(),
                definition.tables.len()
            );
            Ok(())
        }
        Commands::Plan => {
            let migrator = CatalogMigrator::new(definition, store, Arc::new(RecordingQueryClient::new()));
            let plan = migrator.plan()?;
            print_plan(&plan);
            Ok(())
        }
        Commands::Relocate {
            keep_originals,
            utc_offset,
            dry_run,
        } => {
            if utc_offset.is_some() {
                config.utc_offset = utc_offset;
            }
            let mut relocator = Relocator::new(store)
                .delete_originals(config.delete_pre_objects && !keep_originals);
            if let Some(shift) = config.offset_shift()? {
                relocator = relocator.with_transform(shift);
            }

            if dry_run {
                for (table, moves) in relocator.plan(&definition)? {
                    println!("\n{} ({} object(s))", table.bold(), moves.len());
                    for planned in moves {
                        println!("  {} -> {}", planned.source, planned.destination.to_string().green());
                    }
                }
                return Ok(());
            }

            let report = relocator.relocate(&definition)?;
            print_relocation(&report);
            Ok(())
        }
        Commands::Migrate => {
            let client = RecordingQueryClient::new();
            let migrator = CatalogMigrator::new(definition, store, Arc::new(client.clone()));
            let summary = migrator.migrate()?;

            for sql in client.sql() {
                println!("{sql};");
            }
            if !summary.previous_existed {
                println!("{}", "No previous snapshot, created every table".yellow());
            }
            println!(
                "\n📈 Summary: {} created/updated, {} dropped",
                summary.created.len(),
                summary.dropped.len()
            );
            Ok(())
        }
        Commands::Partition => {
            let client = RecordingQueryClient::new();
            let migrator = CatalogMigrator::new(definition, store, Arc::new(client.clone()));
            let repaired = migrator.repair_partitions()?;
            for sql in client.sql() {
                println!("{sql};");
            }
            println!("\n📈 Summary: {} table(s) repaired", repaired.len());
            Ok(())
        }
    }
}

fn print_plan(plan: &MigrationPlan) {
    println!("\n📊 Table changes\n");
    if plan.is_empty() {
        println!("  No changes");
        return;
    }

    let existing = |name: &str| {
        plan.previous
            .as_ref()
            .is_some_and(|previous| previous.tables.contains_key(name))
    };
    for name in &plan.diff.create_or_update {
        if existing(name) {
            println!("  {} {}", "~".yellow(), name);
        } else {
            println!("  {} {}", "+".green(), name);
        }
    }
    for name in &plan.diff.drop {
        println!("  {} {}", "-".red(), name);
    }

    println!("\n📝 Statements\n");
    for sql in plan.statements() {
        println!("{sql};");
    }
}

fn print_relocation(report: &RelocationReport) {
    for table in &report.tables {
        match table {
            TableRelocation::Skipped { table } => {
                println!("  {} {} (no staging location)", "·".dimmed(), table);
            }
            TableRelocation::Relocated {
                table,
                moved,
                directory_markers,
            } => {
                println!(
                    "  {} {}: {} object(s) moved, {} directory marker(s) skipped",
                    "✓".green(),
                    table,
                    moved,
                    directory_markers
                );
            }
        }
    }
    println!("\n📈 Summary: {} object(s) relocated", report.moved());
}
