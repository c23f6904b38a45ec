//! Load-time validation of database definitions

use crate::definition::{DatabaseDefinition, TableDefinition};
use crate::error::{AdminError, Result};
use crate::location::Location;
use crate::relocate::{compile_key_pattern, placeholder_indices};
use std::collections::HashSet;

impl DatabaseDefinition {
    /// Check every structural invariant the admin operations rely on
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidLocation` for a malformed location and
    /// `AdminError::InvalidDefinition` for any other violation.
    pub fn validate(&self) -> Result<()> {
        if self.general.database_name.trim().is_empty() {
            return Err(AdminError::InvalidDefinition(
                "general.databaseName must not be empty".to_string(),
            ));
        }
        Location::parse(&self.general.snapshot_location)?;

        for (name, table) in &self.tables {
            validate_table(name, table)?;
        }
        Ok(())
    }
}

fn invalid(table: &str, message: impl std::fmt::Display) -> AdminError {
    AdminError::InvalidDefinition(format!("table '{table}': {message}"))
}

fn validate_table(name: &str, table: &TableDefinition) -> Result<()> {
    Location::parse(&table.src_location)?;

    if table.columns.is_empty() {
        return Err(invalid(name, "at least one column is required"));
    }
    if let Some((column, _)) = table.columns.iter().find(|(c, _)| c.trim().is_empty()) {
        return Err(invalid(name, format!("invalid column name '{column}'")));
    }

    let keys = &table.partition.keys;
    if keys.is_empty() {
        return Err(invalid(name, "at least one partition key is required"));
    }
    let mut seen = HashSet::new();
    for key in keys {
        if key.name.trim().is_empty() {
            return Err(invalid(name, "partition key names must not be empty"));
        }
        if !seen.insert(key.name.as_str()) {
            return Err(invalid(name, format!("duplicate partition key '{}'", key.name)));
        }
    }

    match table.partition.staging() {
        Some((location, pattern)) => {
            let staging = Location::parse(location)?;
            let re = compile_key_pattern(&staging.path, pattern)?;
            let group_count = re.captures_len() - 1;

            for key in keys {
                if key.format.is_empty() {
                    return Err(invalid(
                        name,
                        format!("partition key '{}' needs a format to relocate objects", key.name),
                    ));
                }
                for index in placeholder_indices(&key.format) {
                    match index {
                        Some(i) if (1..=group_count).contains(&i) => {}
                        _ => {
                            return Err(invalid(
                                name,
                                format!(
                                    "partition key '{}' format '{}' references a capture group outside 1..={}",
                                    key.name, key.format, group_count
                                ),
                            ))
                        }
                    }
                }
            }
        }
        None => {
            let spec = &table.partition;
            if spec.pre_partition_location.is_some() || spec.regexp.is_some() {
                log::warn!(
                    "table '{}' sets only one of prePartitionLocation/regexp; it will not be relocated",
                    name
                );
            }
        }
    }

    Ok(())
}
