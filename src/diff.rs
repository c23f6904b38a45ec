//! Definition diffing
//!
//! Compares the definition being applied with the last applied snapshot. Tables
//! are compared structurally over the typed model, so listing columns or struct
//! members in a different order is not a change.

use crate::definition::DatabaseDefinition;
use std::collections::BTreeSet;

/// Tables needing DDL work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionDiff {
    /// New tables and tables whose definition changed
    pub create_or_update: BTreeSet<String>,
    /// Tables present only in the previous snapshot
    pub drop: BTreeSet<String>,
}

impl DefinitionDiff {
    pub fn is_empty(&self) -> bool {
        self.create_or_update.is_empty() && self.drop.is_empty()
    }
}

/// Classify tables of `current` against `previous`
///
/// A missing snapshot is passed as `None` and behaves like a snapshot with no tables.
pub fn diff(current: &DatabaseDefinition, previous: Option<&DatabaseDefinition>) -> DefinitionDiff {
    let Some(previous) = previous else {
        return DefinitionDiff {
            create_or_update: current.tables.keys().cloned().collect(),
            drop: BTreeSet::new(),
        };
    };

    let create_or_update = current
        .tables
        .iter()
        .filter(|(name, table)| previous.tables.get(*name) != Some(*table))
        .map(|(name, _)| name.clone())
        .collect();

    let drop = previous
        .tables
        .keys()
        .filter(|name| !current.tables.contains_key(*name))
        .cloned()
        .collect();

    DefinitionDiff {
        create_or_update,
        drop,
    }
}
