//! Database definitions: the typed model, JSON loading, and validation
//!
//! # Example
//!
//! ```rust
//! use athena_admin::DatabaseDefinition;
//!
//! let def = DatabaseDefinition::from_json_str(r#"{
//!     "general": {
//!         "databaseName": "analytics",
//!         "engineRegion": "us-east-1",
//!         "snapshotLocation": "s3://admin-bucket/analytics/definition.json"
//!     },
//!     "tables": {
//!         "events": {
//!             "columns": {"id": "string", "tags": ["string"]},
//!             "partition": {
//!                 "keys": [{"name": "dt", "type": "string", "format": "{1}-{2}-{3}"}],
//!                 "prePartitionLocation": "s3://raw-bucket/events/",
//!                 "regexp": "(\\d{4})/(\\d{2})/(\\d{2})/"
//!             },
//!             "srcLocation": "s3://data-bucket/events/"
//!         }
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(def.tables.len(), 1);
//! ```

mod types;
mod validate;

pub use types::{
    DatabaseDefinition, Fields, General, PartitionKey, PartitionSpec, TableDefinition, TypeDef,
};

use crate::error::Result;
use std::path::Path;

impl DatabaseDefinition {
    /// Parse and validate a JSON definition
    pub fn from_json_str(json: &str) -> Result<Self> {
        let definition: DatabaseDefinition = serde_json::from_str(json)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Parse and validate a JSON definition from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let definition: DatabaseDefinition = serde_json::from_slice(bytes)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Read, parse, and validate a definition file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_slice(&bytes)
    }

    /// Serialized form persisted as the snapshot
    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// An empty definition carrying only connection parameters
    pub fn empty(general: General) -> Self {
        Self {
            general,
            tables: Default::default(),
        }
    }
}
