//! Query-engine client contract
//!
//! DDL and partition repair statements are submitted through a [`QueryExecutor`].
//! Executors are obtained from an injected [`QueryClientFactory`] for a
//! [`QueryContext`] (region plus result staging location), once per table context.

mod recording;

pub use recording::RecordingQueryClient;

use crate::error::Result;
use crate::location::Location;
use std::sync::Arc;
use std::time::Duration;

/// Query execution errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    /// The engine accepted the statement but it failed
    #[error("query failed: {message}\nStatement: {statement}")]
    Failed { statement: String, message: String },

    /// The client could not be constructed or reached
    #[error("query client error: {0}")]
    Client(String),
}

/// Connection parameters for a query client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryContext {
    pub region: String,
    /// Where the engine writes statement results, `s3://{bucket}/tmp/`
    pub staging_location: String,
}

impl QueryContext {
    pub fn new(region: impl Into<String>, staging_location: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            staging_location: staging_location.into(),
        }
    }

    /// Context for a table: the database region and the staging area in the
    /// bucket holding the table's data
    pub fn for_table(region: &str, src_location: &str) -> Result<Self> {
        let location = Location::parse(src_location)?;
        Ok(Self::new(region, location.staging_uri()))
    }
}

/// Outcome of a completed statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCompletion {
    /// Engine-assigned execution id, when the engine reports one
    pub execution_id: Option<String>,
    pub elapsed: Duration,
}

/// Submits a statement and waits for it to complete
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, sql: &str) -> std::result::Result<QueryCompletion, QueryError>;
}

/// Builds executors for a context
pub trait QueryClientFactory: Send + Sync + 'static {
    fn client(&self, context: &QueryContext) -> std::result::Result<Arc<dyn QueryExecutor>, QueryError>;
}
