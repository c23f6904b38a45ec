use crate::query::{QueryClientFactory, QueryCompletion, QueryContext, QueryError, QueryExecutor};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Journal {
    statements: Vec<(QueryContext, String)>,
    fail_on: Vec<String>,
    contexts: Vec<QueryContext>,
}

/// Query client that records statements instead of running them
///
/// Serves as both factory and executor. Every client built from one
/// `RecordingQueryClient` appends to the same journal, so a run can be inspected
/// afterwards in issue order. Statements containing a registered substring fail
/// with `QueryError::Failed` and are not recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingQueryClient {
    journal: Arc<Mutex<Journal>>,
}

impl RecordingQueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement containing `needle`
    pub fn fail_on(self, needle: impl Into<String>) -> Self {
        if let Ok(mut journal) = self.journal.lock() {
            journal.fail_on.push(needle.into());
        }
        self
    }

    /// Recorded `(context, sql)` pairs in issue order
    pub fn statements(&self) -> Vec<(QueryContext, String)> {
        self.journal
            .lock()
            .map(|j| j.statements.clone())
            .unwrap_or_default()
    }

    /// Recorded SQL text only
    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|(_, sql)| sql).collect()
    }

    /// Contexts clients were built for, in construction order
    pub fn contexts(&self) -> Vec<QueryContext> {
        self.journal
            .lock()
            .map(|j| j.contexts.clone())
            .unwrap_or_default()
    }
}

struct RecordingExecutor {
    context: QueryContext,
    journal: Arc<Mutex<Journal>>,
}

impl QueryExecutor for RecordingExecutor {
    fn execute(&self, sql: &str) -> Result<QueryCompletion, QueryError> {
        let mut journal = self
            .journal
            .lock()
            .map_err(|_| QueryError::Client("journal lock poisoned".to_string()))?;

        if let Some(needle) = journal.fail_on.iter().find(|n| sql.contains(n.as_str())) {
            return Err(QueryError::Failed {
                statement: sql.to_string(),
                message: format!("injected failure on '{needle}'"),
            });
        }

        journal.statements.push((self.context.clone(), sql.to_string()));
        Ok(QueryCompletion {
            execution_id: Some(format!("recorded-{}", journal.statements.len())),
            elapsed: Duration::ZERO,
        })
    }
}

impl QueryClientFactory for RecordingQueryClient {
    fn client(&self, context: &QueryContext) -> Result<Arc<dyn QueryExecutor>, QueryError> {
        if let Ok(mut journal) = self.journal.lock() {
            journal.contexts.push(context.clone());
        }
        Ok(Arc::new(RecordingExecutor {
            context: context.clone(),
            journal: Arc::clone(&self.journal),
        }))
    }
}
