//! Storage session seam and strategy-aware execution.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::{trace::SpanKind, KeyValue};
use tokio::task::JoinHandle;

use super::statement::{BoundStatement, TracingBracket};
use super::value::ResultSet;
use super::StoreError;
use crate::observability::metrics;
use crate::propagation::{attributes, TraceStrategy};

/// A connection to the backing store.
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    /// Value reported as `db.system` on client spans.
    fn system(&self) -> &'static str;

    async fn execute(&self, statement: &BoundStatement) -> Result<ResultSet, StoreError>;
}

/// Shared handle through which services run their statements.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    inner: Arc<dyn Session>,
}

impl SessionHandle {
    pub fn new(session: impl Session + 'static) -> Self {
        Self {
            inner: Arc::new(session),
        }
    }

    /// Run a statement under the request's tracing strategy.
    ///
    /// Classic mode traces exactly this execution; application mode wraps it
    /// in a client span named after the statement.
    pub async fn execute(
        &self,
        mut statement: BoundStatement,
        strategy: &TraceStrategy,
    ) -> Result<ResultSet, StoreError> {
        match strategy {
            TraceStrategy::Untraced => self.inner.execute(&statement).await,
            TraceStrategy::Classic => {
                let bracket = TracingBracket::new(&mut statement);
                self.inner.execute(&bracket).await
            }
            TraceStrategy::Application(trace) => {
                let scope = trace.child(
                    statement.name(),
                    SpanKind::Client,
                    vec![
                        KeyValue::new(attributes::DB_SYSTEM, self.inner.system()),
                        KeyValue::new(attributes::DB_STATEMENT, statement.query().to_string()),
                    ],
                );
                let result = self.inner.execute(&statement).await;
                if let Err(e) = &result {
                    scope.record_error(e);
                }
                result
            }
        }
    }

    /// Start a write nobody waits for. Failures are logged and counted.
    pub fn execute_best_effort(
        &self,
        statement: BoundStatement,
        strategy: &TraceStrategy,
    ) -> BestEffort {
        let name = statement.name();
        let session = self.clone();
        let strategy = strategy.clone();
        let handle = tokio::spawn(async move {
            match session.execute(statement, &strategy).await {
                Ok(_) => {
                    tracing::debug!(statement = name, "Best-effort write applied");
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(statement = name, error = %e, "Best-effort write failed");
                    metrics::record_best_effort_failure(name);
                    Err(e)
                }
            }
        });
        BestEffort { name, handle }
    }
}

/// A write running in the background. Dropping or discarding it leaves the
/// write running; only [`BestEffort::outcome`] waits for it.
#[must_use = "call discard() to make ignoring the outcome explicit"]
pub struct BestEffort {
    name: &'static str,
    handle: JoinHandle<Result<(), StoreError>>,
}

impl BestEffort {
    pub fn statement(&self) -> &'static str {
        self.name
    }

    pub fn discard(self) {
        tracing::trace!(statement = self.name, "Best-effort outcome discarded");
    }

    pub async fn outcome(self) -> Result<(), StoreError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(StoreError::Aborted(e.to_string())),
        }
    }
}
