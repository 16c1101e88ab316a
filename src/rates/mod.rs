//! Counter ledger: one bump counter per rate id.
//!
//! ```text
//! Absent ──init_rate──▶ Initialized ──bump_up──▶ Bumped ⟲ bump_up
//!    ▲                        │                     │
//!    └────────delete_rate─────┴─────────────────────┘
//! ```
//!
//! Existence is presence in the store. `bump_up` checks then increments, so a
//! concurrent delete between the two steps can resurrect a counter.

use std::sync::Arc;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::RateId;
use crate::propagation::TraceStrategy;
use crate::storage::{ColumnType, Operation, PreparedStatement, SessionHandle, TableSchema, Value};

pub const NO_SUCH_RATE: &str = "no such rate";

pub const ADVERTISEMENT_RATE: TableSchema = TableSchema {
    name: "advertisement_rate",
    partition_key: &["id"],
    clustering_key: &[],
    columns: &[("id", ColumnType::Int), ("rate", ColumnType::Counter)],
};

#[derive(Debug)]
struct Statements {
    /// Binds: delta, id.
    add_rate: PreparedStatement,
    query_rate: PreparedStatement,
    delete_rate: PreparedStatement,
}

impl Statements {
    fn prepare() -> Self {
        Self {
            add_rate: PreparedStatement::new(
                "add_rate",
                Operation::CounterAdd {
                    table: ADVERTISEMENT_RATE.name,
                    column: "rate",
                    key: &["id"],
                    subtract: false,
                },
            ),
            query_rate: PreparedStatement::new(
                "query_rate",
                Operation::Select {
                    table: ADVERTISEMENT_RATE.name,
                    key: &["id"],
                },
            ),
            delete_rate: PreparedStatement::new(
                "delete_rate",
                Operation::Delete {
                    table: ADVERTISEMENT_RATE.name,
                    key: &["id"],
                },
            ),
        }
    }
}

/// Counter service operations.
#[derive(Clone, Debug)]
pub struct RateLedger {
    session: SessionHandle,
    statements: Arc<Statements>,
}

impl RateLedger {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            statements: Arc::new(Statements::prepare()),
        }
    }

    async fn add(&self, rate_id: RateId, delta: i64, strategy: &TraceStrategy) -> LedgerResult<()> {
        let bound = self
            .statements
            .add_rate
            .bind(vec![Value::Int(delta), rate_id.into()])?;
        self.session.execute(bound, strategy).await?;
        Ok(())
    }

    async fn current(&self, rate_id: RateId, strategy: &TraceStrategy) -> LedgerResult<Option<i64>> {
        let bound = self.statements.query_rate.bind(vec![rate_id.into()])?;
        let result = self.session.execute(bound, strategy).await?;
        match result.one() {
            Some(row) => Ok(Some(row.get_int("rate")?)),
            None => Ok(None),
        }
    }

    /// Ensure a counter exists, leaving an existing value unchanged.
    pub async fn init_rate(&self, rate_id: RateId, strategy: &TraceStrategy) -> LedgerResult<()> {
        self.add(rate_id, 0, strategy).await?;
        tracing::debug!(rate_id = %rate_id, "Rate initialized");
        Ok(())
    }

    pub async fn bump_up(&self, rate_id: RateId, strategy: &TraceStrategy) -> LedgerResult<()> {
        if self.current(rate_id, strategy).await?.is_none() {
            return Err(LedgerError::NotFound(NO_SUCH_RATE.to_string()));
        }
        self.add(rate_id, 1, strategy).await?;
        tracing::debug!(rate_id = %rate_id, "Rate bumped");
        Ok(())
    }

    /// Current value; an absent counter is a server-side error.
    pub async fn query_bumps(&self, rate_id: RateId, strategy: &TraceStrategy) -> LedgerResult<i64> {
        self.current(rate_id, strategy)
            .await?
            .ok_or_else(|| LedgerError::ServerError(NO_SUCH_RATE.to_string()))
    }

    /// Remove a counter. Removing an absent counter succeeds.
    pub async fn delete_rate(&self, rate_id: RateId, strategy: &TraceStrategy) -> LedgerResult<()> {
        let bound = self.statements.delete_rate.bind(vec![rate_id.into()])?;
        self.session.execute(bound, strategy).await?;
        tracing::debug!(rate_id = %rate_id, "Rate deleted");
        Ok(())
    }
}
