//! In-process wide-column store.
//!
//! Rows are kept per table in primary-key order, so a select on a key prefix
//! is a range walk. Counter columns start at zero on first increment.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use super::diagnostics::{Diagnostics, QueryTrace};
use super::schema::{ColumnType, TableSchema};
use super::session::Session;
use super::statement::{BoundStatement, Operation};
use super::value::{ResultSet, Row, Value};
use super::StoreError;

/// Where `CurrentDate` reads the date from.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(NaiveDate),
}

impl Clock {
    fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Utc::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }
}

#[derive(Debug)]
struct Table {
    schema: TableSchema,
    rows: BTreeMap<Vec<Value>, Row>,
}

impl Table {
    fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
        }
    }

    fn key_of(&self, values: &[Value]) -> Result<Vec<Value>, StoreError> {
        if values.len() != self.schema.primary_key_len() {
            return Err(StoreError::Schema(format!(
                "{} needs the full primary key ({} columns), got {}",
                self.schema.name,
                self.schema.primary_key_len(),
                values.len()
            )));
        }
        Ok(values.to_vec())
    }

    fn check_key_columns(&self, key: &[&'static str]) -> Result<(), StoreError> {
        let declared: Vec<_> = self.schema.primary_key().take(key.len()).collect();
        if declared != key {
            return Err(StoreError::Schema(format!(
                "{:?} is not a primary key prefix of {}",
                key, self.schema.name
            )));
        }
        Ok(())
    }

    fn check_type(&self, column: &str, value: &Value) -> Result<ColumnType, StoreError> {
        let ty = self.schema.column_type(column).ok_or_else(|| {
            StoreError::Schema(format!("unknown column {}.{}", self.schema.name, column))
        })?;
        if !ty.accepts(value) {
            return Err(StoreError::Schema(format!(
                "column {}.{} ({:?}) cannot hold {:?}",
                self.schema.name, column, ty, value
            )));
        }
        Ok(ty)
    }

    fn new_row(&self, key: &[Value]) -> Row {
        let mut row = Row::new();
        for (column, value) in self.schema.primary_key().zip(key.iter()) {
            row.set(column, value.clone());
        }
        row
    }

    fn select(&self, prefix: &[Value]) -> Vec<Row> {
        self.rows
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(_, row)| row.project(&self.schema.column_names()))
            .collect()
    }
}

/// A session over an in-memory store. Cheap to clone; clones share data.
#[derive(Debug, Clone)]
pub struct MemorySession {
    id: Uuid,
    tables: Arc<DashMap<&'static str, Table>>,
    clock: Clock,
    fail_statements: Arc<DashSet<String>>,
    latency: Option<Duration>,
    diagnostics: Arc<Diagnostics>,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            tables: Arc::new(DashMap::new()),
            clock: Clock::System,
            fail_statements: Arc::new(DashSet::new()),
            latency: None,
            diagnostics: Arc::new(Diagnostics::default()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Delay every execution, to observe best-effort writes in flight.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Create `schema` unless a table with that name exists.
    pub fn create_table(&self, schema: TableSchema) {
        self.tables
            .entry(schema.name)
            .or_insert_with(|| Table::new(schema));
    }

    /// Make every execution of the named statement fail.
    pub fn inject_failure(&self, statement: impl Into<String>) {
        self.fail_statements.insert(statement.into());
    }

    pub fn clear_failures(&self) {
        self.fail_statements.clear();
    }

    /// Classic traces recorded by this session.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Every row in `table`, for assertions and tooling.
    pub fn dump(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        let table = self
            .tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(table.select(&[]))
    }

    fn table_mut(
        &self,
        name: &str,
    ) -> Result<dashmap::mapref::one::RefMut<'_, &'static str, Table>, StoreError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn apply(&self, statement: &BoundStatement) -> Result<Vec<Row>, StoreError> {
        let values = statement.values();
        match statement.operation() {
            Operation::CurrentDate => {
                let mut row = Row::new();
                row.set("current_date", Value::Date(self.clock.today()));
                Ok(vec![row])
            }
            Operation::Select { table, key } => {
                let table = self.table_mut(table)?;
                table.check_key_columns(key)?;
                Ok(table.select(values))
            }
            Operation::Insert { table, columns } => {
                let mut table = self.table_mut(table)?;
                let mut row = Row::new();
                for (column, value) in columns.iter().zip(values) {
                    if table.check_type(column, value)? == ColumnType::Counter {
                        return Err(StoreError::Schema(format!(
                            "counter column {} cannot be inserted",
                            column
                        )));
                    }
                    row.set(column, value.clone());
                }
                let mut key = Vec::with_capacity(table.schema.primary_key_len());
                for column in table.schema.primary_key() {
                    let value = row.get(column).ok_or_else(|| {
                        StoreError::Schema(format!("missing key column {}", column))
                    })?;
                    key.push(value.clone());
                }
                table.rows.insert(key, row);
                Ok(Vec::new())
            }
            Operation::CounterAdd {
                table,
                column,
                key,
                subtract,
            } => {
                let mut table = self.table_mut(table)?;
                table.check_key_columns(key)?;
                let delta = &values[0];
                if table.check_type(column, delta)? != ColumnType::Counter {
                    return Err(StoreError::Schema(format!("{} is not a counter", column)));
                }
                let delta = delta.as_int().unwrap_or_default();
                let delta = if subtract { -delta } else { delta };
                let key = table.key_of(&values[1..])?;
                let fresh = table.new_row(&key);
                let row = table.rows.entry(key).or_insert(fresh);
                let current = row.get(column).and_then(Value::as_int).unwrap_or(0);
                row.set(column, Value::Int(current + delta));
                Ok(Vec::new())
            }
            Operation::Update { table, column, key } => {
                let mut table = self.table_mut(table)?;
                table.check_key_columns(key)?;
                if table.check_type(column, &values[0])? == ColumnType::Counter
                    || table.schema.is_key_column(column)
                {
                    return Err(StoreError::Schema(format!("{} cannot be set", column)));
                }
                let key = table.key_of(&values[1..])?;
                let fresh = table.new_row(&key);
                let row = table.rows.entry(key).or_insert(fresh);
                row.set(column, values[0].clone());
                Ok(Vec::new())
            }
            Operation::Delete { table, key } => {
                let mut table = self.table_mut(table)?;
                table.check_key_columns(key)?;
                table.rows.retain(|k, _| !k.starts_with(values));
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    fn system(&self) -> &'static str {
        "memory"
    }

    async fn execute(&self, statement: &BoundStatement) -> Result<ResultSet, StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_statements.contains(statement.name()) {
            return Err(StoreError::Injected(statement.name()));
        }

        let started_at = Utc::now();
        let start = Instant::now();
        let rows = self.apply(statement)?;
        let result = ResultSet::new(rows);

        if !statement.is_tracing() {
            return Ok(result);
        }
        let trace = QueryTrace {
            session_id: self.id,
            statement: statement.name(),
            query: statement.query().to_string(),
            started_at,
            duration: start.elapsed(),
            rows: result.rows().len(),
        };
        self.diagnostics.record(trace.clone());
        Ok(result.with_trace(trace))
    }
}
