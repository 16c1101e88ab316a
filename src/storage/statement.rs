//! Prepared and bound statements.
//!
//! A statement is prepared once per service and bound per call. Classic
//! tracing is a property of one bound statement: it is switched on for a
//! single execution through a [`TracingBracket`] and never outlives it.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::value::Value;
use super::StoreError;

/// What a statement does. Bind values are laid out as documented per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// The storage node's current date. No binds.
    CurrentDate,
    /// Rows whose primary key starts with `key`. Binds: one per key column.
    Select {
        table: &'static str,
        key: &'static [&'static str],
    },
    /// Upsert a full row. Binds: one per column.
    Insert {
        table: &'static str,
        columns: &'static [&'static str],
    },
    /// `column = column ± delta`, creating the row at zero when absent.
    /// Binds: delta, then one per key column.
    CounterAdd {
        table: &'static str,
        column: &'static str,
        key: &'static [&'static str],
        subtract: bool,
    },
    /// Set one regular column. Binds: value, then one per key column.
    Update {
        table: &'static str,
        column: &'static str,
        key: &'static [&'static str],
    },
    /// Remove every row under `key`. Binds: one per key column.
    Delete {
        table: &'static str,
        key: &'static [&'static str],
    },
}

impl Operation {
    pub fn arity(&self) -> usize {
        match self {
            Operation::CurrentDate => 0,
            Operation::Select { key, .. } | Operation::Delete { key, .. } => key.len(),
            Operation::Insert { columns, .. } => columns.len(),
            Operation::CounterAdd { key, .. } | Operation::Update { key, .. } => key.len() + 1,
        }
    }

    fn render(&self) -> String {
        fn predicate(key: &[&str]) -> String {
            key.iter()
                .map(|k| format!("{} = ?", k))
                .collect::<Vec<_>>()
                .join(" AND ")
        }

        match self {
            Operation::CurrentDate => "SELECT toDate(now()) FROM system.local".to_string(),
            Operation::Select { table, key } if key.is_empty() => {
                format!("SELECT * FROM {}", table)
            }
            Operation::Select { table, key } => {
                format!("SELECT * FROM {} WHERE {}", table, predicate(key))
            }
            Operation::Insert { table, columns } => format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            ),
            Operation::CounterAdd {
                table,
                column,
                key,
                subtract,
            } => format!(
                "UPDATE {} SET {} = {} {} ? WHERE {}",
                table,
                column,
                column,
                if *subtract { "-" } else { "+" },
                predicate(key)
            ),
            Operation::Update { table, column, key } => {
                format!("UPDATE {} SET {} = ? WHERE {}", table, column, predicate(key))
            }
            Operation::Delete { table, key } => {
                format!("DELETE FROM {} WHERE {}", table, predicate(key))
            }
        }
    }
}

/// A named, reusable statement.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    name: &'static str,
    operation: Operation,
    query: Arc<str>,
}

impl PreparedStatement {
    pub fn new(name: &'static str, operation: Operation) -> Self {
        Self {
            name,
            operation,
            query: Arc::from(operation.render()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Bind values in the order documented on [`Operation`].
    pub fn bind(&self, values: Vec<Value>) -> Result<BoundStatement, StoreError> {
        let expected = self.operation.arity();
        if values.len() != expected {
            return Err(StoreError::Arity {
                statement: self.name,
                expected,
                got: values.len(),
            });
        }
        Ok(BoundStatement {
            prepared: self.clone(),
            values,
            tracing: false,
        })
    }
}

/// A prepared statement with its values, ready to execute.
#[derive(Debug, Clone)]
pub struct BoundStatement {
    prepared: PreparedStatement,
    values: Vec<Value>,
    tracing: bool,
}

impl BoundStatement {
    pub fn name(&self) -> &'static str {
        self.prepared.name
    }

    pub fn query(&self) -> &str {
        self.prepared.query()
    }

    pub fn operation(&self) -> Operation {
        self.prepared.operation
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn enable_tracing(&mut self) {
        self.tracing = true;
    }

    pub fn disable_tracing(&mut self) {
        self.tracing = false;
    }

    pub fn is_tracing(&self) -> bool {
        self.tracing
    }
}

/// Marks a statement traced for as long as the bracket lives.
pub struct TracingBracket<'a> {
    statement: &'a mut BoundStatement,
}

impl<'a> TracingBracket<'a> {
    pub fn new(statement: &'a mut BoundStatement) -> Self {
        statement.enable_tracing();
        Self { statement }
    }
}

impl Deref for TracingBracket<'_> {
    type Target = BoundStatement;

    fn deref(&self) -> &BoundStatement {
        self.statement
    }
}

impl DerefMut for TracingBracket<'_> {
    fn deref_mut(&mut self) -> &mut BoundStatement {
        self.statement
    }
}

impl Drop for TracingBracket<'_> {
    fn drop(&mut self) {
        self.statement.disable_tracing();
    }
}
