//! Column values, rows and result sets.

use std::fmt;

use chrono::NaiveDate;

use super::diagnostics::QueryTrace;
use super::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

/// One row, columns in table order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    columns: Vec<(&'static str, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    /// Insert or overwrite a column.
    pub fn set(&mut self, column: &'static str, value: Value) {
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get_int(&self, column: &str) -> Result<i64, StoreError> {
        match self.get(column) {
            Some(Value::Int(v)) => Ok(*v),
            other => Err(StoreError::column(column, "int", other)),
        }
    }

    pub fn get_text(&self, column: &str) -> Result<&str, StoreError> {
        match self.get(column) {
            Some(Value::Text(v)) => Ok(v),
            other => Err(StoreError::column(column, "text", other)),
        }
    }

    pub fn get_date(&self, column: &str) -> Result<NaiveDate, StoreError> {
        match self.get(column) {
            Some(Value::Date(v)) => Ok(*v),
            other => Err(StoreError::column(column, "date", other)),
        }
    }

    pub(crate) fn project(&self, order: &[&'static str]) -> Row {
        let mut projected = Row::new();
        for column in order {
            if let Some(value) = self.get(column) {
                projected.set(column, value.clone());
            }
        }
        projected
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Row[")?;
        for (i, (_, value)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str("]")
    }
}

/// Rows returned by a statement plus, for traced statements, the
/// diagnostics the storage layer recorded.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
    trace: Option<QueryTrace>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows, trace: None }
    }

    pub fn with_trace(mut self, trace: QueryTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn one(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn execution_trace(&self) -> Option<&QueryTrace> {
        self.trace.as_ref()
    }
}
