//! Table definitions.

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Text,
    Date,
    /// Only ever changed by increment/decrement; never inserted.
    Counter,
}

impl ColumnType {
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ColumnType::Int, Value::Int(_))
                | (ColumnType::Counter, Value::Int(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Date, Value::Date(_))
        )
    }
}

/// A table: partition key, clustering key, then the remaining columns.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub partition_key: &'static [&'static str],
    pub clustering_key: &'static [&'static str],
    pub columns: &'static [(&'static str, ColumnType)],
}

impl TableSchema {
    /// Partition key followed by clustering key.
    pub fn primary_key(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.partition_key
            .iter()
            .chain(self.clustering_key.iter())
            .copied()
    }

    pub fn primary_key_len(&self) -> usize {
        self.partition_key.len() + self.clustering_key.len()
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, ty)| *ty)
    }

    /// Every column in declaration order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(name, _)| *name).collect()
    }

    pub fn is_key_column(&self, column: &str) -> bool {
        self.primary_key().any(|k| k == column)
    }
}
