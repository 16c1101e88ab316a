//! Storage access layer.
//!
//! # Data Flow
//! ```text
//! Service operation
//!     → PreparedStatement::bind (arity checked)
//!     → SessionHandle::execute(statement, strategy)
//!         Classic:     TracingBracket → traced execution → diagnostics.rs
//!         Application: client span (db.system, db.statement) around execution
//!     → Session (memory.rs)
//! ```
//!
//! # Design Decisions
//! - Statements are prepared once at startup and shared by every request
//! - The strategy is an argument of each execution, never session state
//! - Best-effort writes run on their own task and return a [`BestEffort`]

pub mod diagnostics;
pub mod memory;
pub mod schema;
pub mod session;
pub mod statement;
pub mod value;

pub use diagnostics::{Diagnostics, QueryTrace};
pub use memory::{Clock, MemorySession};
pub use schema::{ColumnType, TableSchema};
pub use session::{BestEffort, Session, SessionHandle};
pub use statement::{BoundStatement, Operation, PreparedStatement, TracingBracket};
pub use value::{ResultSet, Row, Value};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("statement {statement} takes {expected} values, got {got}")]
    Arity {
        statement: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("column {column}: expected {expected}, found {found}")]
    Column {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("schema violation: {0}")]
    Schema(String),

    #[error("injected failure for {0}")]
    Injected(&'static str),

    #[error("background write aborted: {0}")]
    Aborted(String),
}

impl StoreError {
    pub(crate) fn column(column: &str, expected: &'static str, found: Option<&Value>) -> Self {
        StoreError::Column {
            column: column.to_string(),
            expected,
            found: found.map_or_else(|| "null".to_string(), |v| format!("{:?}", v)),
        }
    }
}
