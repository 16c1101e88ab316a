//! Classic (storage-embedded) tracing diagnostics.
//!
//! Only statements explicitly marked traced are recorded. The log lives with
//! the storage session of one service; nothing here crosses a process.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::observability::metrics;

/// Execution diagnostics for one traced statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTrace {
    pub session_id: Uuid,
    pub statement: &'static str,
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub rows: usize,
}

impl fmt::Display for QueryTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session={} statement={} query=\"{}\" started_at={} duration_us={} rows={}",
            self.session_id,
            self.statement,
            self.query,
            self.started_at.to_rfc3339(),
            self.duration.as_micros(),
            self.rows
        )
    }
}

/// Append-only log of recorded traces, bounded to the most recent entries.
#[derive(Debug)]
pub struct Diagnostics {
    capacity: usize,
    traces: Mutex<Vec<QueryTrace>>,
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            traces: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, trace: QueryTrace) {
        tracing::info!(
            session_id = %trace.session_id,
            statement = trace.statement,
            duration_us = trace.duration.as_micros() as u64,
            rows = trace.rows,
            "Classic trace recorded"
        );
        metrics::record_classic_trace(trace.statement);
        if self.capacity == 0 {
            return;
        }
        let mut traces = self.traces.lock().unwrap_or_else(|e| e.into_inner());
        if traces.len() == self.capacity {
            traces.remove(0);
        }
        traces.push(trace);
    }

    pub fn snapshot(&self) -> Vec<QueryTrace> {
        self.traces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.traces.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(1024)
    }
}
