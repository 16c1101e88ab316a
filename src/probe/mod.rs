//! Propagation probe.
//!
//! # Data Flow
//! ```text
//! GET /parent_span (sender)
//!     → client span "poker_span", context injected into headers
//!     → GET /fetch (receiver)
//!         → context extracted; non-empty → server span under it
//!         → playlists read (classic diagnostics appended when requested)
//!     ← rows + the parent the receiver observed
//! ← ProbeReport { propagated: receiver parent == sender span }
//! ```

pub mod receiver;
pub mod sender;

use serde::{Deserialize, Serialize};

use crate::propagation::SpanIdentity;

pub use receiver::Receiver;
pub use sender::Sender;

/// Body of the receiver's `/fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReply {
    pub rows: Vec<String>,
    /// Span the receiver's own work was parented under, if any.
    pub parent: Option<SpanIdentity>,
}

/// What the sender learned from one probe round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub sender_span: Option<SpanIdentity>,
    pub receiver_parent: Option<SpanIdentity>,
    pub propagated: bool,
    pub rows: Vec<String>,
}

impl ProbeReport {
    pub fn new(sender_span: Option<SpanIdentity>, reply: FetchReply) -> Self {
        let propagated = sender_span.is_some() && sender_span == reply.parent;
        Self {
            sender_span,
            receiver_parent: reply.parent,
            propagated,
            rows: reply.rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(span_id: &str) -> SpanIdentity {
        SpanIdentity {
            trace_id: "4bf92f3577b34da6a3ce929d0e0e4736".to_string(),
            span_id: span_id.to_string(),
        }
    }

    #[test]
    fn test_propagated_requires_matching_parent() {
        let reply = |parent| FetchReply {
            rows: Vec::new(),
            parent,
        };
        assert!(ProbeReport::new(Some(identity("00f067aa0ba902b7")), reply(Some(identity("00f067aa0ba902b7")))).propagated);
        assert!(!ProbeReport::new(Some(identity("00f067aa0ba902b7")), reply(None)).propagated);
        assert!(!ProbeReport::new(Some(identity("00f067aa0ba902b7")), reply(Some(identity("b7ad6b7169203331")))).propagated);
        assert!(!ProbeReport::new(None, reply(None)).propagated);
    }
}
