//! Context propagation library.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → strategy.rs (flags / carrier → TraceStrategy for this request)
//!     → context.rs (W3C headers → CausalContext, emptiness check)
//!     → scope.rs (SpanScope: child span, ended on every exit path)
//!     → handler runs with the TraceStrategy value
//!
//! Outbound request (application tracing only)
//!     → scope.rs (client/internal span named after the endpoint)
//!     → context.rs (CausalContext → W3C headers)
//! ```
//!
//! # Design Decisions
//! - Context is threaded explicitly; no ambient "current span" is used
//! - Classic and application tracing are never combined on one request
//! - An empty inbound context means "untraced", never a fabricated root

pub mod context;
pub mod scope;
pub mod strategy;

pub use context::{CausalContext, SpanIdentity};
pub use scope::{attributes, AppTrace, SpanScope, Tracer};
pub use strategy::{
    serve_propagated, serve_requested, ClassicFlag, InboundRequest, RequestedTracing,
    TraceStrategy, TracingFlags,
};
