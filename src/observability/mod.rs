//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All services produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (tracer provider backing the propagation library)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Span collector (OTLP/HTTP, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every router
//! - Span export is optional; propagation works without it

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::tracing::{Telemetry, TelemetryError};
