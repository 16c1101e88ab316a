//! Causal context and its header carrier.
//!
//! The W3C trace-context propagator is the only codec. Injecting an empty
//! context writes nothing, so a receiver extracting from a carrier that never
//! saw an active span gets an empty context back.

use axum::http::HeaderMap;
use opentelemetry::{
    propagation::{Injector, TextMapPropagator},
    trace::{SpanContext, TraceContextExt},
    Context,
};
use opentelemetry_http::{HeaderExtractor, HeaderInjector};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use serde::{Deserialize, Serialize};

/// Position of a unit of work in a distributed trace.
///
/// Passed explicitly through every call boundary; nothing here reads or writes
/// an ambient "current" context.
#[derive(Clone, Debug, Default)]
pub struct CausalContext(Context);

impl CausalContext {
    /// A context with no ancestor span.
    pub fn empty() -> Self {
        Self(Context::new())
    }

    pub fn from_context(cx: Context) -> Self {
        Self(cx)
    }

    /// Deserialize a context from inbound headers.
    pub fn extract(headers: &HeaderMap) -> Self {
        let propagator = TraceContextPropagator::new();
        let cx = propagator.extract_with_context(&Context::new(), &HeaderExtractor(headers));
        let extracted = Self(cx);
        tracing::debug!(context = ?extracted.identity(), "Extracted context");
        extracted
    }

    /// Serialize this context into outgoing headers.
    pub fn inject(&self, headers: &mut HeaderMap) {
        let propagator = TraceContextPropagator::new();
        propagator.inject_context(&self.0, &mut LoggingInjector(HeaderInjector(headers)));
    }

    /// True when there is no valid ancestor span to parent under.
    pub fn is_empty(&self) -> bool {
        !self.span_context().is_valid()
    }

    pub fn context(&self) -> &Context {
        &self.0
    }

    pub fn span_context(&self) -> SpanContext {
        self.0.span().span_context().clone()
    }

    /// Hex ids of the active span, if any.
    pub fn identity(&self) -> Option<SpanIdentity> {
        let sc = self.span_context();
        sc.is_valid().then(|| SpanIdentity::from(&sc))
    }
}

/// Printable (trace id, span id) pair used in logs and probe reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanIdentity {
    pub trace_id: String,
    pub span_id: String,
}

impl From<&SpanContext> for SpanIdentity {
    fn from(sc: &SpanContext) -> Self {
        Self {
            trace_id: sc.trace_id().to_string(),
            span_id: sc.span_id().to_string(),
        }
    }
}

struct LoggingInjector<'a>(HeaderInjector<'a>);

impl Injector for LoggingInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        tracing::debug!(key, value = %value, "Injecting context pair into header");
        self.0.set(key, value);
    }
}
