//! Span scopes.
//!
//! A [`SpanScope`] is the explicit replacement for "make this span current":
//! it owns the child context for as long as the unit of work runs and ends
//! the span when dropped, so every exit path (early return, `?`, panic,
//! cancelled future) closes it. The caller's own context value is untouched,
//! which is what "restore the previous current span" means here.

use std::borrow::Cow;
use std::fmt;

use opentelemetry::{
    trace::{SpanKind, Status, TraceContextExt, Tracer as _},
    KeyValue,
};

use super::context::{CausalContext, SpanIdentity};

/// The tracer capability handed to every service.
pub type Tracer = opentelemetry_sdk::trace::Tracer;

/// Semantic attribute keys.
pub mod attributes {
    pub const HTTP_METHOD: &str = "http.method";
    pub const HTTP_SCHEME: &str = "http.scheme";
    pub const HTTP_HOST: &str = "http.host";
    pub const HTTP_TARGET: &str = "http.target";
    pub const HTTP_URL: &str = "http.url";
    pub const DB_SYSTEM: &str = "db.system";
    pub const DB_STATEMENT: &str = "db.statement";
}

/// Application-level tracing capability for one request: the tracer plus the
/// context new units of work are parented under.
#[derive(Clone)]
pub struct AppTrace {
    tracer: Tracer,
    parent: CausalContext,
}

impl AppTrace {
    pub fn new(tracer: Tracer, parent: CausalContext) -> Self {
        Self { tracer, parent }
    }

    pub fn context(&self) -> &CausalContext {
        &self.parent
    }

    /// Open a child unit of work under this context.
    pub fn child(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
    ) -> SpanScope {
        SpanScope::start(&self.tracer, &self.parent, name, kind, attributes)
    }
}

impl fmt::Debug for AppTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppTrace")
            .field("parent", &self.parent.identity())
            .finish()
    }
}

/// A started span together with the context that carries it.
pub struct SpanScope {
    tracer: Tracer,
    cx: CausalContext,
}

impl SpanScope {
    /// Start a span under `parent`; an empty parent roots a new trace.
    pub fn start(
        tracer: &Tracer,
        parent: &CausalContext,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
    ) -> Self {
        let span = tracer
            .span_builder(name)
            .with_kind(kind)
            .with_attributes(attributes)
            .start_with_context(tracer, parent.context());
        let cx = CausalContext::from_context(parent.context().with_span(span));
        tracing::debug!(span = ?cx.identity(), parent = ?parent.identity(), "Created new span");
        Self {
            tracer: tracer.clone(),
            cx,
        }
    }

    pub fn set_attribute(&self, attribute: KeyValue) {
        self.cx.context().span().set_attribute(attribute);
    }

    pub fn record_error(&self, error: &dyn fmt::Display) {
        self.cx
            .context()
            .span()
            .set_status(Status::error(error.to_string()));
    }

    /// Context to inject into outgoing carriers while this scope is open.
    pub fn causal_context(&self) -> &CausalContext {
        &self.cx
    }

    /// Capability for work nested inside this scope.
    pub fn trace(&self) -> AppTrace {
        AppTrace::new(self.tracer.clone(), self.cx.clone())
    }

    pub fn identity(&self) -> Option<SpanIdentity> {
        self.cx.identity()
    }
}

impl Drop for SpanScope {
    fn drop(&mut self) {
        self.cx.context().span().end();
    }
}
