//! Per-request tracing strategy and the service-boundary decision rule.

use std::future::Future;

use axum::http::{header, HeaderMap, Method, Uri};
use opentelemetry::{trace::SpanKind, KeyValue};
use serde::Deserialize;

use super::context::CausalContext;
use super::scope::{attributes, AppTrace, SpanScope, Tracer};
use crate::error::LedgerError;

/// How the work of one request is traced. Chosen once at the request
/// boundary and passed down with every call; never stored on a shared handle.
#[derive(Clone, Debug, Default)]
pub enum TraceStrategy {
    #[default]
    Untraced,
    /// Storage operations are marked traced and record their own diagnostics.
    Classic,
    /// Spans are created and propagated by the services themselves.
    Application(AppTrace),
}

impl TraceStrategy {
    pub fn is_classic(&self) -> bool {
        matches!(self, TraceStrategy::Classic)
    }

    pub fn application(&self) -> Option<&AppTrace> {
        match self {
            TraceStrategy::Application(app) => Some(app),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TraceStrategy::Untraced => "untraced",
            TraceStrategy::Classic => "classic",
            TraceStrategy::Application(_) => "application",
        }
    }
}

/// `?classic_tracing=..&otel_tracing=..` as sent by clients. Only the literal
/// value `true` turns a flag on; anything else, or no value, means off.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TracingFlags {
    pub classic_tracing: Option<String>,
    pub otel_tracing: Option<String>,
}

fn flag_on(value: &Option<String>) -> bool {
    value.as_deref() == Some("true")
}

/// The regime a client asked for, before any span exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedTracing {
    Untraced,
    Classic,
    Application,
}

impl TracingFlags {
    /// The two regimes are never combined on one request.
    pub fn requested(&self) -> Result<RequestedTracing, LedgerError> {
        match (flag_on(&self.classic_tracing), flag_on(&self.otel_tracing)) {
            (true, true) => Err(LedgerError::InvalidArgument(
                "classic_tracing and otel_tracing are mutually exclusive".to_string(),
            )),
            (true, false) => Ok(RequestedTracing::Classic),
            (false, true) => Ok(RequestedTracing::Application),
            (false, false) => Ok(RequestedTracing::Untraced),
        }
    }
}

/// `?classic_tracing=..` as forwarded between services.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClassicFlag {
    pub classic_tracing: Option<String>,
}

impl ClassicFlag {
    pub fn enabled(&self) -> bool {
        flag_on(&self.classic_tracing)
    }
}

/// What an inbound request looks like to the span that serves it.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub operation: &'static str,
    pub method: String,
    pub host: String,
    pub target: String,
}

impl InboundRequest {
    pub fn new(operation: &'static str, method: &Method, headers: &HeaderMap, uri: &Uri) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();
        Self {
            operation,
            method: method.to_string(),
            host,
            target: uri.path().to_string(),
        }
    }

    pub fn attributes(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new(attributes::HTTP_METHOD, self.method.clone()),
            KeyValue::new(attributes::HTTP_SCHEME, "http"),
            KeyValue::new(attributes::HTTP_HOST, self.host.clone()),
            KeyValue::new(attributes::HTTP_TARGET, self.target.clone()),
        ]
    }
}

/// Boundary rule for services called by other services.
///
/// A non-empty context in `headers` parents a server span that stays open
/// until `handler` finishes (or unwinds); an empty one runs `handler` with no
/// span at all, so no disconnected roots are fabricated.
pub async fn serve_propagated<F, Fut, T>(
    tracer: &Tracer,
    headers: &HeaderMap,
    request: InboundRequest,
    classic: bool,
    handler: F,
) -> T
where
    F: FnOnce(TraceStrategy) -> Fut,
    Fut: Future<Output = T>,
{
    let parent = CausalContext::extract(headers);
    if parent.is_empty() {
        tracing::debug!(
            operation = request.operation,
            "Received no context, so proceeding without creating any span."
        );
        let strategy = if classic {
            TraceStrategy::Classic
        } else {
            TraceStrategy::Untraced
        };
        return handler(strategy).await;
    }

    if classic {
        tracing::warn!(
            operation = request.operation,
            "Context present, classic tracing flag ignored for this request"
        );
    }
    let scope = SpanScope::start(
        tracer,
        &parent,
        request.operation,
        SpanKind::Server,
        request.attributes(),
    );
    let result = handler(TraceStrategy::Application(scope.trace())).await;
    drop(scope);
    result
}

/// Boundary rule for client-facing services, where the caller's flags pick
/// the regime. An application-traced request is parented under the caller's
/// context when one was sent and roots a new trace otherwise.
pub async fn serve_requested<F, Fut, T>(
    tracer: &Tracer,
    headers: &HeaderMap,
    request: InboundRequest,
    requested: RequestedTracing,
    handler: F,
) -> T
where
    F: FnOnce(TraceStrategy) -> Fut,
    Fut: Future<Output = T>,
{
    match requested {
        RequestedTracing::Untraced => {
            tracing::debug!(
                operation = request.operation,
                "Tracing not requested, so proceeding without creating any span."
            );
            handler(TraceStrategy::Untraced).await
        }
        RequestedTracing::Classic => handler(TraceStrategy::Classic).await,
        RequestedTracing::Application => {
            let parent = CausalContext::extract(headers);
            let scope = SpanScope::start(
                tracer,
                &parent,
                request.operation,
                SpanKind::Server,
                request.attributes(),
            );
            let result = handler(TraceStrategy::Application(scope.trace())).await;
            drop(scope);
            result
        }
    }
}
