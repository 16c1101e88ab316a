//! First hop of the probe chain: calls the receiver's `/fetch`.

use axum::http::HeaderMap;
use opentelemetry::{trace::SpanKind, KeyValue};

use super::{FetchReply, ProbeReport};
use crate::error::{LedgerError, LedgerResult};
use crate::observability::metrics;
use crate::propagation::{attributes, CausalContext, SpanScope, Tracer};

pub const POKER_SPAN: &str = "poker_span";

#[derive(Clone, Debug)]
pub struct Sender {
    http: reqwest::Client,
    receiver_url: String,
}

impl Sender {
    pub fn new(receiver_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            receiver_url: receiver_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn fetch_url(&self, classic: bool) -> String {
        format!("{}/fetch?classic_tracing={}", self.receiver_url, classic)
    }

    async fn fetch(&self, url: &str, headers: HeaderMap) -> LedgerResult<FetchReply> {
        let response = match self.http.get(url).headers(headers).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_downstream_call("fetch", "failed");
                return Err(e.into());
            }
        };
        tracing::info!(status = %response.status(), "Request sent to receiver");
        if !response.status().is_success() {
            metrics::record_downstream_call("fetch", "error_status");
            return Err(LedgerError::DownstreamStatus {
                endpoint: "fetch",
                status: response.status(),
            });
        }
        metrics::record_downstream_call("fetch", "ok");
        Ok(response.json::<FetchReply>().await?)
    }

    /// Call the receiver with no context attached.
    pub async fn poke(&self, classic: bool) -> LedgerResult<ProbeReport> {
        let reply = self.fetch(&self.fetch_url(classic), HeaderMap::new()).await?;
        Ok(ProbeReport::new(None, reply))
    }

    /// Call the receiver inside a client span whose context travels in the
    /// request headers, and report whether the receiver saw it as its parent.
    pub async fn parent_span(
        &self,
        tracer: &Tracer,
        parent: &CausalContext,
        classic: bool,
    ) -> LedgerResult<ProbeReport> {
        let url = self.fetch_url(classic);
        let scope = SpanScope::start(
            tracer,
            parent,
            POKER_SPAN,
            SpanKind::Client,
            vec![
                KeyValue::new(attributes::HTTP_METHOD, "GET"),
                KeyValue::new(attributes::HTTP_URL, url.clone()),
            ],
        );

        let mut headers = HeaderMap::new();
        scope.causal_context().inject(&mut headers);
        if scope.causal_context().is_empty() {
            tracing::warn!("Invalid span context.");
        }
        tracing::info!(headers = ?headers, "Injected context into headers");

        match self.fetch(&url, headers).await {
            Ok(reply) => Ok(ProbeReport::new(scope.identity(), reply)),
            Err(e) => {
                scope.record_error(&e);
                Err(e)
            }
        }
    }
}
