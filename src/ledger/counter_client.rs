//! Client side of the counter service.
//!
//! Every call forwards the classic flag as `?classic_tracing=` and, when the
//! request is application-traced, runs inside an internal span named after
//! the endpoint whose context is injected into the outgoing headers.

use std::future::Future;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use opentelemetry::{trace::SpanKind, KeyValue};

use super::types::RateId;
use crate::error::{LedgerError, LedgerResult};
use crate::http::response::{Reply, StatusResponse};
use crate::observability::metrics;
use crate::propagation::{attributes, TraceStrategy};

/// Operations the orchestrator needs from the counter service.
#[async_trait]
pub trait RateCounter: Send + Sync + std::fmt::Debug {
    async fn init_rate(
        &self,
        rate_id: RateId,
        strategy: &TraceStrategy,
    ) -> LedgerResult<Reply<StatusResponse>>;

    /// Current bump count; any non-success reply is an error.
    async fn query_bumps(&self, rate_id: RateId, strategy: &TraceStrategy) -> LedgerResult<i64>;

    async fn delete_rate(
        &self,
        rate_id: RateId,
        strategy: &TraceStrategy,
    ) -> LedgerResult<Reply<StatusResponse>>;
}

/// HTTP client for a counter service at `base_url`.
#[derive(Debug, Clone)]
pub struct CounterClient {
    http: reqwest::Client,
    base_url: String,
}

impl CounterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: &str, rate_id: RateId, strategy: &TraceStrategy) -> String {
        format!(
            "{}/{}/{}?classic_tracing={}",
            self.base_url,
            endpoint,
            rate_id,
            strategy.is_classic()
        )
    }

    /// Send one request and hand the response to `read`. In application mode
    /// the call span stays open until `read` has consumed the body.
    async fn call<T, F, Fut>(
        &self,
        endpoint: &'static str,
        method: Method,
        rate_id: RateId,
        strategy: &TraceStrategy,
        read: F,
    ) -> LedgerResult<T>
    where
        F: FnOnce(reqwest::Response) -> Fut + Send,
        Fut: Future<Output = LedgerResult<T>> + Send,
    {
        let url = self.url(endpoint, rate_id, strategy);
        let mut request = self.http.request(method.clone(), &url);

        let mut scope = None;
        if let Some(trace) = strategy.application() {
            let call_scope = trace.child(
                endpoint,
                SpanKind::Internal,
                vec![
                    KeyValue::new(attributes::HTTP_METHOD, method.to_string()),
                    KeyValue::new(attributes::HTTP_URL, url.clone()),
                ],
            );
            let mut headers = HeaderMap::new();
            call_scope.causal_context().inject(&mut headers);
            tracing::debug!(endpoint, headers = ?headers, "Injected context into headers");
            request = request.headers(headers);
            scope = Some(call_scope);
        }

        let result = match request.send().await {
            Ok(response) => {
                tracing::debug!(
                    endpoint,
                    rate_id = %rate_id,
                    status = %response.status(),
                    "Request sent to counter service"
                );
                let outcome = if response.status().is_success() {
                    "ok"
                } else {
                    "error_status"
                };
                metrics::record_downstream_call(endpoint, outcome);
                read(response).await
            }
            Err(e) => {
                metrics::record_downstream_call(endpoint, "failed");
                Err(LedgerError::Downstream(e))
            }
        };

        if let (Some(scope), Err(e)) = (&scope, &result) {
            scope.record_error(e);
        }
        result
    }

    async fn status_call(
        &self,
        endpoint: &'static str,
        rate_id: RateId,
        strategy: &TraceStrategy,
    ) -> LedgerResult<Reply<StatusResponse>> {
        self.call(endpoint, Method::POST, rate_id, strategy, |response| async move {
            let status: StatusCode = response.status();
            let body = response.json::<StatusResponse>().await?;
            Ok(Reply::new(status, body))
        })
        .await
    }
}

#[async_trait]
impl RateCounter for CounterClient {
    async fn init_rate(
        &self,
        rate_id: RateId,
        strategy: &TraceStrategy,
    ) -> LedgerResult<Reply<StatusResponse>> {
        self.status_call("init_rate", rate_id, strategy).await
    }

    async fn query_bumps(&self, rate_id: RateId, strategy: &TraceStrategy) -> LedgerResult<i64> {
        self.call("query_bumps", Method::GET, rate_id, strategy, |response| async move {
            let status = response.status();
            if !status.is_success() {
                return Err(LedgerError::DownstreamStatus {
                    endpoint: "query_bumps",
                    status,
                });
            }
            Ok(response.json::<i64>().await?)
        })
        .await
    }

    async fn delete_rate(
        &self,
        rate_id: RateId,
        strategy: &TraceStrategy,
    ) -> LedgerResult<Reply<StatusResponse>> {
        self.status_call("delete_rate", rate_id, strategy).await
    }
}
