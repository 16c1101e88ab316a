//! Orchestrator routes.
//!
//! The client's `classic_tracing`/`otel_tracing` flags pick the tracing
//! regime of each request.

use axum::{
    extract::State,
    http::{HeaderMap, Method, Uri},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::request::{request_id, Params, Segment};
use super::response::{Reply, StatusResponse};
use crate::error::LedgerError;
use crate::ledger::{AdId, Ledger};
use crate::propagation::{serve_requested, InboundRequest, Tracer, TracingFlags};

#[derive(Clone)]
pub struct ManagerState {
    pub ledger: Ledger,
    pub tracer: Tracer,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdParams {
    pub advertiser: String,
    pub site: String,
    pub active_to: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetupAdParams {
    pub advertiser: String,
    pub site: String,
    pub ad_id: i64,
}

pub fn router(state: ManagerState) -> Router {
    Router::new()
        .route("/create_ad", post(create_ad))
        .route("/query_bumps/{advertiser}", get(query_bumps))
        .route("/resetup_ad", post(resetup_ad))
        .with_state(state)
}

async fn create_ad(
    State(ManagerState { ledger, tracer }): State<ManagerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Params(flags): Params<TracingFlags>,
    Params(params): Params<CreateAdParams>,
) -> Result<Reply<StatusResponse>, LedgerError> {
    let requested = flags.requested()?;
    tracing::debug!(
        request_id = %request_id(&headers),
        advertiser = %params.advertiser,
        site = %params.site,
        active_to = %params.active_to,
        "create_ad"
    );
    let request = InboundRequest::new("create_ad", &method, &headers, &uri);
    serve_requested(&tracer, &headers, request, requested, |strategy| async move {
        ledger
            .create_ad(&params.advertiser, &params.site, &params.active_to, &strategy)
            .await
    })
    .await
}

async fn query_bumps(
    State(ManagerState { ledger, tracer }): State<ManagerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Segment(advertiser): Segment<String>,
    Params(flags): Params<TracingFlags>,
) -> Result<Json<Vec<String>>, LedgerError> {
    let requested = flags.requested()?;
    let request = InboundRequest::new("query_bumps", &method, &headers, &uri);
    serve_requested(&tracer, &headers, request, requested, |strategy| async move {
        ledger.query_bumps(&advertiser, &strategy).await.map(Json)
    })
    .await
}

async fn resetup_ad(
    State(ManagerState { ledger, tracer }): State<ManagerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Params(flags): Params<TracingFlags>,
    Params(params): Params<ResetupAdParams>,
) -> Result<Json<StatusResponse>, LedgerError> {
    let requested = flags.requested()?;
    let request = InboundRequest::new("resetup_ad", &method, &headers, &uri);
    serve_requested(&tracer, &headers, request, requested, |strategy| async move {
        ledger
            .resetup_ad(&params.advertiser, &params.site, AdId(params.ad_id), &strategy)
            .await
            .map(Json)
    })
    .await
}
