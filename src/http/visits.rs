//! Counter service routes.
//!
//! Called by the orchestrator. Whether a request is application-traced is
//! decided by the inbound headers alone.

use axum::{
    extract::State,
    http::{HeaderMap, Method, Uri},
    routing::{get, post},
    Json, Router,
};

use super::request::{Params, Segment};
use super::response::StatusResponse;
use crate::error::LedgerError;
use crate::ledger::RateId;
use crate::propagation::{serve_propagated, ClassicFlag, InboundRequest, Tracer};
use crate::rates::RateLedger;

#[derive(Clone)]
pub struct VisitsState {
    pub rates: RateLedger,
    pub tracer: Tracer,
}

pub fn router(state: VisitsState) -> Router {
    Router::new()
        .route("/init_rate/{rate_id}", post(init_rate))
        .route("/bump_up/{rate_id}", post(bump_up))
        .route("/query_bumps/{rate_id}", get(query_bumps))
        .route("/delete_rate/{rate_id}", post(delete_rate))
        .with_state(state)
}

async fn init_rate(
    State(VisitsState { rates, tracer }): State<VisitsState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Segment(rate_id): Segment<i64>,
    Params(flag): Params<ClassicFlag>,
) -> Result<Json<StatusResponse>, LedgerError> {
    let request = InboundRequest::new("init_rate", &method, &headers, &uri);
    serve_propagated(&tracer, &headers, request, flag.enabled(), |strategy| async move {
        rates.init_rate(RateId(rate_id), &strategy).await?;
        Ok::<_, LedgerError>(Json(StatusResponse::ok()))
    })
    .await
}

async fn bump_up(
    State(VisitsState { rates, tracer }): State<VisitsState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Segment(rate_id): Segment<i64>,
    Params(flag): Params<ClassicFlag>,
) -> Result<Json<StatusResponse>, LedgerError> {
    let request = InboundRequest::new("bump_up", &method, &headers, &uri);
    serve_propagated(&tracer, &headers, request, flag.enabled(), |strategy| async move {
        rates.bump_up(RateId(rate_id), &strategy).await?;
        Ok::<_, LedgerError>(Json(StatusResponse::ok()))
    })
    .await
}

async fn query_bumps(
    State(VisitsState { rates, tracer }): State<VisitsState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Segment(rate_id): Segment<i64>,
    Params(flag): Params<ClassicFlag>,
) -> Result<Json<i64>, LedgerError> {
    let request = InboundRequest::new("query_bumps", &method, &headers, &uri);
    serve_propagated(&tracer, &headers, request, flag.enabled(), |strategy| async move {
        rates.query_bumps(RateId(rate_id), &strategy).await.map(Json)
    })
    .await
}

async fn delete_rate(
    State(VisitsState { rates, tracer }): State<VisitsState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Segment(rate_id): Segment<i64>,
    Params(flag): Params<ClassicFlag>,
) -> Result<Json<StatusResponse>, LedgerError> {
    let request = InboundRequest::new("delete_rate", &method, &headers, &uri);
    serve_propagated(&tracer, &headers, request, flag.enabled(), |strategy| async move {
        rates.delete_rate(RateId(rate_id), &strategy).await?;
        Ok::<_, LedgerError>(Json(StatusResponse::ok()))
    })
    .await
}
