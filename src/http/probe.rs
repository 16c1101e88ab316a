//! Sender and receiver routes.

use axum::{
    extract::State,
    http::{HeaderMap, Method, Uri},
    routing::get,
    Json, Router,
};

use super::request::Params;
use crate::error::LedgerError;
use crate::probe::{FetchReply, ProbeReport, Receiver, Sender};
use crate::propagation::{serve_propagated, CausalContext, ClassicFlag, InboundRequest, Tracer};

#[derive(Clone)]
pub struct SenderState {
    pub sender: Sender,
    pub tracer: Tracer,
}

#[derive(Clone)]
pub struct ReceiverState {
    pub receiver: Receiver,
    pub tracer: Tracer,
}

pub fn sender_router(state: SenderState) -> Router {
    Router::new()
        .route("/poke", get(poke))
        .route("/parent_span", get(parent_span))
        .with_state(state)
}

pub fn receiver_router(state: ReceiverState) -> Router {
    Router::new()
        .route("/fetch", get(fetch))
        .with_state(state)
}

async fn poke(
    State(state): State<SenderState>,
    Params(flag): Params<ClassicFlag>,
) -> Result<Json<ProbeReport>, LedgerError> {
    tracing::debug!(classic_tracing = flag.enabled(), "poke");
    state.sender.poke(flag.enabled()).await.map(Json)
}

async fn parent_span(
    State(state): State<SenderState>,
    headers: HeaderMap,
    Params(flag): Params<ClassicFlag>,
) -> Result<Json<ProbeReport>, LedgerError> {
    let parent = CausalContext::extract(&headers);
    let report = state
        .sender
        .parent_span(&state.tracer, &parent, flag.enabled())
        .await?;
    if !report.propagated {
        tracing::warn!(
            sender_span = ?report.sender_span,
            receiver_parent = ?report.receiver_parent,
            "Receiver did not observe the sender's span as its parent"
        );
    }
    Ok(Json(report))
}

async fn fetch(
    State(ReceiverState { receiver, tracer }): State<ReceiverState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Params(flag): Params<ClassicFlag>,
) -> Result<Json<FetchReply>, LedgerError> {
    let parent = CausalContext::extract(&headers).identity();
    let request = InboundRequest::new("fetch", &method, &headers, &uri);
    serve_propagated(&tracer, &headers, request, flag.enabled(), |strategy| async move {
        let rows = receiver.fetch(&strategy).await?;
        Ok::<_, LedgerError>(Json(FetchReply { rows, parent }))
    })
    .await
}
