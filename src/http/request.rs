//! Request identification.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) for requests that arrive without one
//! - Echo the ID on the response
//! - Make the ID available to handler logs
//! - Reject malformed query strings and path segments with the status payload
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A caller-supplied `x-request-id` is kept, never replaced

use axum::extract::{FromRequestParts, Path, Query};
use axum::http::{request::Parts, HeaderMap, HeaderName};
use axum::Router;
use serde::de::DeserializeOwned;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::LedgerError;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Query-string extractor that rejects with [`LedgerError::InvalidArgument`],
/// so a missing or malformed parameter still renders `{status, reason}`.
#[derive(Debug, Clone)]
pub struct Params<T>(pub T);

impl<T, S> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = LedgerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Params(value)),
            Err(rejection) => Err(LedgerError::InvalidArgument(rejection.body_text())),
        }
    }
}

/// Path extractor with the same rejection as [`Params`].
#[derive(Debug, Clone)]
pub struct Segment<T>(pub T);

impl<T, S> FromRequestParts<S> for Segment<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = LedgerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Segment(value)),
            Err(rejection) => Err(LedgerError::InvalidArgument(rejection.body_text())),
        }
    }
}

/// The request ID carried in `headers`, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Wrap `router` so that every request gets an ID before it is logged.
pub fn with_request_id(router: Router) -> Router {
    let header = HeaderName::from_static(X_REQUEST_ID);
    router
        .layer(PropagateRequestIdLayer::new(header.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(header, MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        with_request_id(Router::new().route(
            "/",
            get(|headers: HeaderMap| async move { request_id(&headers).to_string() }),
        ))
    }

    #[tokio::test]
    async fn test_request_id_is_generated_and_echoed() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let echoed = response.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&echoed).is_ok());

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(body, echoed.as_bytes());
    }

    #[derive(Debug, serde::Deserialize)]
    struct Named {
        name: String,
    }

    fn typed_app() -> Router {
        Router::new()
            .route(
                "/named",
                get(|Params(named): Params<Named>| async move { named.name }),
            )
            .route(
                "/count/{n}",
                get(|Segment(n): Segment<i64>| async move { n.to_string() }),
            )
    }

    async fn error_body(uri: &str) -> (axum::http::StatusCode, serde_json::Value) {
        let response = typed_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_parameters_render_status_payload() {
        let (status, body) = error_body("/named").await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["reason"].as_str().unwrap().contains("name"));

        let (status, body) = error_body("/count/seven").await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_wellformed_parameters_pass_through() {
        let response = typed_app()
            .oneshot(Request::builder().uri("/named?name=acme").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(body, "acme".as_bytes());
    }

    #[tokio::test]
    async fn test_supplied_request_id_is_kept() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(X_REQUEST_ID, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), "req-42");
    }
}
