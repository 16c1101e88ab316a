//! Response payloads.
//!
//! # Responsibilities
//! - Define the `{status, reason}` payload every mutating endpoint returns
//! - Carry a downstream reply (status code + body) back to the caller verbatim
//!
//! # Design Decisions
//! - Errors render through `LedgerError::into_response`, never ad hoc strings
//! - The payload is symmetric: services both produce and parse it

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// `{"status": "ok"|"error", "reason": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusResponse {
    pub status: String,
    pub reason: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            reason: String::new(),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// A reply received from another service, forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<T> {
    pub status: StatusCode,
    pub body: T,
}

impl<T> Reply<T> {
    pub fn new(status: StatusCode, body: T) -> Self {
        Self { status, body }
    }
}

impl Reply<StatusResponse> {
    pub fn ok() -> Self {
        Self::new(StatusCode::OK, StatusResponse::ok())
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
