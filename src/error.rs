//! Error taxonomy shared by every service.
//!
//! Validation and lookup failures are rendered at the service boundary as a
//! [`StatusResponse`] with a 4xx code and are never retried. Storage and
//! downstream failures map to 5xx.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::http::response::StatusResponse;
use crate::storage::StoreError;

/// Result alias used by the ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Unsupported argument (e.g. an unknown duration token).
    #[error("{0}")]
    InvalidArgument(String),

    /// Unknown site, advertisement or rate id.
    #[error("{0}")]
    NotFound(String),

    /// Sentinel returned when a query cannot produce a value.
    #[error("{0}")]
    ServerError(String),

    /// Reserved for stubbed operations.
    #[error("unimplemented")]
    Unimplemented,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("downstream call failed: {0}")]
    Downstream(#[from] reqwest::Error),

    #[error("downstream {endpoint} replied with {status}")]
    DownstreamStatus {
        endpoint: &'static str,
        status: StatusCode,
    },
}

impl LedgerError {
    /// HTTP status used when the error reaches a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::InvalidArgument(_) | LedgerError::NotFound(_) => StatusCode::BAD_REQUEST,
            LedgerError::ServerError(_) | LedgerError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            LedgerError::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            LedgerError::Downstream(_) | LedgerError::DownstreamStatus { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Short machine-friendly label, used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidArgument(_) => "invalid_argument",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::ServerError(_) => "server_error",
            LedgerError::Unimplemented => "unimplemented",
            LedgerError::Storage(_) => "storage",
            LedgerError::Downstream(_) | LedgerError::DownstreamStatus { .. } => "downstream",
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::debug!(error = %self, kind = self.kind(), "Request rejected");
        }
        (status, Json(StatusResponse::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        assert_eq!(
            LedgerError::InvalidArgument("bad token".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::NotFound("no such ad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_server_side_errors() {
        assert_eq!(
            LedgerError::ServerError("no such rate".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(LedgerError::Unimplemented.status_code(), StatusCode::NOT_IMPLEMENTED);
        let downstream = LedgerError::DownstreamStatus {
            endpoint: "init_rate",
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert_eq!(downstream.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(downstream.kind(), "downstream");
    }
}
