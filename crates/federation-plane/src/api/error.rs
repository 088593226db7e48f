//! API error mapping
//!
//! Translates the transport-independent error taxonomy to HTTP: access
//! refusals are 403, malformed input is 400, storage trouble is 500. Bodies
//! carry the message plus a stable machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use federation_core::TrustError;

/// Wrapper that gives [`TrustError`] an HTTP rendering.
#[derive(Debug)]
pub struct ApiError(pub TrustError);

impl From<TrustError> for ApiError {
    fn from(err: TrustError) -> Self {
        ApiError(err)
    }
}

/// API error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            TrustError::BadParameter(_) => (StatusCode::BAD_REQUEST, "BAD_PARAMETER"),
            TrustError::AccessDenied(_) => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),
            TrustError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            TrustError::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
            TrustError::InvalidTransition(_) => (StatusCode::BAD_REQUEST, "INVALID_TRANSITION"),
            TrustError::Cancelled(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CANCELLED"),
            TrustError::Aggregate(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AGGREGATE"),
            TrustError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse { error: self.0.to_string(), code: code.to_string() };
        (status, Json(body)).into_response()
    }
}
