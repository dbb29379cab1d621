//! API error type shared by all HTTP handlers.
//!
//! Every handler returns `Result<Json<T>, ApiError>`; the error converts
//! itself into the wire shape `{errcode, error, http_status}`. Internal
//! detail is logged by the handler before mapping into one of these
//! variants — it is never echoed to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication Failed")]
    Unauthorized,

    #[error("Resource Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Internal(String),
}

/// JSON error body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    errcode: &'static str,
    error: String,
    http_status: u16,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Protocol error code string.
    pub fn errcode(&self) -> &'static str {
        match self {
            Self::BadRequest(_) | Self::MethodNotAllowed | Self::Internal(_) => "M_UNKNOWN",
            Self::Unauthorized => "M_UNAUTHORIZED",
            Self::NotFound => "M_NOT_FOUND",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            errcode: self.errcode(),
            error: self.to_string(),
            http_status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

/// Convenience alias for handler results.
pub type ApiResult<T> = Result<T, ApiError>;
