//! The common error type and its HTTP mapping.
//!
//! Every handler returns `common::Result<T>`; this module is the single
//! place that decides what status code and body a domain error becomes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds per the service's error-handling design. `WriteConflict` is
/// never returned to a caller directly — handlers retry on it internally
/// (see `meridian_accounts::repository::conflict`) and only surface it if
/// the retry budget is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    DependencyFailed(String),

    #[error("write conflict")]
    WriteConflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::DependencyFailed(_) => StatusCode::FAILED_DEPENDENCY,
            Error::WriteConflict => StatusCode::CONFLICT,
            Error::Database(_) | Error::Internal(_) | Error::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal server error");
        } else {
            tracing::trace!(error = %self, status = status.as_u16(), "request error");
        }

        let body = Json(json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}
