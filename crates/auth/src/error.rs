//! Credential resolver errors, per §4.1's taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// The first four variants map to 401; `Internal` maps to 500. There is no
/// variant for "token expired" or "signature invalid" separately — those
/// collapse into `NoToken`, the way the resolver refuses to distinguish
/// token-validation failure reasons to a caller it doesn't trust.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no token presented")]
    NoToken,
    #[error("no API key presented")]
    NoAPIKey,
    #[error("API key invalid or expired")]
    InvalidAPIKey,
    #[error("API key not allowed on this endpoint")]
    APIKeyNotAllowed,
    #[error("user not found")]
    UserNotFound,
    #[error("internal authentication error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "authentication failed internally");
        }

        let body = Json(json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "auth backend database error");
        AuthError::Internal
    }
}
