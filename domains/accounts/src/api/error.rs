//! The accounts domain's handler-layer error type, per §7.
//!
//! Every collaborator this domain's handlers call into (the credential
//! resolver, the repository layer, the challenge service, the
//! subscription reconciler, the payment provider) carries its own typed
//! error. This enum is the one place that folds all of them into the
//! shared `{"message": "<reason>"}` envelope and status-code table
//! `meridian_common::error::Error` already defines, so a handler can
//! freely `?`-propagate any collaborator's error without hand-writing a
//! conversion at every call site.

use axum::response::{IntoResponse, Response};

use meridian_auth::AuthError;
use meridian_common::db::RepositoryError;
use meridian_common::Error as CommonError;
use meridian_payments::PaymentError;

use crate::domain::challenge::ChallengeError;
use crate::domain::subscriptions::ReconcileError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

fn challenge_error_to_common(err: ChallengeError) -> CommonError {
    match err {
        ChallengeError::NotFound => CommonError::NotFound(err.to_string()),
        ChallengeError::InvalidType
        | ChallengeError::InvalidRecipient
        | ChallengeError::InvalidSignature
        | ChallengeError::MalformedPublicKey => CommonError::BadRequest(err.to_string()),
        ChallengeError::Database(e) => CommonError::Database(e),
    }
}

fn reconcile_error_to_common(err: ReconcileError) -> CommonError {
    match err {
        ReconcileError::UnknownCustomer(_) => CommonError::NotFound(err.to_string()),
        ReconcileError::Provider(_) => CommonError::DependencyFailed(err.to_string()),
        ReconcileError::Database(e) => CommonError::Database(e),
    }
}

fn payment_error_to_common(err: PaymentError) -> CommonError {
    match err {
        PaymentError::InvalidSignature(_) => CommonError::BadRequest(err.to_string()),
        PaymentError::MalformedPayload(_) => CommonError::BadRequest(err.to_string()),
        PaymentError::Configuration(_) | PaymentError::Request(_) => {
            CommonError::DependencyFailed(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let common: CommonError = match self {
            ApiError::Common(e) => e,
            ApiError::Repository(e) => e.into(),
            ApiError::Auth(e) => match e {
                AuthError::Internal => CommonError::Internal(e.to_string()),
                _ => CommonError::Unauthorized(e.to_string()),
            },
            ApiError::Challenge(e) => challenge_error_to_common(e),
            ApiError::Reconcile(e) => reconcile_error_to_common(e),
            ApiError::Payment(e) => payment_error_to_common(e),
            ApiError::Database(e) => CommonError::Database(e),
        };
        common.into_response()
    }
}
