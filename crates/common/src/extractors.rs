//! Custom axum extractors shared across handlers.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::Error;

/// JSON extractor that validates the deserialized value automatically.
///
/// Replaces `Json<T>` + a manual `.validate()` call in handlers. Requires
/// `T: DeserializeOwned + Validate`.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| Error::BadRequest(format!("invalid request body: {e}")))?;
        value
            .validate()
            .map_err(|e| Error::BadRequest(format!("validation failed: {e}")))?;
        Ok(ValidatedJson(value))
    }
}
