//! Axum extractors built on [`AuthBackend::resolve`].
//!
//! Generic over any state `S` where `AuthBackend: FromRef<S>`, axum's
//! nested-state pattern, so every handler module that needs credential
//! resolution can share one `AuthBackend` without naming the concrete
//! state type.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::PrivateCookieJar;

use crate::backend::{AuthBackend, VerifiedToken};
use crate::cookie::COOKIE_NAME;
use crate::error::AuthError;
use crate::types::ResolvedUser;

fn query_string(parts: &Parts) -> String {
    parts.uri.query().unwrap_or("").to_string()
}

async fn resolve_from_parts<S>(
    parts: &mut Parts,
    state: &S,
    allows_api_key: bool,
) -> Result<(ResolvedUser, VerifiedToken), AuthError>
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    let backend = AuthBackend::from_ref(state);
    let jar = PrivateCookieJar::from_headers(&parts.headers, backend.cookie_key().clone());
    let cookie_value = jar.get(COOKIE_NAME).map(|c| c.value().to_string());
    let query = query_string(parts);

    backend
        .resolve(
            &parts.headers,
            &query,
            &parts.method,
            parts.uri.path(),
            cookie_value.as_deref(),
            allows_api_key,
        )
        .await
}

/// Token-or-cookie-only credential extractor (`allowsAPIKey = false`).
/// Use on endpoints that must reject API-key credentials outright.
#[derive(Debug)]
pub struct AuthUser(pub ResolvedUser, pub VerifiedToken);

impl<S> FromRequestParts<S> for AuthUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let (user, token) = resolve_from_parts(parts, state, false).await?;
        Ok(AuthUser(user, token))
    }
}

/// Credential extractor accepting either a token or an API key
/// (`allowsAPIKey = true`).
#[derive(Debug)]
pub struct AnyAuthUser(pub ResolvedUser, pub VerifiedToken);

impl<S> FromRequestParts<S> for AnyAuthUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let (user, token) = resolve_from_parts(parts, state, true).await?;
        Ok(AnyAuthUser(user, token))
    }
}
