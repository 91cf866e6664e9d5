//! `POST /login`, `POST /logout`, `GET /.well-known/jwks.json`, per §6.

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::Json;
use axum_extra::extract::PrivateCookieJar;
use jsonwebtoken::jwk::JwkSet;

use meridian_auth::AuthError;

use crate::api::error::ApiError;
use crate::api::middleware::AccountsState;

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|t| t.to_string())
}

/// Sets the secure cookie to the caller's own bearer token, re-validated
/// against the JWKS first — the cookie carries no claims of its own
/// (§4.1/§9's resolved open question), it's just the same opaque token.
pub async fn login(
    State(state): State<AccountsState>,
    headers: HeaderMap,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, StatusCode), ApiError> {
    let token = bearer_token(&headers).ok_or(AuthError::NoToken)?;

    state
        .auth
        .resolve(&headers, "", &Method::POST, "/login", None, false)
        .await
        .map_err(ApiError::Auth)?;

    let cookie = meridian_auth::cookie::build_cookie(state.auth.config().cookie_domain.clone(), token);
    Ok((jar.add(cookie), StatusCode::NO_CONTENT))
}

pub async fn logout(
    State(state): State<AccountsState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, StatusCode) {
    let cookie = meridian_auth::cookie::clear_cookie(state.auth.config().cookie_domain.clone());
    (jar.add(cookie), StatusCode::NO_CONTENT)
}

/// `GET /.well-known/jwks.json` — serves back the public half of the
/// portal's own signer keys, per §4.1.
pub async fn jwks(State(state): State<AccountsState>) -> Json<JwkSet> {
    Json(state.auth.public_jwks().clone())
}
