//! `GET /limits` and `GET /user/limits[/:skylink]`, per §4.3/§6.
//!
//! Both routes are unauthenticated in the strict sense (§6 lists
//! `auth: none`), but `/user/limits/:skylink` opportunistically resolves
//! whatever credential is present — a public API key covering the
//! fingerprint raises the response from anonymous limits to the owning
//! user's tier (§4.3). Anything short of `AuthError::Internal` falls back
//! to anonymous rather than rejecting the request.
//!
//! This is also the one consumer of the tier cache (§4.2: "authoritative
//! only for the `/user/limits[/skylink]` fast path"). A bearer/cookie
//! token's signature can be checked locally against the loaded JWKS with
//! no database round-trip, so a cache hit on its `sub` skips the DB
//! entirely; a miss falls through to the full resolver and populates the
//! cache for next time. API keys still go through the full resolver on
//! every call — their public-key scope check is path-dependent, and
//! isn't worth duplicating here just to shave one lookup.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::Json;
use axum_extra::extract::PrivateCookieJar;

use meridian_auth::{jwks, AuthBackend, AuthError, Tier, VerifiedToken};

use crate::api::error::ApiError;
use crate::api::middleware::AccountsState;
use crate::domain::quota::{self, TierLimits};
use crate::domain::tier_cache::{CacheKey, TierCache};

pub async fn public_limits() -> Json<&'static [TierLimits]> {
    Json(&quota::LIMITS)
}

fn bearer_or_cookie_token(backend: &AuthBackend, headers: &HeaderMap) -> Option<String> {
    if let Some(header) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Some(token) = header.to_str().ok()?.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }
    let jar = PrivateCookieJar::from_headers(headers, backend.cookie_key().clone());
    jar.get(meridian_auth::cookie::COOKIE_NAME).map(|c| c.value().to_string())
}

/// A signature-valid token's `sub` is a cache key reachable without
/// touching the database — `jwks::validate_token` only checks signature,
/// expiry, and issuer.
fn fast_path_cache_key(backend: &AuthBackend, headers: &HeaderMap) -> Option<CacheKey> {
    let token = bearer_or_cookie_token(backend, headers)?;
    let claims = jwks::validate_token(&token, backend.public_jwks(), &backend.config().issuer).ok()?;
    Some(CacheKey::Sub(claims.sub))
}

fn effective_tier(tier: Tier, quota_exceeded: bool) -> Tier {
    if quota_exceeded {
        Tier::Anonymous
    } else {
        tier
    }
}

async fn resolve_effective_tier(
    backend: &AuthBackend,
    cache: &TierCache,
    headers: &HeaderMap,
    query: &str,
    method: &Method,
    path: &str,
) -> Result<Tier, ApiError> {
    if let Some(key) = fast_path_cache_key(backend, headers) {
        if let Some(hit) = cache.get(&key) {
            return Ok(effective_tier(hit.tier, hit.quota_exceeded));
        }
    }

    let jar = PrivateCookieJar::from_headers(headers, backend.cookie_key().clone());
    let cookie_value = jar.get(meridian_auth::cookie::COOKIE_NAME).map(|c| c.value().to_string());

    match backend
        .resolve(headers, query, method, path, cookie_value.as_deref(), true)
        .await
    {
        Ok((user, token)) => {
            if let VerifiedToken::Jwt(claims) = &token {
                cache.put(CacheKey::Sub(claims.sub.clone()), user.id, user.tier, user.quota_exceeded);
            }
            Ok(user.effective_tier())
        }
        Err(AuthError::Internal) => Err(ApiError::Auth(AuthError::Internal)),
        Err(_) => Ok(Tier::Anonymous),
    }
}

pub async fn user_limits(
    State(state): State<AccountsState>,
    headers: HeaderMap,
    method: Method,
    uri: Uri,
) -> Result<Json<TierLimits>, ApiError> {
    let tier = resolve_effective_tier(
        &state.auth,
        &state.tier_cache,
        &headers,
        uri.query().unwrap_or(""),
        &method,
        uri.path(),
    )
    .await?;
    Ok(Json(*quota::limits_for(tier)))
}

pub async fn user_limits_for_skylink(
    State(state): State<AccountsState>,
    Path(_fingerprint): Path<String>,
    headers: HeaderMap,
    method: Method,
    uri: Uri,
) -> Result<Json<TierLimits>, ApiError> {
    let tier = resolve_effective_tier(
        &state.auth,
        &state.tier_cache,
        &headers,
        uri.query().unwrap_or(""),
        &method,
        uri.path(),
    )
    .await?;
    Ok(Json(*quota::limits_for(tier)))
}
