//! The portal's secure cookie.
//!
//! Resolved per the Design Notes' open question: the cookie's value is
//! never anything but the application's own signed token — there is no
//! separate claim-bearing cookie format. `axum_extra`'s `PrivateCookieJar`
//! seals the cookie value with AEAD (authenticity + confidentiality) using
//! a `cookie::Key` derived from the configured hash+encryption secrets, so
//! the resolver re-validates the inner token exactly as it would a bearer
//! token — the cookie layer adds no trust of its own.

use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use cookie::time::Duration;

pub const COOKIE_NAME: &str = "skynet-jwt";
const ONE_WEEK: Duration = Duration::weeks(1);

/// Derive the AEAD key for the cookie jar from the two configured
/// secrets. `cookie::Key::derive_from` needs at least 64 bytes of input
/// entropy; concatenating the hash and encryption keys (each already
/// enforced to be >= 32 bytes by `Config::from_env`) satisfies that.
pub fn derive_cookie_key(hash_key: &str, encryption_key: &str) -> Key {
    let mut material = Vec::with_capacity(hash_key.len() + encryption_key.len());
    material.extend_from_slice(hash_key.as_bytes());
    material.extend_from_slice(encryption_key.as_bytes());
    Key::derive_from(&material)
}

/// Build the cookie to set on a successful login, per §6: `HttpOnly`,
/// `Secure`, `SameSite=Lax`, one-week lifetime.
pub fn build_cookie(domain: String, token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .domain(domain)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(ONE_WEEK)
        .build()
}

/// Build the cookie that clears the session on logout.
pub fn clear_cookie(domain: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .domain(domain)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build()
}
