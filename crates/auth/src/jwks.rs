//! JWKS-backed token validation.
//!
//! The portal signs its own tokens, so validation is against a `JwkSet`
//! loaded once at startup from a local file (the signer keys) rather than
//! fetched from a remote issuer. The same file, public-key half only, is
//! re-served at `GET /.well-known/jwks.json` by the handler layer.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::fs;

use crate::claims::PortalClaims;
use crate::error::AuthError;

/// Load a `JwkSet` from a local JSON file.
pub fn load_jwks(path: &str) -> anyhow::Result<JwkSet> {
    let raw = fs::read_to_string(path)?;
    let jwks: JwkSet = serde_json::from_str(&raw)?;
    Ok(jwks)
}

/// Validate a bearer token's signature, expiry, and issuer against the
/// loaded JWKS, selecting the signing key by the token's `kid` header.
/// Claims beyond signature verification are never trusted — identity is
/// re-read from the database by the caller.
pub fn validate_token(token: &str, jwks: &JwkSet, issuer: &str) -> Result<PortalClaims, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::NoToken)?;
    let kid = header.kid.as_deref().ok_or(AuthError::NoToken)?;

    let jwk = jwks.find(kid).ok_or(AuthError::NoToken)?;
    let decoding_key = DecodingKey::from_jwk(jwk).map_err(|_| AuthError::NoToken)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer]);

    let token_data = decode::<PortalClaims>(token, &decoding_key, &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "token validation failed");
            AuthError::NoToken
        })?;

    Ok(token_data.claims)
}
