//! Authentication configuration.
//!
//! Constructed once at startup from `meridian_common::Config` per the
//! "process-wide secure-cookie instance" design note — never re-read from
//! the environment mid-process.

#[derive(Clone)]
pub struct AuthConfig {
    /// Path to the local JWKS file holding this portal's own signer keys.
    pub jwks_path: String,
    pub issuer: String,
    pub cookie_domain: String,
    pub cookie_hash_key: String,
    pub cookie_encryption_key: String,
    pub jwt_ttl: std::time::Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwks_path", &self.jwks_path)
            .field("issuer", &self.issuer)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_hash_key", &"[REDACTED]")
            .field("cookie_encryption_key", &"[REDACTED]")
            .field("jwt_ttl", &self.jwt_ttl)
            .finish()
    }
}

impl From<&meridian_common::Config> for AuthConfig {
    fn from(config: &meridian_common::Config) -> Self {
        Self {
            jwks_path: config.jwks_path.clone(),
            issuer: config.portal_domain.clone(),
            cookie_domain: config.cookie_domain.clone(),
            cookie_hash_key: config.cookie_hash_key.clone(),
            cookie_encryption_key: config.cookie_encryption_key.clone(),
            jwt_ttl: config.jwt_ttl,
        }
    }
}
