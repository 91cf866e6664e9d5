//! Typed token claims.
//!
//! Per the "Dynamic claim extraction" design note: a fixed schema decoded
//! with `serde`, not a runtime claim-map lookup. Any shape that doesn't
//! match this struct fails to decode and surfaces as `NoToken` — the
//! resolver never falls back to a partial claim set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalClaims {
    /// Stable external subject identifier — the join key into `users.sub`.
    pub sub: String,
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}
