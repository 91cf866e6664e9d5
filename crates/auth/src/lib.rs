//! Credential resolver for the Meridian accounts service.
//!
//! Combines signed tokens (bearer header or secure cookie) with opaque API
//! keys into a single resolution pipeline, per the portal's multi-source
//! authentication contract. See [`backend::AuthBackend::resolve`].

pub mod backend;
pub mod claims;
pub mod config;
pub mod cookie;
pub mod error;
pub mod extractors;
pub mod jwks;
pub mod types;

pub use backend::{AuthBackend, VerifiedToken};
pub use config::AuthConfig;
pub use error::AuthError;
pub use extractors::{AnyAuthUser, AuthUser};
pub use types::{ResolvedApiKey, ResolvedUser, Tier};
