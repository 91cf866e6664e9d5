//! API layer for the accounts domain: HTTP handlers, routes, and the
//! domain's `axum` state.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use error::ApiError;
pub use middleware::AccountsState;
pub use routes::routes;
