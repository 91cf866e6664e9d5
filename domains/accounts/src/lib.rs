//! Accounts domain: users, quota, challenges, subscriptions, API keys.

pub mod api;
pub mod domain;
pub mod repository;

pub use domain::challenge::{ChallengeError, ParsedResponse};
pub use domain::entities::*;
pub use domain::quota::{Aggregation, EvaluationOutcome, TierLimits};
pub use domain::subscriptions::ReconcileError;
pub use domain::tier_cache::TierCache;

pub use repository::AccountsRepositories;

pub use api::{routes, AccountsState, ApiError};
