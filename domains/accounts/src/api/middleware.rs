//! Accounts domain state and auth backend integration.
//!
//! A single `AccountsState` rather than a multi-domain composition —
//! this system is a single bounded context, per §4.6.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use meridian_auth::AuthBackend;
use meridian_email::EmailService;
use meridian_fetcher::MetadataFetcher;
use meridian_payments::PaymentProvider;

use crate::domain::tier_cache::TierCache;
use crate::repository::AccountsRepositories;

#[derive(Clone)]
pub struct AccountsState {
    pub repos: AccountsRepositories,
    pub auth: AuthBackend,
    pub payments: Arc<dyn PaymentProvider>,
    pub fetcher: MetadataFetcher,
    pub tier_cache: TierCache,
    pub email: Arc<dyn EmailService>,
    pub portal_name: String,
    pub max_api_keys_per_user: u32,
}

impl FromRef<AccountsState> for AuthBackend {
    fn from_ref(state: &AccountsState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AccountsState> for Key {
    fn from_ref(state: &AccountsState) -> Self {
        state.auth.cookie_key().clone()
    }
}
