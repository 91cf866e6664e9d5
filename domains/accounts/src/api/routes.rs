//! Route table for the accounts domain, per §6.

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers::{api_keys, auth, challenge, downloads, health, limits, stripe, track, uploads, user};
use super::middleware::AccountsState;

fn health_routes() -> Router<AccountsState> {
    Router::new().route("/health", get(health::health))
}

fn public_routes() -> Router<AccountsState> {
    Router::new()
        .route("/limits", get(limits::public_limits))
        .route("/.well-known/jwks.json", get(auth::jwks))
}

fn session_routes() -> Router<AccountsState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

fn register_routes() -> Router<AccountsState> {
    Router::new().route(
        "/register",
        get(challenge::start_register).post(challenge::complete_register),
    )
}

fn user_routes() -> Router<AccountsState> {
    Router::new()
        .route(
            "/user",
            get(user::get_current_user)
                .put(user::update_current_user)
                .delete(user::delete_current_user),
        )
        .route("/user/limits", get(limits::user_limits))
        .route("/user/limits/{skylink}", get(limits::user_limits_for_skylink))
        .route("/user/stats", get(user::user_stats))
}

fn upload_download_routes() -> Router<AccountsState> {
    Router::new()
        .route("/user/uploads", get(uploads::list_uploads))
        .route("/user/uploads/{skylink}", delete(uploads::unpin_user_upload))
        .route("/user/downloads", get(downloads::list_downloads))
        .route("/skylink/{skylink}", delete(uploads::unpin_skylink))
}

fn api_key_routes() -> Router<AccountsState> {
    Router::new()
        .route(
            "/user/apikeys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route(
            "/user/apikeys/{id}",
            get(api_keys::get_api_key)
                .put(api_keys::replace_api_key)
                .patch(api_keys::patch_api_key)
                .delete(api_keys::delete_api_key),
        )
}

fn pubkey_routes() -> Router<AccountsState> {
    Router::new()
        .route(
            "/user/pubkey/register",
            get(challenge::start_bind_pubkey).post(challenge::complete_bind_pubkey),
        )
        .route("/user/pubkey/{pk}", delete(challenge::unbind_pubkey))
}

fn track_routes() -> Router<AccountsState> {
    Router::new()
        .route("/track/upload/{skylink}", post(track::track_upload_event))
        .route("/track/download/{skylink}", post(track::track_download_event))
        .route("/track/registry/read", post(track::track_registry_read_event))
        .route("/track/registry/write", post(track::track_registry_write_event))
}

fn stripe_routes() -> Router<AccountsState> {
    Router::new()
        .route("/stripe/webhook", post(stripe::webhook))
        .route("/stripe/prices", get(stripe::list_prices))
        .route("/stripe/billing", post(stripe::billing_portal))
        .route("/stripe/checkout", post(stripe::checkout))
}

pub fn routes() -> Router<AccountsState> {
    Router::new()
        .merge(health_routes())
        .merge(public_routes())
        .merge(session_routes())
        .merge(register_routes())
        .merge(user_routes())
        .merge(upload_download_routes())
        .merge(api_key_routes())
        .merge(pubkey_routes())
        .merge(track_routes())
        .merge(stripe_routes())
}
